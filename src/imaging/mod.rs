//! Image processing in pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (JPEG, PNG) |
//! | **Resize to 320 short edge** | `resize_exact` + Lanczos3 |
//! | **Tile watermark** | destination-over accumulation, then source-over |
//! | **Encode** | `JpegEncoder` at configured quality |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and tile math (unit testable)
//! - **Parameters**: Data structures describing the operation
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{MAX_JPEG_DIMENSION, fit_short_edge, fits_jpeg, tile_count, tile_offsets};
pub use operations::{WatermarkConfig, plan_watermark, watermark_image};
pub use params::{Opacity, Quality, SHORT_EDGE, WatermarkAsset, WatermarkParams};
pub use rust_backend::RustBackend;
