//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the single pixel operation every backend
//! must support: decode a source and a watermark, resize, tile, and encode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests substitute a mock that records calls.

use super::params::WatermarkParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Composite failed: {0}")]
    Composite(String),
    #[error("Write failed: {0}")]
    Write(String),
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can be shared across rayon workers.
pub trait ImageBackend: Sync {
    /// Resize the source, tile the watermark over it, and write the output.
    ///
    /// The output file is written exactly once, after compositing, and must
    /// exist when this returns `Ok`.
    fn watermark(&self, params: &WatermarkParams) -> Result<(), BackendError>;
}
