//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides what the output should look like) and the
//! [`backend`](super::backend) (which does the actual pixel work). This
//! separation allows swapping backends (e.g. for testing with a mock) without
//! changing operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 90). Clamped on construction.
//! - [`Opacity`]: Alpha multiplier applied to the watermark (0.0–1.0, default 0.5).
//! - [`WatermarkAsset`]: Where the watermark bitmap comes from: the built-in PNG or a file.
//! - [`WatermarkParams`]: Everything one job needs: source, watermark, output, geometry, quality.

use std::path::PathBuf;

/// Shorter-axis length, in pixels, every output is resized to.
pub const SHORT_EDGE: u32 = 320;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Opacity multiplier for the watermark's alpha channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Opacity(f32);

impl Opacity {
    pub fn new(value: f32) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Self(0.5)
    }
}

/// Source of the watermark bitmap.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WatermarkAsset {
    /// The PNG compiled into the binary (`assets/watermark.png`).
    #[default]
    Builtin,
    /// A user-supplied image file.
    File(PathBuf),
}

/// Parameters for a single resize + tile + encode operation.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkParams {
    pub source: PathBuf,
    pub watermark: WatermarkAsset,
    pub output: PathBuf,
    /// Target length of the source's shorter axis.
    pub short_edge: u32,
    pub opacity: Opacity,
    pub quality: Quality,
}
