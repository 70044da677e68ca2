//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::params::{Opacity, Quality, SHORT_EDGE, WatermarkAsset, WatermarkParams};
use crate::probe;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Configuration for watermark compositing.
#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    pub watermark: WatermarkAsset,
    pub short_edge: u32,
    pub opacity: Opacity,
    pub quality: Quality,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            watermark: WatermarkAsset::Builtin,
            short_edge: SHORT_EDGE,
            opacity: Opacity::default(),
            quality: Quality::default(),
        }
    }
}

/// Plan a watermark operation without executing it.
pub fn plan_watermark(source: &Path, output: &Path, config: &WatermarkConfig) -> WatermarkParams {
    WatermarkParams {
        source: source.to_path_buf(),
        watermark: config.watermark.clone(),
        output: output.to_path_buf(),
        short_edge: config.short_edge,
        opacity: config.opacity,
        quality: config.quality,
    }
}

/// Resize `source`, tile the watermark over it, write `output`.
///
/// Returns the byte size of the written file.
pub fn watermark_image(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    config: &WatermarkConfig,
) -> Result<u64> {
    let params = plan_watermark(source, output, config);
    backend.watermark(&params)?;
    Ok(probe::size_of(output)?)
}
