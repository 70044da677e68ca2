//! # tilemark
//!
//! Shrinks JPEG photos to a 320px short edge and stamps them with a tiled,
//! half-transparent watermark.
//!
//! # Architecture: One File, One Pipeline
//!
//! Each input file runs through the same short pipeline:
//!
//! ```text
//! probe size → plan output path → (stage copy) → resize + tile + encode → probe size
//! ```
//!
//! Jobs are independent. A batch runs them in parallel on the rayon pool and
//! streams [`pipeline::JobEvent`]s over a channel to whoever is printing
//! progress.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Orchestrator: staging, per-destination locking, events, cleanup |
//! | [`planner`] | Output path rules: override directory, `with-watermark/`, `.watermark` suffix |
//! | [`imaging`] | Pure-Rust resize, watermark tiling, JPEG encode |
//! | [`probe`] | File size measurement |
//! | [`config`] | `tilemark.toml` loading, merging, validation |
//! | [`recent`] | Recent-documents list |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Fixed Transform
//!
//! There is exactly one transform. The shorter axis becomes 320px (portraits
//! fix the width, landscapes and squares fix the height), the watermark is
//! scaled to the new width at 50% opacity, and copies of it are stacked from
//! the bottom edge upward. The number of copies is
//! `round(height / watermark_height)`; when that is zero the photo is still
//! resized and written, just without a watermark.
//!
//! ## In-Place Output Needs Staging
//!
//! With both the suffix and the subfolder turned off, the output path is the
//! source path. The source is copied to `{output}.tmp` first and the copy is
//! what gets decoded. The copy is removed on every exit path.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for decode, resize, and JPEG
//! encode. Blending is a few lines of Porter-Duff math on `RgbaImage` pixels,
//! so the blend rule is explicit rather than inherited from a library.

pub mod config;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod planner;
pub mod probe;
pub mod recent;

#[cfg(test)]
pub(crate) mod test_helpers;
