//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | `image::ImageReader` with content sniffing |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Opacity, tiling, blending | per-pixel "over" operator on `RgbaImage` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//!
//! ## Blend rule
//!
//! Tiles are accumulated into a transparent overlay with **destination-over**:
//! each new tile is placed behind whatever the overlay already holds, so a
//! later tile never erases an earlier one. The finished overlay is then laid
//! over the resized photo with source-over. Both steps are the same Porter-Duff
//! [`over`] operator with the arguments swapped.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{
    MAX_JPEG_DIMENSION, fit_short_edge, fits_jpeg, scale_to_width, tile_count, tile_offsets,
};
use super::params::{Opacity, Quality, WatermarkAsset, WatermarkParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The watermark shipped with the binary.
const BUILTIN_WATERMARK: &[u8] = include_bytes!("../../assets/watermark.png");

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
///
/// The format is sniffed from the file contents, not the extension, so staged
/// copies like `photo.jpg.tmp` decode as JPEG.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))
}

fn load_watermark(asset: &WatermarkAsset) -> Result<DynamicImage, BackendError> {
    match asset {
        WatermarkAsset::Builtin => image::load_from_memory_with_format(
            BUILTIN_WATERMARK,
            ImageFormat::Png,
        )
        .map_err(|e| BackendError::Decode(format!("built-in watermark: {}", e))),
        WatermarkAsset::File(path) => load_image(path),
    }
}

fn ensure_not_empty(img: &DynamicImage, what: &str) -> Result<(), BackendError> {
    if img.width() == 0 || img.height() == 0 {
        return Err(BackendError::Composite(format!(
            "{what} has zero size ({}x{})",
            img.width(),
            img.height()
        )));
    }
    Ok(())
}

/// Porter-Duff "over": `top` composited onto `bottom`, straight alpha.
fn over(top: Rgba<u8>, bottom: Rgba<u8>) -> Rgba<u8> {
    let ta = top[3] as f32 / 255.0;
    let ba = bottom[3] as f32 / 255.0;
    let out_a = ta + ba * (1.0 - ta);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |t: u8, b: u8| -> u8 {
        let c = (t as f32 * ta + b as f32 * ba * (1.0 - ta)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(top[0], bottom[0]),
        channel(top[1], bottom[1]),
        channel(top[2], bottom[2]),
        (out_a * 255.0).round() as u8,
    ])
}

/// Multiply every pixel's alpha by `opacity`.
fn apply_opacity(img: &mut RgbaImage, opacity: Opacity) {
    let factor = opacity.value();
    for px in img.pixels_mut() {
        px[3] = (px[3] as f32 * factor).round() as u8;
    }
}

/// Build a `width`×`height` overlay holding the watermark tiled bottom-up.
///
/// Each tile is blended destination-over into the overlay. Rows that fall
/// outside the canvas are clipped.
fn tile_overlay(tile: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, BackendError> {
    if tile.width() != width {
        return Err(BackendError::Composite(format!(
            "watermark width {} does not match canvas width {}",
            tile.width(),
            width
        )));
    }

    let mut overlay = RgbaImage::new(width, height);
    for offset in tile_offsets(height, tile.height()) {
        for (x, y, px) in tile.enumerate_pixels() {
            let target_y = offset + y as i64;
            if target_y < 0 || target_y >= height as i64 {
                continue;
            }
            let existing = overlay.get_pixel_mut(x, target_y as u32);
            *existing = over(*existing, *px);
        }
    }
    Ok(overlay)
}

/// Lay `overlay` on top of `canvas` (source-over), in place.
fn flatten_onto(canvas: &mut RgbaImage, overlay: &RgbaImage) {
    for (dst, src) in canvas.pixels_mut().zip(overlay.pixels()) {
        *dst = over(*src, *dst);
    }
}

/// Sibling file the encoded JPEG is written to before it replaces `path`.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

/// Encode as JPEG in memory, then replace `path` with the result.
///
/// The bytes land in a `.part` sibling first and are renamed over `path`, so
/// a failed encode or write leaves any existing file untouched.
fn save_jpeg(img: DynamicImage, path: &Path, quality: Quality) -> Result<(), BackendError> {
    let mut encoded = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut encoded, quality.value() as u8);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::Write(format!("JPEG encode failed: {}", e)))?;

    let partial = partial_path(path);
    let written = std::fs::write(&partial, &encoded).and_then(|()| std::fs::rename(&partial, path));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&partial);
        return Err(BackendError::Write(format!("{}: {}", path.display(), e)));
    }
    Ok(())
}

impl ImageBackend for RustBackend {
    fn watermark(&self, params: &WatermarkParams) -> Result<(), BackendError> {
        let source = load_image(&params.source)?;
        let watermark = load_watermark(&params.watermark)?;
        ensure_not_empty(&source, "source image")?;
        ensure_not_empty(&watermark, "watermark")?;

        let (width, height) = fit_short_edge((source.width(), source.height()), params.short_edge);
        if !fits_jpeg((width, height)) {
            return Err(BackendError::Composite(format!(
                "output would be {width}x{height}, larger than the JPEG limit of {MAX_JPEG_DIMENSION}"
            )));
        }
        let mut canvas = source
            .resize_exact(width, height, FilterType::Lanczos3)
            .to_rgba8();

        let (wm_width, wm_height) = scale_to_width((watermark.width(), watermark.height()), width);
        if tile_count(height, wm_height) > 0 {
            let mut tile = watermark
                .resize_exact(wm_width, wm_height, FilterType::Lanczos3)
                .to_rgba8();
            apply_opacity(&mut tile, params.opacity);

            let overlay = tile_overlay(&tile, width, height)?;
            flatten_onto(&mut canvas, &overlay);
        }

        debug!(
            source = %params.source.display(),
            width,
            height,
            tile_height = wm_height,
            "composited watermark"
        );

        save_jpeg(DynamicImage::ImageRgba8(canvas), &params.output, params.quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::SHORT_EDGE;
    use crate::test_helpers::{create_test_jpeg, create_test_watermark};

    fn params(source: &Path, watermark: WatermarkAsset, output: &Path) -> WatermarkParams {
        WatermarkParams {
            source: source.to_path_buf(),
            watermark,
            output: output.to_path_buf(),
            short_edge: SHORT_EDGE,
            opacity: Opacity::default(),
            quality: Quality::new(85),
        }
    }

    // =========================================================================
    // blending
    // =========================================================================

    #[test]
    fn over_opaque_top_wins() {
        let top = Rgba([10, 20, 30, 255]);
        let bottom = Rgba([200, 200, 200, 255]);
        assert_eq!(over(top, bottom), top);
    }

    #[test]
    fn over_transparent_top_keeps_bottom() {
        let bottom = Rgba([200, 100, 50, 255]);
        assert_eq!(over(Rgba([0, 0, 0, 0]), bottom), bottom);
    }

    #[test]
    fn over_half_alpha_mixes() {
        let top = Rgba([255, 255, 255, 128]);
        let bottom = Rgba([0, 0, 0, 255]);
        let out = over(top, bottom);
        assert_eq!(out[3], 255);
        assert!((126..=130).contains(&out[0]), "got {}", out[0]);
    }

    #[test]
    fn destination_over_never_erases_existing_tile() {
        // An opaque pixel already in the overlay stays put when a new tile lands on it.
        let existing = Rgba([255, 0, 0, 255]);
        let incoming = Rgba([0, 0, 255, 255]);
        assert_eq!(over(existing, incoming), existing);
    }

    #[test]
    fn apply_opacity_halves_alpha() {
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 200]));
        apply_opacity(&mut img, Opacity::default());
        assert!(img.pixels().all(|p| p[3] == 100));
    }

    #[test]
    fn tile_overlay_covers_bottom_rows_only() {
        // 10px tile on a 25px canvas → round(2.5) = 3 tiles from y=-5
        let tile = RgbaImage::from_pixel(4, 10, Rgba([255, 255, 255, 255]));
        let overlay = tile_overlay(&tile, 4, 25).unwrap();
        assert!(overlay.pixels().all(|p| p[3] == 255));

        // 10px tile on a 24px canvas → 2 tiles from y=4, top 4 rows empty
        let overlay = tile_overlay(&tile, 4, 24).unwrap();
        assert_eq!(overlay.get_pixel(0, 3)[3], 0);
        assert_eq!(overlay.get_pixel(0, 4)[3], 255);
        assert_eq!(overlay.get_pixel(3, 23)[3], 255);
    }

    #[test]
    fn tile_overlay_rejects_width_mismatch() {
        let tile = RgbaImage::new(5, 10);
        let result = tile_overlay(&tile, 4, 20);
        assert!(matches!(result, Err(BackendError::Composite(_))));
    }

    // =========================================================================
    // end to end
    // =========================================================================

    #[test]
    fn builtin_watermark_decodes() {
        let wm = load_watermark(&WatermarkAsset::Builtin).unwrap();
        assert!(wm.width() > 0 && wm.height() > 0);
    }

    #[test]
    fn watermark_portrait_output_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("portrait.jpg");
        let output = tmp.path().join("out.jpg");
        create_test_jpeg(&source, 600, 800);

        RustBackend::new()
            .watermark(&params(&source, WatermarkAsset::Builtin, &output))
            .unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (320, 427));
    }

    #[test]
    fn watermark_landscape_output_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("landscape.jpg");
        let output = tmp.path().join("out.jpg");
        create_test_jpeg(&source, 800, 600);

        RustBackend::new()
            .watermark(&params(&source, WatermarkAsset::Builtin, &output))
            .unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (427, 320));
    }

    #[test]
    fn watermark_changes_pixels() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("photo.jpg");
        let mark = tmp.path().join("mark.png");
        let output = tmp.path().join("out.jpg");
        create_test_jpeg(&source, 320, 320);
        // Opaque white watermark at 50% opacity lightens every row
        create_test_watermark(&mark, 320, 80, [255, 255, 255, 255]);

        RustBackend::new()
            .watermark(&params(&source, WatermarkAsset::File(mark), &output))
            .unwrap();

        let plain = image::open(&source).unwrap().to_rgb8();
        let marked = image::open(&output).unwrap().to_rgb8();
        let before = plain.get_pixel(5, 300)[2] as i32;
        let after = marked.get_pixel(5, 300)[2] as i32;
        assert!(after > before + 30, "expected lighter pixel, {before} → {after}");
    }

    #[test]
    fn watermark_taller_than_source_still_writes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("wide.jpg");
        let mark = tmp.path().join("tall.png");
        let output = tmp.path().join("out.jpg");
        create_test_jpeg(&source, 400, 400);
        // Resized to 320 wide → 1600 tall → round(320 / 1600) = 0 tiles
        create_test_watermark(&mark, 40, 200, [255, 0, 0, 255]);

        RustBackend::new()
            .watermark(&params(&source, WatermarkAsset::File(mark), &output))
            .unwrap();

        assert!(output.exists());
        assert_eq!(image::image_dimensions(&output).unwrap(), (320, 320));
    }

    #[test]
    fn staged_copy_with_tmp_extension_decodes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("photo.jpg.tmp");
        let output = tmp.path().join("photo.jpg");
        create_test_jpeg(&source, 200, 100);

        RustBackend::new()
            .watermark(&params(&source, WatermarkAsset::Builtin, &output))
            .unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (640, 320));
    }

    #[test]
    fn overwrites_existing_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("photo.jpg");
        let output = tmp.path().join("out.jpg");
        create_test_jpeg(&source, 320, 320);
        std::fs::write(&output, vec![0u8; 1_000_000]).unwrap();

        RustBackend::new()
            .watermark(&params(&source, WatermarkAsset::Builtin, &output))
            .unwrap();

        assert!(std::fs::metadata(&output).unwrap().len() < 1_000_000);
        assert_eq!(image::image_dimensions(&output).unwrap(), (320, 320));
    }

    #[test]
    fn corrupt_source_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("broken.jpg");
        let output = tmp.path().join("out.jpg");
        std::fs::write(&source, b"\xFF\xD8\xFFnot really a jpeg").unwrap();

        let result = RustBackend::new().watermark(&params(&source, WatermarkAsset::Builtin, &output));
        assert!(matches!(result, Err(BackendError::Decode(_))));
        assert!(!output.exists());
    }

    #[test]
    fn missing_source_is_io_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("out.jpg");

        let result = RustBackend::new().watermark(&params(
            Path::new("/nonexistent/image.jpg"),
            WatermarkAsset::Builtin,
            &output,
        ));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn corrupt_watermark_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("photo.jpg");
        let mark = tmp.path().join("mark.png");
        let output = tmp.path().join("out.jpg");
        create_test_jpeg(&source, 100, 100);
        std::fs::write(&mark, b"\x89PNG\r\n\x1a\ngarbage").unwrap();

        let result =
            RustBackend::new().watermark(&params(&source, WatermarkAsset::File(mark), &output));
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn unwritable_output_is_write_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("photo.jpg");
        create_test_jpeg(&source, 100, 100);
        let output = tmp.path().join("no-such-dir").join("out.jpg");

        let result = RustBackend::new().watermark(&params(&source, WatermarkAsset::Builtin, &output));
        assert!(matches!(result, Err(BackendError::Write(_))));
    }

    #[test]
    fn output_beyond_jpeg_limit_is_rejected_before_resize() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("strip.jpg");
        let output = tmp.path().join("out.jpg");
        // 1x400 → 320x128000, past the 65535 JPEG limit
        create_test_jpeg(&source, 1, 400);

        let result = RustBackend::new().watermark(&params(&source, WatermarkAsset::Builtin, &output));

        assert!(matches!(result, Err(BackendError::Composite(_))));
        assert!(!output.exists());
    }

    #[test]
    fn failed_write_keeps_existing_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("out.jpg");
        std::fs::create_dir(&output).unwrap();
        std::fs::write(output.join("keep.txt"), b"keep").unwrap();

        // Renaming a file over a non-empty directory fails after the encode succeeded
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255])));
        let result = save_jpeg(img, &output, Quality::default());

        assert!(matches!(result, Err(BackendError::Write(_))));
        assert_eq!(std::fs::read(output.join("keep.txt")).unwrap(), b"keep");
        assert!(!partial_path(&output).exists());
    }

    #[test]
    fn successful_write_leaves_no_partial_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("photo.jpg");
        let output = tmp.path().join("out.jpg");
        create_test_jpeg(&source, 320, 320);

        RustBackend::new()
            .watermark(&params(&source, WatermarkAsset::Builtin, &output))
            .unwrap();

        assert_eq!(
            crate::test_helpers::dir_listing(tmp.path()),
            vec!["out.jpg", "photo.jpg"]
        );
    }
}
