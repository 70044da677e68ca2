//! Pure calculation functions for output geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// Largest width or height a baseline JPEG can carry.
pub const MAX_JPEG_DIMENSION: u32 = u16::MAX as u32;

/// Whether an image of these dimensions can be written as JPEG.
pub fn fits_jpeg(dimensions: (u32, u32)) -> bool {
    let (w, h) = dimensions;
    w <= MAX_JPEG_DIMENSION && h <= MAX_JPEG_DIMENSION
}

/// Scale dimensions so the shorter axis equals `short_edge`, preserving aspect ratio.
///
/// Portrait images (height > width) get `width = short_edge`; landscape and
/// square images get `height = short_edge`. Images smaller than the bound are
/// scaled up. The derived axis is rounded and never drops below 1.
///
/// # Examples
/// ```
/// # use tilemark::imaging::fit_short_edge;
/// assert_eq!(fit_short_edge((600, 800), 320), (320, 427));
/// assert_eq!(fit_short_edge((1600, 900), 320), (569, 320));
/// ```
pub fn fit_short_edge(source: (u32, u32), short_edge: u32) -> (u32, u32) {
    let (w, h) = source;

    if h > w {
        let scaled = (h as f64 * short_edge as f64 / w as f64).round() as u32;
        (short_edge, scaled.max(1))
    } else {
        let scaled = (w as f64 * short_edge as f64 / h as f64).round() as u32;
        (scaled.max(1), short_edge)
    }
}

/// Scale dimensions to an exact width, preserving aspect ratio.
pub fn scale_to_width(source: (u32, u32), width: u32) -> (u32, u32) {
    let (w, h) = source;
    let height = (h as f64 * width as f64 / w as f64).round() as u32;
    (width, height.max(1))
}

/// Number of watermark repetitions needed to cover the source height.
///
/// Rounded to nearest, so a watermark more than twice as tall as the source
/// yields zero tiles.
pub fn tile_count(source_height: u32, watermark_height: u32) -> u32 {
    if watermark_height == 0 {
        return 0;
    }
    (source_height as f64 / watermark_height as f64).round() as u32
}

/// Vertical offsets of every tile, top to bottom.
///
/// Tiles are anchored to the bottom edge and stacked upward, so the last
/// offset is always `source_height - watermark_height`. When rounding adds a
/// tile, the first offset is negative and that tile is clipped at the top.
pub fn tile_offsets(source_height: u32, watermark_height: u32) -> Vec<i64> {
    let count = tile_count(source_height, watermark_height) as i64;
    let sh = source_height as i64;
    let wh = watermark_height as i64;

    (0..count).map(|i| sh - count * wh + i * wh).collect()
}
