//! Thumbnail geometry and single-page thumbnail rendering.
//!
//! A page is fitted into the target box with one uniform scale factor,
//! `min(box_w / page_w, box_h / page_h)`, so the aspect ratio survives and
//! the result touches the box on at least one side without crossing it.

use super::encode::encode_jpeg_data_url;
use super::render::{PageSize, PreviewDocument};
use crate::config::BoxSize;
use crate::error::PageError;

/// Uniform scale that fits `page` into `target`.
pub fn fit_scale(page: PageSize, target: BoxSize) -> f32 {
    let sx = target.width as f32 / page.width;
    let sy = target.height as f32 / page.height;
    sx.min(sy)
}

/// Pixel size of `page` fitted into `target`.
///
/// Both sides are at least 1 px and never exceed the box. Degenerate page
/// sizes (zero, negative, NaN) fall back to the whole box.
pub fn fit_to_box(page: PageSize, target: BoxSize) -> (u32, u32) {
    let valid = page.width.is_finite() && page.height.is_finite() && page.width > 0.0 && page.height > 0.0;
    if !valid {
        return (target.width, target.height);
    }
    let scale = fit_scale(page, target);
    // The bound side lands on the box edge up to f32 rounding.
    let w = ((page.width * scale + 1e-3).floor() as u32).clamp(1, target.width);
    let h = ((page.height * scale + 1e-3).floor() as u32).clamp(1, target.height);
    (w, h)
}

/// Render one page of `document` into `target` and encode it as a JPEG `data:` URL.
///
/// Blocking: runs pdfium. Backends that return a bitmap larger than asked
/// are shrunk back into the box.
pub fn render_page_thumbnail(
    document: &dyn PreviewDocument,
    page: u32,
    target: BoxSize,
    jpeg_quality: u8,
) -> Result<String, PageError> {
    let size = document.page_size(page)?;
    let (w, h) = fit_to_box(size, target);

    let mut image = document.render_page(page, w, h)?;
    if image.width() > target.width || image.height() > target.height {
        image = image.thumbnail(target.width, target.height);
    }

    encode_jpeg_data_url(&image, jpeg_quality).map_err(|e| PageError::EncodeFailed {
        page,
        detail: e.to_string(),
    })
}
