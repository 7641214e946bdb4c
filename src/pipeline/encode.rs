//! Image encoding: rasterised pages and raw attachments → `data:` URLs.
//!
//! Display surfaces receive every preview as a self-contained `data:` URL so
//! they can drop it straight into an `<img>` (or a file) without a second
//! round trip to the attachment source. Rendered pages are JPEG; images
//! from the message keep their own type.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Encode a rasterised page as a JPEG `data:` URL.
pub fn encode_jpeg_data_url(img: &DynamicImage, quality: u8) -> Result<String, image::ImageError> {
    // JPEG has no alpha channel; pdfium hands out RGBA bitmaps.
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(&rgb)?;

    debug!(
        "Encoded {}x{} page → {} bytes JPEG",
        rgb.width(),
        rgb.height(),
        buf.len()
    );
    Ok(data_url("image/jpeg", &buf))
}

/// Wrap raw bytes in a base64 `data:` URL with the given MIME type.
///
/// Parameters after `;` in the MIME type are dropped.
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    let mime = mime.split(';').next().unwrap_or(mime).trim();
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Split a `data:` URL back into its MIME type and decoded bytes.
///
/// Returns `None` for anything that is not a base64 `data:` URL.
pub fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload).ok()?;
    Some((mime.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 14, Rgba([255, 0, 0, 255])));
        let url = encode_jpeg_data_url(&img, 85).expect("encode should succeed");
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let (mime, bytes) = decode_data_url(&url).expect("valid data url");
        assert_eq!(mime, "image/jpeg");
        let back = image::load_from_memory(&bytes).expect("decodable jpeg");
        assert_eq!((back.width(), back.height()), (10, 14));
    }

    #[test]
    fn data_url_drops_parameters() {
        let url = data_url("image/png; name=dot.png", b"hello");
        assert_eq!(url, "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn decode_rejects_plain_urls() {
        assert!(decode_data_url("https://example.com/a.png").is_none());
        assert!(decode_data_url("data:image/png,raw").is_none());
    }
}
