//! Decoding of `data:image/<type>;base64,<payload>` recipe images.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Largest accepted decoded image, 5 MiB.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_TYPES: [(&str, &str); 5] = [
    ("png", "png"),
    ("jpeg", "jpg"),
    ("jpg", "jpg"),
    ("gif", "gif"),
    ("webp", "webp"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub content: Vec<u8>,
    pub content_type: String,
    /// File extension without the dot.
    pub extension: &'static str,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("image must be a base64 data URL")]
    NotADataUrl,

    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("image payload is not valid base64")]
    InvalidBase64,

    #[error("image is empty")]
    Empty,

    #[error("image is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: usize, max: usize },
}

pub fn decode_data_url(input: &str) -> Result<DecodedImage, ImageError> {
    let rest = input.trim().strip_prefix("data:").ok_or(ImageError::NotADataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(ImageError::NotADataUrl)?;
    let media_type = header
        .strip_suffix(";base64")
        .ok_or(ImageError::NotADataUrl)?;
    let subtype = media_type
        .strip_prefix("image/")
        .ok_or_else(|| ImageError::UnsupportedType(media_type.to_owned()))?
        .to_ascii_lowercase();

    let extension = ALLOWED_TYPES
        .iter()
        .find(|(name, _)| *name == subtype)
        .map(|&(_, extension)| extension)
        .ok_or_else(|| ImageError::UnsupportedType(media_type.to_owned()))?;

    // Cheap upper bound before allocating the decoded buffer
    if payload.len() / 4 * 3 > MAX_IMAGE_BYTES + 3 {
        return Err(ImageError::TooLarge {
            size: payload.len() / 4 * 3,
            max: MAX_IMAGE_BYTES,
        });
    }

    let content = STANDARD
        .decode(payload.trim())
        .map_err(|_| ImageError::InvalidBase64)?;
    if content.is_empty() {
        return Err(ImageError::Empty);
    }
    if content.len() > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge {
            size: content.len(),
            max: MAX_IMAGE_BYTES,
        });
    }

    Ok(DecodedImage {
        content,
        content_type: format!("image/{subtype}"),
        extension,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_png_data_url() {
        let image = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(image.content, b"hello");
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.extension, "png");
    }

    #[test]
    fn jpeg_uses_jpg_extension() {
        let image = decode_data_url("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(image.extension, "jpg");
    }

    #[test]
    fn rejects_non_data_urls() {
        assert_eq!(
            decode_data_url("https://example.com/a.png"),
            Err(ImageError::NotADataUrl)
        );
        assert_eq!(
            decode_data_url("data:image/png,aGVsbG8="),
            Err(ImageError::NotADataUrl)
        );
    }

    #[test]
    fn rejects_non_image_types() {
        assert!(matches!(
            decode_data_url("data:text/plain;base64,aGVsbG8="),
            Err(ImageError::UnsupportedType(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/svg+xml;base64,aGVsbG8="),
            Err(ImageError::UnsupportedType(_))
        ));
    }

    #[test]
    fn rejects_bad_or_empty_payloads() {
        assert_eq!(
            decode_data_url("data:image/png;base64,@@@"),
            Err(ImageError::InvalidBase64)
        );
        assert_eq!(decode_data_url("data:image/png;base64,"), Err(ImageError::Empty));
    }

    #[test]
    fn rejects_oversized_images() {
        let payload = STANDARD.encode(vec![0_u8; MAX_IMAGE_BYTES + 1]);
        let result = decode_data_url(&format!("data:image/png;base64,{payload}"));
        assert!(matches!(result, Err(ImageError::TooLarge { .. })));
    }
}
