use image::ImageFormat;
use reqwest::multipart::Part;

use crate::services::api::ApiError;

/// Build a multipart part for an uploaded photo, sniffing the real format
/// from the bytes rather than trusting the file name.
pub(crate) fn image_part(bytes: Vec<u8>, file_name: &str) -> Result<Part, ApiError> {
    let format = image::guess_format(&bytes)?;
    let mime = match format {
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP => format.to_mime_type(),
        other => {
            return Err(ApiError::Validation(format!(
                "unsupported image format {other:?}; use JPEG, PNG or WebP"
            )))
        }
    };

    Ok(Part::bytes(bytes).file_name(file_name.to_string()).mime_str(mime)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn accepts_png_bytes() {
        assert!(image_part(PNG_MAGIC.to_vec(), "me.png").is_ok());
    }

    #[test]
    fn rejects_non_images() {
        let err = image_part(b"plain text".to_vec(), "notes.txt").unwrap_err();
        assert!(matches!(err, ApiError::Image(_)));
    }

    #[test]
    fn rejects_formats_the_backend_does_not_take() {
        let gif = b"GIF89a\x01\x00\x01\x00".to_vec();
        let err = image_part(gif, "anim.gif").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
