//! Image encoding: raw upload bytes ↔ base64 payloads and data URIs.
//!
//! The photo travels three ways: as a base64 attachment in the model request,
//! as a `data:` URI in the JSON response, and back again inside the report
//! request. All three conversions live here.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::PlantDocError;

/// Fallback MIME type when neither the client nor the bytes tell us.
pub const OCTET_STREAM: &str = "application/octet-stream";

static DATA_URI_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:image/\w+;base64,").expect("data URI prefix pattern is valid")
});

/// An uploaded image in transport form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub base64: String,
}

impl EncodedImage {
    /// `data:<mime>;base64,<payload>` for returning to the browser.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }

    /// Attachment for a multimodal chat message.
    pub fn to_image_data(&self) -> ImageData {
        ImageData::new(self.base64.clone(), self.mime_type.clone())
    }
}

/// Base64-encode raw image bytes.
pub fn encode_image(bytes: &[u8], mime_type: impl Into<String>) -> EncodedImage {
    let base64 = STANDARD.encode(bytes);
    debug!("Encoded image {} bytes → {} bytes base64", bytes.len(), base64.len());
    EncodedImage {
        mime_type: mime_type.into(),
        base64,
    }
}

/// Guess a MIME type from the leading bytes of an image.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

/// Decode a `data:image/<type>;base64,` URI back to raw bytes.
///
/// Only an `image/<word>` prefix is stripped. Anything else, including a data
/// URI of another media type such as `data:application/octet-stream;base64,`,
/// is decoded as bare base64 and so fails as invalid base64.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, PlantDocError> {
    let payload = DATA_URI_PREFIX.replace(uri, "");
    STANDARD
        .decode(payload.trim().as_bytes())
        .map_err(|e| PlantDocError::Rendering(format!("image is not valid base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 128, 0, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn data_uri_shape() {
        let enc = encode_image(b"leaf", "image/jpeg");
        assert_eq!(enc.data_uri(), "data:image/jpeg;base64,bGVhZg==");
    }

    #[test]
    fn data_uri_decodes_back() {
        let bytes = png_bytes();
        let uri = encode_image(&bytes, "image/png").data_uri();
        assert_eq!(decode_data_uri(&uri).unwrap(), bytes);
    }

    #[test]
    fn bare_base64_is_accepted() {
        assert_eq!(decode_data_uri("bGVhZg==").unwrap(), b"leaf");
    }

    #[test]
    fn non_image_data_uri_is_not_stripped() {
        let err = decode_data_uri("data:application/octet-stream;base64,AAAA").unwrap_err();
        assert!(matches!(err, PlantDocError::Rendering(_)));
    }

    #[test]
    fn garbage_is_a_rendering_error() {
        let err = decode_data_uri("data:image/png;base64,***not base64***").unwrap_err();
        assert!(matches!(err, PlantDocError::Rendering(_)));
    }

    #[test]
    fn sniff_png_and_unknown() {
        assert_eq!(sniff_mime(&png_bytes()), Some("image/png"));
        assert_eq!(sniff_mime(b"plain text"), None);
    }

    #[test]
    fn image_data_carries_mime() {
        let data = encode_image(b"leaf", "image/webp").to_image_data();
        assert_eq!(data.mime_type, "image/webp");
        assert_eq!(data.data, "bGVhZg==");
    }
}
