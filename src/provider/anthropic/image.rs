//! Image reference classification for the Messages API.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::types::ImageSource;

const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";
const DATA_URI_MARKER: &str = ";base64,";

/// Turn an image reference into an Anthropic image source.
///
/// http(s) URLs become `url` sources. `data:<mime>;base64,<data>` URIs keep
/// their media type. Anything else is treated as raw base64 whose media type
/// is sniffed from the leading bytes, defaulting to JPEG.
pub fn image_source(reference: &str) -> ImageSource {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return ImageSource::Url {
            url: reference.to_string(),
        };
    }

    if let Some(idx) = reference.find(DATA_URI_MARKER) {
        let media_type = reference[..idx]
            .strip_prefix("data:")
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MEDIA_TYPE);
        return ImageSource::Base64 {
            media_type: media_type.to_string(),
            data: reference[idx + DATA_URI_MARKER.len()..].to_string(),
        };
    }

    ImageSource::Base64 {
        media_type: sniff_media_type(reference).to_string(),
        data: reference.to_string(),
    }
}

/// Guess the media type of base64 image data from its magic number.
pub fn sniff_media_type(data: &str) -> &'static str {
    if data.len() <= 15 {
        return DEFAULT_MEDIA_TYPE;
    }
    // 64 base64 chars decode to 48 bytes, plenty for any signature below.
    let raw = data.as_bytes();
    let prefix = &raw[..raw.len().min(64)];
    let prefix = &prefix[..prefix.len() - prefix.len() % 4];
    let Ok(bytes) = STANDARD.decode(prefix) else {
        tracing::debug!("image data is not valid base64, assuming jpeg");
        return DEFAULT_MEDIA_TYPE;
    };

    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(b"\xff\xd8\xff") {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        DEFAULT_MEDIA_TYPE
    }
}
