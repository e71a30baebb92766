// Content items — the immutable unit handed to every signal provider.
//
// Images are validated and decoded exactly once, before dispatch, so every
// image provider reads the same RGB buffer and a corrupt upload is reported
// as a validation error instead of N identical provider failures.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::ModerationError;

/// Formats accepted for image moderation.
const SUPPORTED_IMAGE_FORMATS: [ImageFormat; 5] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::WebP,
];

/// Which provider table and policy table an item is routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Image,
    Video,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
            ContentKind::Video => "video",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where on the Q&A site the content is going to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentTag {
    #[default]
    Text,
    Question,
    Answer,
    Comment,
}

impl ContentTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentTag::Text => "text",
            ContentTag::Question => "question",
            ContentTag::Answer => "answer",
            ContentTag::Comment => "comment",
        }
    }
}

impl FromStr for ContentTag {
    type Err = ModerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ContentTag::Text),
            "question" => Ok(ContentTag::Question),
            "answer" => Ok(ContentTag::Answer),
            "comment" => Ok(ContentTag::Comment),
            other => Err(ModerationError::validation(format!(
                "unknown content_type '{other}' (expected text, question, answer or comment)"
            ))),
        }
    }
}

impl fmt::Display for ContentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded image plus the facts the structural rules need about the upload.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub format: ImageFormat,
    /// Size of the encoded upload, not of the decoded buffer.
    pub byte_len: usize,
    /// Shared so CPU-bound providers can move it onto a blocking thread.
    pub rgb: Arc<RgbImage>,
}

impl ImagePayload {
    /// Validate the format and decode the bytes into an RGB buffer.
    pub fn decode(bytes: &[u8]) -> Result<Self, ModerationError> {
        let format = image::guess_format(bytes)
            .map_err(|_| ModerationError::validation("content is not a recognised image"))?;

        if !SUPPORTED_IMAGE_FORMATS.contains(&format) {
            return Err(ModerationError::validation(format!(
                "unsupported image format: {}",
                format.extensions_str().first().copied().unwrap_or("unknown")
            )));
        }

        let decoded = image::load_from_memory_with_format(bytes, format).map_err(|e| {
            ModerationError::validation(format!("image could not be decoded: {e}"))
        })?;

        Ok(Self {
            format,
            byte_len: bytes.len(),
            rgb: Arc::new(decoded.to_rgb8()),
        })
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }
}

#[derive(Debug, Clone)]
pub enum Payload {
    Text(String),
    Image(ImagePayload),
    /// Video is accepted from the fetcher but no decoder or provider exists for it.
    Video(Vec<u8>),
}

/// One piece of user-submitted content. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct ContentItem {
    pub payload: Payload,
    pub tag: ContentTag,
}

impl ContentItem {
    pub fn text(content: impl Into<String>, tag: ContentTag) -> Self {
        Self {
            payload: Payload::Text(content.into()),
            tag,
        }
    }

    /// Decode an uploaded image. Fails with a validation error for unsupported
    /// or corrupt data.
    pub fn image(bytes: &[u8]) -> Result<Self, ModerationError> {
        Ok(Self {
            payload: Payload::Image(ImagePayload::decode(bytes)?),
            tag: ContentTag::default(),
        })
    }

    pub fn video(bytes: Vec<u8>) -> Self {
        Self {
            payload: Payload::Video(bytes),
            tag: ContentTag::default(),
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self.payload {
            Payload::Text(_) => ContentKind::Text,
            Payload::Image(_) => ContentKind::Image,
            Payload::Video(_) => ContentKind::Video,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImagePayload> {
        match &self.payload {
            Payload::Image(image) => Some(image),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;

    fn encode(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn content_tag_parses_known_values() {
        assert_eq!("question".parse::<ContentTag>().unwrap(), ContentTag::Question);
        assert_eq!(" Answer ".parse::<ContentTag>().unwrap(), ContentTag::Answer);
        assert!(matches!(
            "essay".parse::<ContentTag>(),
            Err(ModerationError::Validation(_))
        ));
    }

    #[test]
    fn image_decodes_png() {
        let img: RgbImage = ImageBuffer::from_pixel(64, 32, Rgb([10, 20, 30]));
        let bytes = encode(&img, ImageFormat::Png);
        let item = ContentItem::image(&bytes).unwrap();
        assert_eq!(item.kind(), ContentKind::Image);
        let payload = item.as_image().unwrap();
        assert_eq!((payload.width(), payload.height()), (64, 32));
        assert_eq!(payload.byte_len, bytes.len());
    }

    #[test]
    fn garbage_bytes_are_a_validation_error() {
        let result = ContentItem::image(b"definitely not an image");
        assert!(matches!(result, Err(ModerationError::Validation(_))));
    }

    #[test]
    fn unsupported_format_is_rejected() {
        let img: RgbImage = ImageBuffer::from_pixel(8, 8, Rgb([0, 0, 0]));
        let bytes = encode(&img, ImageFormat::Tiff);
        let err = ContentItem::image(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported image format"), "{err}");
    }

    #[test]
    fn text_item_has_text_kind() {
        let item = ContentItem::text("hello", ContentTag::Comment);
        assert_eq!(item.kind(), ContentKind::Text);
        assert_eq!(item.as_text(), Some("hello"));
        assert!(item.as_image().is_none());
    }
}
