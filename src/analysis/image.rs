//! Inline image payloads
//!
//! The file picker hands us a self-describing `data:` URL. We keep the MIME
//! type and base64 body apart so the gateway can forward them as an inline
//! part, and keep the URL itself for display. Nothing is normalized.

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("image payload must be a data: URL")]
    NotDataUrl,
    #[error("image payload must be base64 encoded")]
    NotBase64,
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("image payload is empty")]
    Empty,
    #[error("image payload is not valid base64: {0}")]
    InvalidBase64(String),
}

/// Image attached to a single turn: MIME type plus base64 bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InlineImage {
    url: String,
    media_type: String,
    data: String,
}

impl InlineImage {
    /// Parse `data:<mime>;base64,<payload>`
    pub fn parse_data_url(url: &str) -> Result<Self, ImageError> {
        let rest = url.strip_prefix("data:").ok_or(ImageError::NotDataUrl)?;
        let (header, payload) = rest.split_once(',').ok_or(ImageError::NotDataUrl)?;

        let mut params = header.split(';');
        let media_type = params.next().unwrap_or_default();
        if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
            return Err(ImageError::NotBase64);
        }
        let kind = media_type.trim().to_ascii_lowercase();
        if !kind.starts_with("image/") || kind.len() == "image/".len() {
            return Err(ImageError::UnsupportedMediaType(media_type.to_string()));
        }

        let trimmed = payload.trim();
        if trimmed.is_empty() {
            return Err(ImageError::Empty);
        }
        base64::engine::general_purpose::STANDARD
            .decode(trimmed)
            .map_err(|e| ImageError::InvalidBase64(e.to_string()))?;

        Ok(Self {
            url: url.to_string(),
            media_type: media_type.to_string(),
            data: payload.to_string(),
        })
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn to_data_url(&self) -> String {
        self.url.clone()
    }
}

impl TryFrom<String> for InlineImage {
    type Error = ImageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_data_url(&value)
    }
}

impl From<InlineImage> for String {
    fn from(image: InlineImage) -> Self {
        image.to_data_url()
    }
}
