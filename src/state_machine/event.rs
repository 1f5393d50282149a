//! Events that can occur in a session

use crate::analysis::{ImageError, InlineImage, IntelligenceReport};
use thiserror::Error;

/// Human turn content when only an image was submitted
pub const IMAGE_ONLY_PLACEHOLDER: &str = "[Visual Evidence Submitted]";

/// Rejected submission. Nothing changes when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("submission needs text or an image")]
    EmptySubmission,
    #[error("invalid image: {0}")]
    InvalidImage(#[from] ImageError),
}

/// Validated threat content from the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    text: String,
    image: Option<InlineImage>,
}

impl Submission {
    /// Rejected only when there is neither text nor an image
    pub fn new(text: impl Into<String>, image: Option<InlineImage>) -> Result<Self, ValidationError> {
        let text = text.into();
        if text.is_empty() && image.is_none() {
            return Err(ValidationError::EmptySubmission);
        }
        Ok(Self { text, image })
    }

    /// Build from wire form, where the image arrives as a `data:` URL
    pub fn parse(text: Option<String>, image_data_url: Option<&str>) -> Result<Self, ValidationError> {
        let image = image_data_url
            .filter(|url| !url.trim().is_empty())
            .map(InlineImage::parse_data_url)
            .transpose()?;
        Self::new(text.unwrap_or_default(), image)
    }

    /// Text sent to the analysis engine, as typed
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn image(&self) -> Option<&InlineImage> {
        self.image.as_ref()
    }

    /// Content shown on the human turn
    pub fn display_content(&self) -> String {
        if self.text.is_empty() {
            IMAGE_ONLY_PLACEHOLDER.to_string()
        } else {
            self.text.clone()
        }
    }
}

/// Events that trigger session transitions
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Operator submitted threat content
    Submit(Submission),

    /// Analysis for `ticket` produced a report
    ReportArrived {
        ticket: usize,
        report: Box<IntelligenceReport>,
    },

    /// Analysis for `ticket` failed
    AnalysisFailed {
        ticket: usize,
        kind: String,
        message: String,
    },
}
