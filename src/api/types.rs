//! API request and response types

use crate::store::{SessionDetail, SessionSummary};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Threat content for a new session or a reply
#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub text: Option<String>,
    /// `data:<mime>;base64,<payload>` URL from the file picker
    #[serde(default)]
    pub image: Option<String>,
}

/// Request to change the active session; `null` clears the selection
#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub session_id: Option<String>,
}

/// Response with the session list
#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
    pub active_session_id: Option<String>,
}

/// Response with a single session
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: SessionDetail,
}

/// Response with the active selection
#[derive(Debug, Serialize)]
pub struct ActiveResponse {
    pub active_session_id: Option<String>,
    /// Number of sessions in the store
    pub active_ops: usize,
}

/// Model information with metadata
#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub description: String,
    pub context_window: usize,
}

/// Response for model list
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub default: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Seconds the provider asked us to wait before resubmitting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            kind: None,
            retry_after_secs: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after_secs = retry_after.map(|d| d.as_secs());
        self
    }
}
