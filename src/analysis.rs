//! Analysis gateway
//!
//! Sends suspected fraud content (text, optional image, prior turns) to the
//! generative model and decodes its structured judgment. Detection, persona
//! choice and entity extraction all happen on the model side.

mod image;
mod prompt;
mod report;

#[cfg(test)]
pub mod testing;

pub use image::{ImageError, InlineImage};
pub use prompt::{build_context_prompt, SYSTEM_PROMPT};
#[allow(unused_imports)] // Report parts are named by tests and mocks
pub use report::{
    report_schema, IntelligenceExtraction, IntelligenceReport, ReportDecodeError,
    ResponseStrategy, ThreatAnalysis,
};

use crate::llm::{ContentBlock, LlmError, LlmMessage, LlmRequest, ModelRegistry, SystemContent};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Sampling temperature; low for consistent extraction
const ANALYSIS_TEMPERATURE: f32 = 0.2;

/// Role of a replayed turn as the model sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRole {
    User,
    Model,
}

/// Prior turn replayed to the model. Images are never resent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: HistoryRole,
    pub content: String,
}

impl HistoryTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::Model,
            content: content.into(),
        }
    }
}

/// One analysis invocation
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub input: String,
    pub image: Option<InlineImage>,
    pub history: Vec<HistoryTurn>,
}

impl AnalysisRequest {
    /// Translate into a provider request: system prompt, one user turn with
    /// the framed text and the inline image, JSON output constrained by the
    /// report schema.
    pub fn to_llm_request(&self) -> LlmRequest {
        let mut content = vec![ContentBlock::text(build_context_prompt(
            &self.input,
            &self.history,
        ))];
        if let Some(image) = &self.image {
            content.push(ContentBlock::image(image.media_type(), image.data()));
        }

        LlmRequest {
            system: vec![SystemContent::new(SYSTEM_PROMPT)],
            messages: vec![LlmMessage::user(content)],
            max_tokens: None,
            temperature: Some(ANALYSIS_TEMPERATURE),
            response_schema: Some(report_schema()),
        }
    }
}

/// Failure of a single analysis invocation. Neither kind is retried.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis gateway failed: {0}")]
    Gateway(#[from] LlmError),
    #[error("malformed report: {0}")]
    MalformedReport(#[from] ReportDecodeError),
}

impl AnalysisError {
    /// Stable label for logs and client payloads
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Gateway(_) => "gateway_error",
            AnalysisError::MalformedReport(_) => "malformed_report",
        }
    }

    /// Provider's requested back-off, if it sent one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AnalysisError::Gateway(e) => e.retry_after,
            AnalysisError::MalformedReport(_) => None,
        }
    }
}

/// External collaborator that turns threat content into a report
#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<IntelligenceReport, AnalysisError>;
}

#[async_trait]
impl<T: AnalysisGateway + ?Sized> AnalysisGateway for Arc<T> {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<IntelligenceReport, AnalysisError> {
        (**self).analyze(request).await
    }
}

/// Production gateway backed by the model registry
pub struct LlmAnalysisGateway {
    registry: Arc<ModelRegistry>,
    model_id: String,
}

impl LlmAnalysisGateway {
    pub fn new(registry: Arc<ModelRegistry>, model_id: impl Into<String>) -> Self {
        Self {
            registry,
            model_id: model_id.into(),
        }
    }
}

#[async_trait]
impl AnalysisGateway for LlmAnalysisGateway {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<IntelligenceReport, AnalysisError> {
        let llm = self
            .registry
            .get(&self.model_id)
            .or_else(|| self.registry.default())
            .ok_or_else(|| {
                LlmError::auth("No analysis model configured. Set GEMINI_API_KEY or LLM_GATEWAY.")
            })?;

        let response = llm.complete(&request.to_llm_request()).await?;
        let text = response.text();

        IntelligenceReport::decode(&text).map_err(|e| {
            tracing::error!(
                model = %self.model_id,
                error = %e,
                body_len = text.len(),
                "Report parsing failed: malformed payload from analysis engine"
            );
            AnalysisError::MalformedReport(e)
        })
    }
}
