//! Structured report returned by the analysis engine
//!
//! The model is asked for JSON matching [`report_schema`]. Nothing it sends is
//! trusted until [`IntelligenceReport::decode`] has produced a typed value.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// One structured judgment for one input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceReport {
    pub analysis: ThreatAnalysis,
    pub response_strategy: ResponseStrategy,
    pub generated_response: String,
    pub intelligence_extraction: IntelligenceExtraction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatAnalysis {
    pub reasoning_trace: String,
    pub scam_detected: bool,
    /// Stored exactly as received; clamp only for display
    pub confidence_score: f64,
    pub scam_category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseStrategy {
    pub current_persona: String,
    pub emotional_state: String,
    pub next_action: String,
}

/// Entities the model claims to have found. Every list is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntelligenceExtraction {
    pub upi_ids: Vec<String>,
    pub bank_details: Vec<String>,
    pub crypto_wallets: Vec<String>,
    pub phishing_links: Vec<String>,
    pub phone_numbers: Vec<String>,
}

impl IntelligenceExtraction {
    /// All entities in accumulation order
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.upi_ids
            .iter()
            .chain(&self.bank_details)
            .chain(&self.crypto_wallets)
            .chain(&self.phishing_links)
            .chain(&self.phone_numbers)
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entities().next().is_none()
    }
}

#[derive(Debug, Error)]
pub enum ReportDecodeError {
    #[error("analysis engine returned an empty response")]
    Empty,
    #[error("report does not match the expected schema: {0}")]
    Schema(#[from] serde_json::Error),
}

impl IntelligenceReport {
    /// Decode the model's text output into a typed report.
    ///
    /// Surrounding whitespace and a Markdown code fence are tolerated; every
    /// field is required and arrays may be empty but never null.
    pub fn decode(raw: &str) -> Result<Self, ReportDecodeError> {
        let body = strip_code_fence(raw.trim());
        if body.is_empty() {
            return Err(ReportDecodeError::Empty);
        }
        Ok(serde_json::from_str(body)?)
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Response schema handed to the model (Gemini OpenAPI subset)
pub fn report_schema() -> Value {
    let string_list = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
    json!({
        "type": "OBJECT",
        "properties": {
            "analysis": {
                "type": "OBJECT",
                "properties": {
                    "reasoning_trace": { "type": "STRING" },
                    "scam_detected": { "type": "BOOLEAN" },
                    "confidence_score": { "type": "NUMBER" },
                    "scam_category": { "type": "STRING" }
                },
                "required": ["reasoning_trace", "scam_detected", "confidence_score", "scam_category"]
            },
            "response_strategy": {
                "type": "OBJECT",
                "properties": {
                    "current_persona": { "type": "STRING" },
                    "emotional_state": { "type": "STRING" },
                    "next_action": { "type": "STRING" }
                },
                "required": ["current_persona", "emotional_state", "next_action"]
            },
            "generated_response": { "type": "STRING" },
            "intelligence_extraction": {
                "type": "OBJECT",
                "properties": {
                    "upi_ids": string_list,
                    "bank_details": string_list,
                    "crypto_wallets": string_list,
                    "phishing_links": string_list,
                    "phone_numbers": string_list
                },
                "required": ["upi_ids", "bank_details", "crypto_wallets", "phishing_links", "phone_numbers"]
            }
        },
        "required": ["analysis", "response_strategy", "generated_response", "intelligence_extraction"]
    })
}
