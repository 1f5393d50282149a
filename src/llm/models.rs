//! Model definitions for the analysis engine
//!
//! Every model the dashboard can route threat analysis to is listed here.

use super::gemini::{GeminiModel, GeminiService};
use super::{LlmError, LlmService};
use std::sync::Arc;

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID (e.g., "gemini-3-pro-preview")
    pub id: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Factory function to create the service
    pub factory: fn(&str, Option<&str>) -> Result<Arc<dyn LlmService>, LlmError>,
}

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "gemini-3-pro-preview",
            description: "Gemini 3 Pro (advanced reasoning, default)",
            factory: |api_key, gateway| {
                Ok(Arc::new(GeminiService::new(
                    api_key.to_string(),
                    GeminiModel::Gemini3ProPreview,
                    gateway,
                )?))
            },
        },
        ModelDef {
            id: "gemini-3-flash-preview",
            description: "Gemini 3 Flash (faster, cheaper)",
            factory: |api_key, gateway| {
                Ok(Arc::new(GeminiService::new(
                    api_key.to_string(),
                    GeminiModel::Gemini3FlashPreview,
                    gateway,
                )?))
            },
        },
    ]
}
