//! Model registry for the configured analysis models

use super::{all_models, LlmService, LoggingService, ModelDef};
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";

/// Configuration for the Gemini provider
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub gemini_api_key: Option<String>,
    /// Gateway base URL; when set the gateway handles authentication
    pub gateway: Option<String>,
    /// Default model ID
    pub default_model: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("API_KEY"))
                .ok()
                .filter(|k| !k.is_empty()),
            gateway: std::env::var("LLM_GATEWAY").ok().filter(|g| !g.is_empty()),
            default_model: std::env::var("TOKATO_MODEL").ok().filter(|m| !m.is_empty()),
        }
    }
}

/// Registry of available LLM models
pub struct ModelRegistry {
    services: HashMap<String, Arc<dyn LlmService>>,
    default_model: String,
}

impl ModelRegistry {
    /// Registry serving a single pre-built service
    #[cfg(test)]
    pub fn with_service(service: Arc<dyn LlmService>) -> Self {
        let model_id = service.model_id().to_string();
        Self {
            services: HashMap::from([(model_id.clone(), service)]),
            default_model: model_id,
        }
    }

    pub fn new(config: &LlmConfig) -> Self {
        let mut services: HashMap<String, Arc<dyn LlmService>> = HashMap::new();

        for model_def in all_models() {
            if let Some(service) = Self::try_create_model(model_def, config) {
                services.insert(model_def.id.to_string(), service);
            }
        }

        let default_model = config
            .default_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self {
            services,
            default_model,
        }
    }

    fn try_create_model(model_def: &ModelDef, config: &LlmConfig) -> Option<Arc<dyn LlmService>> {
        // In gateway mode, use "implicit" as the API key
        let api_key = if config.gateway.is_some() {
            "implicit".to_string()
        } else {
            config.gemini_api_key.clone()?
        };

        match (model_def.factory)(&api_key, config.gateway.as_deref()) {
            Ok(service) => Some(Arc::new(LoggingService::new(service))),
            Err(e) => {
                tracing::warn!(model = model_def.id, error = %e, "Failed to create model service");
                None
            }
        }
    }

    /// Get a model by ID
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// Get the default model
    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.get(&self.default_model)
    }

    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    /// List all available model IDs
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.services.keys().cloned().collect();
        models.sort();
        models
    }

    pub fn has_models(&self) -> bool {
        !self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_api_key_no_models() {
        let registry = ModelRegistry::new(&LlmConfig::default());
        assert!(registry.available_models().is_empty());
        assert!(!registry.has_models());
        assert!(registry.default().is_none());
    }

    #[test]
    fn test_api_key_enables_gemini_models() {
        let config = LlmConfig {
            gemini_api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let registry = ModelRegistry::new(&config);
        assert_eq!(
            registry.available_models(),
            vec!["gemini-3-flash-preview", "gemini-3-pro-preview"]
        );
        assert_eq!(registry.default_model_id(), DEFAULT_MODEL);
        assert!(registry.default().is_some());
    }

    #[test]
    fn test_gateway_without_key() {
        let config = LlmConfig {
            gateway: Some("https://example.com".to_string()),
            ..Default::default()
        };
        let registry = ModelRegistry::new(&config);
        assert!(registry.get("gemini-3-pro-preview").is_some());
    }

    #[test]
    fn test_custom_default_model() {
        let config = LlmConfig {
            gemini_api_key: Some("test-key".to_string()),
            default_model: Some("gemini-3-flash-preview".to_string()),
            ..Default::default()
        };
        let registry = ModelRegistry::new(&config);
        assert_eq!(registry.default_model_id(), "gemini-3-flash-preview");
        assert_eq!(registry.default().unwrap().model_id(), "gemini-3-flash-preview");
    }

    #[test]
    fn test_unknown_default_model_has_no_service() {
        let config = LlmConfig {
            gemini_api_key: Some("test-key".to_string()),
            default_model: Some("gpt-none".to_string()),
            ..Default::default()
        };
        assert!(ModelRegistry::new(&config).default().is_none());
    }
}
