//! HTTP API for the Tokato dashboard
//!
//! JSON commands and queries over the session store, plus one SSE stream per
//! dashboard connection.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::llm::ModelRegistry;
use crate::store::SessionStore;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
    pub llm_registry: Arc<ModelRegistry>,
}

impl AppState {
    pub fn new(store: SessionStore, llm_registry: Arc<ModelRegistry>) -> Self {
        Self {
            store,
            llm_registry,
        }
    }
}
