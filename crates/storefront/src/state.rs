//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::services::context::ContextRegistry;

/// Application state shared across all handlers.
///
/// Cheap to clone. Per-browser state lives in the [`ContextRegistry`],
/// never here.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    contexts: ContextRegistry,
}

impl AppState {
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let contexts = ContextRegistry::new(config.api.clone());

        Self {
            inner: Arc::new(AppStateInner { config, contexts }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Per-session API client contexts.
    #[must_use]
    pub fn contexts(&self) -> &ContextRegistry {
        &self.inner.contexts
    }
}
