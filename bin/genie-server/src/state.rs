//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::config::{Config, CredentialSource};
use crate::upstream::GenieUpstream;

/// State shared across all HTTP handlers.
///
/// Nothing here is mutated after startup; each request reads credentials
/// through [`CredentialSource`] and talks to Genie through `upstream`.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Where Genie credentials are read from on each request.
    pub credentials: CredentialSource,
    /// Remote Genie API.
    pub upstream: Arc<dyn GenieUpstream>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("genie_configured", &self.credentials.is_configured())
            .finish_non_exhaustive()
    }
}
