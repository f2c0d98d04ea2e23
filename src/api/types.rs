//! Shared state for the API layer.

use std::sync::Arc;
use std::time::Duration;

use crate::api::error::ApiError;
use crate::core_state::CoreState;

/// Shared context for all API routes.
/// Wraps `CoreState` plus the async client used by the passthrough proxy.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub proxy_client: reqwest::Client,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Result<Self, ApiError> {
        let proxy_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::Internal(format!("proxy client: {e}")))?;
        Ok(Self { core, proxy_client })
    }

    /// Run blocking store/router work on the blocking pool.
    pub async fn blocking<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(&CoreState) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let core = self.core.clone();
        tokio::task::spawn_blocking(move || work(&core))
            .await
            .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
    }
}
