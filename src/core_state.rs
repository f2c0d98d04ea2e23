//! Process-wide application state.
//!
//! `CoreState` owns the two stores and the AI router. It is built once at
//! startup, wrapped in an `Arc` and shared with every HTTP handler.

use std::path::Path;
use std::sync::Arc;

use crate::config;
use crate::db::DatabaseError;
use crate::history::HistoryStore;
use crate::models::ProviderId;
use crate::pipeline::{AiRouter, GeminiPipeline, OllamaClient, ProviderError, RetryingPipeline};
use crate::preferences::ProviderPreferences;

pub struct CoreState {
    history: HistoryStore,
    preferences: ProviderPreferences,
    router: AiRouter,
    /// Upstream of the passthrough proxy.
    ollama_host: String,
}

impl CoreState {
    pub fn new(
        history: HistoryStore,
        preferences: ProviderPreferences,
        router: AiRouter,
        ollama_host: &str,
    ) -> Self {
        Self {
            history,
            preferences,
            router,
            ollama_host: ollama_host.trim_end_matches('/').to_string(),
        }
    }

    /// Production wiring: durable stores in `database`, the self-hosted
    /// client at `OLLAMA_HOST`, and the retrying hosted pipeline.
    pub fn open(database: &Path) -> Result<Self, CoreError> {
        let history = HistoryStore::open(database)?;
        let preferences = ProviderPreferences::open(database)?;

        let ollama_host = config::ollama_host();
        let self_hosted = OllamaClient::new(&ollama_host)?;
        let gemini = GeminiPipeline::from_env()?;
        if !gemini.is_configured() {
            tracing::warn!("No hosted API key set; hosted operations will fail until one is configured");
        }
        let router = AiRouter::new(
            Arc::new(RetryingPipeline::new(gemini)),
            Arc::new(self_hosted),
        );

        tracing::info!(
            database = %database.display(),
            ollama_host = %ollama_host,
            "Core state initialized"
        );
        Ok(Self::new(history, preferences, router, &ollama_host))
    }

    /// Volatile stores around a caller-supplied router.
    pub fn in_memory(router: AiRouter, ollama_host: &str) -> Result<Self, CoreError> {
        Ok(Self::new(
            HistoryStore::open_in_memory()?,
            ProviderPreferences::open_in_memory()?,
            router,
            ollama_host,
        ))
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn preferences(&self) -> &ProviderPreferences {
        &self.preferences
    }

    pub fn router(&self) -> &AiRouter {
        &self.router
    }

    pub fn ollama_host(&self) -> &str {
        &self.ollama_host
    }

    /// Explicit choice if given, the stored preference otherwise.
    pub fn resolve_provider(&self, requested: Option<ProviderId>) -> Result<ProviderId, CoreError> {
        match requested {
            Some(provider) => Ok(provider),
            None => Ok(self.preferences.get()?),
        }
    }
}

/// Errors building or using `CoreState`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Provider setup error: {0}")]
    Provider(#[from] ProviderError),
}
