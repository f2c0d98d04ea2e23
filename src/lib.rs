pub mod api; // Local HTTP/JSON API
pub mod config;
pub mod core_state; // Process-wide state
pub mod db;
pub mod history; // History store, filter, import/export
pub mod models;
pub mod pipeline; // Dual-provider LLM router
pub mod preferences; // Provider preference store

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Start the backend and serve until Ctrl-C.
pub fn run() -> Result<(), String> {
    // Hosted credentials may live in a local .env file
    let env_file = dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    if let Some(path) = env_file {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    // Blocking HTTP clients must be created (and dropped) outside the
    // async runtime, so the state outlives it.
    let core = Arc::new(
        core_state::CoreState::open(&config::database_path()).map_err(|e| e.to_string())?,
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;

    let result = runtime.block_on(async {
        let mut server = api::serve(core.clone(), &config::bind_addr()).await?;
        tracing::info!(addr = %server.addr, "Listening; press Ctrl-C to stop");

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
        }
        server.shutdown();
        server.wait().await;
        Ok::<(), String>(())
    });

    drop(runtime);
    drop(core);
    result
}
