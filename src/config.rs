use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "DualMind Medic";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// SQLite file holding the history table and user preferences.
pub const DATABASE_FILE: &str = "dualmindMedicDB.sqlite";

/// Self-hosted model server (Ollama) default location.
pub const DEFAULT_OLLAMA_HOST: &str = "http://127.0.0.1:11434";

/// Local address the HTTP API binds to.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:9002";

/// Vision-capable model used for document text extraction.
pub const VISION_MODEL: &str = "llava:latest";

/// General text model used for every other operation.
pub const TEXT_MODEL: &str = "llama3:latest";

/// Hosted model used when `DUALMIND_HOSTED_MODEL` is unset.
pub const DEFAULT_HOSTED_MODEL: &str = "gemini-2.0-flash";

/// Retry budget of the hosted pipelines (attempts = retries + 1).
pub const HOSTED_MAX_RETRIES: u32 = 3;

/// Timeout applied to hosted-provider requests, in seconds.
pub const HOSTED_TIMEOUT_SECS: u64 = 120;

/// Whole-request timeout of the self-hosted model server, in seconds.
pub const SELF_HOSTED_TIMEOUT_SECS: u64 = 300;

/// Get the application data directory.
///
/// `DUALMIND_DATA_DIR` overrides the platform data dir
/// (`~/.local/share/DualMindMedic` on Linux).
pub fn app_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DUALMIND_DATA_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("DualMindMedic")
}

/// Path of the SQLite database inside the data directory.
pub fn database_path() -> PathBuf {
    app_data_dir().join(DATABASE_FILE)
}

/// Base URL of the self-hosted model server (`OLLAMA_HOST` override).
pub fn ollama_host() -> String {
    std::env::var("OLLAMA_HOST")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string())
}

/// Address for the HTTP API (`DUALMIND_BIND_ADDR` override).
pub fn bind_addr() -> String {
    std::env::var("DUALMIND_BIND_ADDR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
}

/// Hosted-provider API key. `GEMINI_API_KEY` wins over `GOOGLE_API_KEY`.
pub fn hosted_api_key() -> Option<String> {
    ["GEMINI_API_KEY", "GOOGLE_API_KEY"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.trim().is_empty())
}

/// Hosted model identifier (`DUALMIND_HOSTED_MODEL` override).
pub fn hosted_model() -> String {
    std::env::var("DUALMIND_HOSTED_MODEL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HOSTED_MODEL.to_string())
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,dualmind_lib=debug"
    } else {
        "info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_path_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with(DATABASE_FILE));
    }

    #[test]
    fn default_ollama_host_uses_loopback_ip() {
        assert_eq!(DEFAULT_OLLAMA_HOST, "http://127.0.0.1:11434");
    }

    #[test]
    fn vision_and_text_models_differ() {
        assert_ne!(VISION_MODEL, TEXT_MODEL);
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn log_filter_never_empty() {
        assert!(!default_log_filter().is_empty());
    }
}
