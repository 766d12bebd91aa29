use crate::error::TaigiError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Taigi STT application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding GGML model files
    pub models_dir: PathBuf,

    /// Whisper model name (catalog entry) or explicit file path
    pub whisper_model: String,

    /// Default transcription language (ISO code)
    pub language: String,

    /// Server bind address
    pub server_host: String,

    /// Server port
    pub server_port: u16,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,

    /// Per-request inference timeout in seconds (None = unbounded)
    pub timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("./models"),
            whisper_model: "taigi-v0.5".to_string(),
            language: "nan".to_string(),
            server_host: "0.0.0.0".to_string(),
            server_port: 5000,
            log_dir: PathBuf::from("./log"),
            log_level: "info".to_string(),
            timeout_secs: Some(300),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, TaigiError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let defaults = Self::default();

        let config = Self {
            models_dir: Self::get_env_path("TAIGI_MODELS_DIR").unwrap_or(defaults.models_dir),
            whisper_model: std::env::var("TAIGI_MODEL").unwrap_or(defaults.whisper_model),
            language: std::env::var("TAIGI_LANGUAGE").unwrap_or(defaults.language),
            server_host: std::env::var("TAIGI_HOST").unwrap_or(defaults.server_host),
            server_port: std::env::var("TAIGI_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.server_port),
            log_dir: Self::get_env_path("TAIGI_LOG_DIR").unwrap_or(defaults.log_dir),
            log_level: std::env::var("TAIGI_LOG_LEVEL").unwrap_or(defaults.log_level),
            timeout_secs: match std::env::var("TAIGI_TIMEOUT_SECS") {
                Ok(v) => {
                    let secs: u64 = v.parse().map_err(|_| {
                        TaigiError::configuration(format!(
                            "TAIGI_TIMEOUT_SECS must be an integer, got '{}'",
                            v
                        ))
                    })?;
                    if secs == 0 {
                        None
                    } else {
                        Some(secs)
                    }
                }
                Err(_) => defaults.timeout_secs,
            },
        };

        config.ensure_directories()?;

        Ok(config)
    }

    /// Get PathBuf from environment variable
    fn get_env_path(key: &str) -> Option<PathBuf> {
        std::env::var(key).ok().map(PathBuf::from)
    }

    /// Ensure required directories exist, create if not
    pub fn ensure_directories(&self) -> Result<(), TaigiError> {
        for dir in [&self.models_dir, &self.log_dir] {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    TaigiError::configuration(format!(
                        "Failed to create directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(())
    }

    /// Resolve the model setting to a file path
    ///
    /// An explicit path (contains a separator or exists on disk) is used as
    /// is; otherwise the name is looked up under the models directory using
    /// the ggml naming convention.
    pub fn resolve_model_path(&self) -> PathBuf {
        let as_path = PathBuf::from(&self.whisper_model);
        if as_path.exists() || self.whisper_model.contains(std::path::MAIN_SEPARATOR) {
            return as_path;
        }
        self.models_dir
            .join(format!("ggml-{}.bin", self.whisper_model))
    }

    /// Get server bind address (host:port)
    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), TaigiError> {
        if self.whisper_model.is_empty() {
            return Err(TaigiError::configuration(
                "Whisper model name cannot be empty",
            ));
        }

        if self.server_port == 0 {
            return Err(TaigiError::configuration("Server port cannot be 0"));
        }

        if self.language.is_empty() {
            return Err(TaigiError::configuration(
                "Default language cannot be empty",
            ));
        }

        Ok(())
    }
}
