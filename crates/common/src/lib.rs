pub mod config;
pub mod error;
pub mod logger;
pub mod model_manager;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{InferenceKind, TaigiError};
pub use model_manager::{available_whisper_models, ModelManager, WhisperModel};
pub type Result<T> = std::result::Result<T, TaigiError>;
