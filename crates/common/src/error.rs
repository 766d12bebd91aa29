use serde::{Deserialize, Serialize};

/// Category of an inference runtime failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceKind {
    /// Model file missing, unreadable, or rejected by the runtime
    ModelLoad,

    /// Runtime ran out of device or host memory
    OutOfMemory,

    /// Any other backend-level failure
    Backend,

    /// Caller-supplied timeout elapsed before inference finished
    Timeout,
}

/// Taigi STT error types
#[derive(Debug, thiserror::Error)]
pub enum TaigiError {
    /// Malformed or unsupported audio input
    #[error("decode error: {0}")]
    Decode(String),

    /// Invalid request options
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Model runtime failure, including timeouts
    #[error("inference error: {message}")]
    Inference {
        kind: InferenceKind,
        message: String,
    },

    /// Not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid caller input outside the request options
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Network/HTTP error (model downloads)
    #[error("network error: {0}")]
    Network(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaigiError {
    /// Create decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create inference error with an explicit kind
    pub fn inference<S: Into<String>>(kind: InferenceKind, msg: S) -> Self {
        Self::Inference {
            kind,
            message: msg.into(),
        }
    }

    /// Create inference timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::inference(InferenceKind::Timeout, msg)
    }

    /// Create not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Stable machine-readable tag, shared by the CLI and HTTP surfaces
    pub fn kind_tag(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode_error",
            Self::Configuration(_) => "configuration_error",
            Self::Inference {
                kind: InferenceKind::Timeout,
                ..
            } => "timeout",
            Self::Inference { .. } => "inference_error",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Network(_) => "network_error",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Other(_) => "internal_error",
        }
    }
}

// HTTP response conversion (for actix-web)
impl TaigiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Decode(_) => 400,
            Self::Configuration(_) => 400,
            Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::Inference {
                kind: InferenceKind::Timeout,
                ..
            } => 504,
            Self::Inference { .. } => 500,
            Self::Network(_) => 503,
            Self::Io(_) => 500,
            Self::Json(_) => 400,
            Self::Other(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(TaigiError::decode("bad header").kind_tag(), "decode_error");
        assert_eq!(
            TaigiError::configuration("bad format").kind_tag(),
            "configuration_error"
        );
        assert_eq!(
            TaigiError::inference(InferenceKind::Backend, "boom").kind_tag(),
            "inference_error"
        );
        assert_eq!(TaigiError::timeout("too slow").kind_tag(), "timeout");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(TaigiError::decode("x").status_code(), 400);
        assert_eq!(TaigiError::timeout("x").status_code(), 504);
        assert_eq!(
            TaigiError::inference(InferenceKind::OutOfMemory, "x").status_code(),
            500
        );
        assert_eq!(TaigiError::not_found("x").status_code(), 404);
    }
}
