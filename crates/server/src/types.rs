use actix_web::{http::StatusCode, HttpResponse};
use serde::Serialize;
use taigi_common::TaigiError;
use taigi_stt::ExecutionProfile;

// The success body is the same struct the CLI's segmented output uses,
// so both surfaces present identical shapes.
pub use taigi_stt::TranscriptionReport;

/// Failure response with a stable kind tag
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error_kind: String,
    pub message: String,
}

/// Render an error as the HTTP response it maps to
pub fn error_response(err: &TaigiError) -> HttpResponse {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    HttpResponse::build(status).json(ErrorResponse {
        error_kind: err.kind_tag().to_string(),
        message: err.to_string(),
    })
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub gpu_available: bool,
    pub model_loaded: bool,
    pub local_ip: String,
}

/// Network info for mobile access
#[derive(Debug, Serialize)]
pub struct NetworkInfoResponse {
    pub local_ip: String,
    pub port: u16,
}

/// Model info response
#[derive(Debug, Serialize)]
pub struct ModelInfoResponse {
    pub model_name: String,
    pub base_model: &'static str,
    pub language: &'static str,
    pub sample_rate: u32,
    pub supported_formats: Vec<&'static str>,
    pub execution_profile: ExecutionProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let err = TaigiError::decode("invalid header");
        let json = serde_json::to_value(ErrorResponse {
            error_kind: err.kind_tag().to_string(),
            message: err.to_string(),
        })
        .unwrap();

        assert_eq!(json["error_kind"], "decode_error");
        assert!(json["message"].as_str().unwrap().contains("invalid header"));
    }
}
