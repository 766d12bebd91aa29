use actix_web::{get, web, HttpResponse};
use std::net::UdpSocket;
use std::sync::Arc;
use taigi_stt::audio::SUPPORTED_EXTENSIONS;
use taigi_stt::TARGET_SAMPLE_RATE;

use crate::state::AppState;
use crate::types::{HealthResponse, ModelInfoResponse, NetworkInfoResponse};

/// Best-effort LAN IP discovery
///
/// Opens a UDP socket toward a public address; no packet is sent, the
/// local side of the route is what we want.
pub fn local_ip() -> String {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "127.0.0.1".to_string())
}

/// Health check
#[get("/health")]
pub async fn health(state: web::Data<Arc<AppState>>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        gpu_available: state.profile.is_gpu(),
        model_loaded: true,
        local_ip: local_ip(),
    })
}

/// Network info so a phone on the same Wi-Fi can find the server
#[get("/network_info")]
pub async fn network_info(state: web::Data<Arc<AppState>>) -> HttpResponse {
    HttpResponse::Ok().json(NetworkInfoResponse {
        local_ip: local_ip(),
        port: state.config.server_port,
    })
}

/// Model and backend report
#[get("/model_info")]
pub async fn model_info(state: web::Data<Arc<AppState>>) -> HttpResponse {
    HttpResponse::Ok().json(ModelInfoResponse {
        model_name: state.model.name().to_string(),
        base_model: "openai/whisper-large-v3-turbo",
        language: "Taiwanese Hokkien (Tâi-gí)",
        sample_rate: TARGET_SAMPLE_RATE,
        supported_formats: SUPPORTED_EXTENSIONS.to_vec(),
        execution_profile: state.profile.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_ip_returns_something() {
        let ip = local_ip();
        assert!(!ip.is_empty());
        assert!(ip.parse::<std::net::IpAddr>().is_ok());
    }
}
