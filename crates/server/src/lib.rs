//! Taigi STT HTTP server
//!
//! Actix-web REST API plus an embedded browser UI. The server owns
//! upload handling, CORS and request routing; every transcription goes
//! through the core pipeline's single entry point.

pub mod routes;
pub mod state;
pub mod types;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use taigi_common::{AppConfig, ModelManager, Result};
use taigi_stt::WhisperEngine;
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::state::AppState;

/// Resolve the configured model to a local file, downloading a known
/// catalog model on first use
async fn resolve_model(config: &AppConfig) -> Result<std::path::PathBuf> {
    let path = config.resolve_model_path();
    if path.exists() {
        return Ok(path);
    }

    let manager = ModelManager::new(config.models_dir.clone())?;
    manager.ensure_whisper_model(&config.whisper_model).await
}

/// Start the HTTP server; blocks until shutdown
pub async fn start_server(config: AppConfig) -> Result<()> {
    config.validate()?;

    let probe = taigi_stt::detect();
    info!("Execution profile: {}", probe.profile.summary());

    let model_path = resolve_model(&config).await?;

    // Model load is CPU/IO heavy; keep it off the async runtime
    let profile = probe.profile.clone();
    let engine = tokio::task::spawn_blocking(move || WhisperEngine::load(&model_path, &profile))
        .await
        .map_err(|e| anyhow::anyhow!("Model load task failed: {}", e))??;

    let bind_address = config.server_bind_address();
    let state = Arc::new(AppState::new(config, Arc::new(engine), probe));

    info!("Starting server on {}", bind_address);
    info!("Local access:  http://localhost:{}", state.config.server_port);
    info!(
        "Mobile access: http://{}:{}",
        routes::info::local_ip(),
        state.config.server_port
    );

    HttpServer::new(move || {
        // Phones on the LAN talk to us from arbitrary origins
        let cors = Cors::permissive();

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .service(routes::index::index)
            .service(routes::transcribe::transcribe)
            .service(routes::info::health)
            .service(routes::info::network_info)
            .service(routes::info::model_info)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
