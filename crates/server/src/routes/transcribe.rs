use actix_multipart::Multipart;
use actix_web::{post, web, HttpResponse};
use futures_util::StreamExt;
use std::sync::Arc;
use taigi_common::TaigiError;
use taigi_stt::{pipeline, AudioSource, JobOptions};
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::AppState;
use crate::types::{error_response, TranscriptionReport};

/// Transcribe an uploaded audio file or browser recording
///
/// Multipart fields: `audio` (or `file`) carries the bytes; optional
/// `language` overrides the configured default. Uploads are kept in
/// memory and handed to the core as a byte buffer with the filename
/// extension as the format hint.
#[post("/transcribe")]
pub async fn transcribe(
    mut payload: Multipart,
    state: web::Data<Arc<AppState>>,
) -> actix_web::Result<HttpResponse> {
    let request_id = Uuid::new_v4();

    let mut audio_bytes: Option<Vec<u8>> = None;
    let mut filename = String::new();
    let mut language: Option<String> = None;

    while let Some(field) = payload.next().await {
        let mut field = field?;
        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        match name.as_str() {
            "audio" | "file" => {
                filename = field
                    .content_disposition()
                    .get_filename()
                    .unwrap_or("recording.webm")
                    .to_string();

                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    bytes.extend_from_slice(&chunk?);
                }
                audio_bytes = Some(bytes);
            }
            "language" => {
                let mut value = Vec::new();
                while let Some(chunk) = field.next().await {
                    value.extend_from_slice(&chunk?);
                }
                language = Some(String::from_utf8_lossy(&value).trim().to_string());
            }
            _ => {
                // Drain and ignore unknown fields
                while let Some(chunk) = field.next().await {
                    let _ = chunk?;
                }
            }
        }
    }

    let Some(bytes) = audio_bytes else {
        let err = TaigiError::invalid_input("no audio file in upload");
        return Ok(error_response(&err));
    };

    let hint = std::path::Path::new(&filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_string());

    info!(
        %request_id,
        filename = %filename,
        size = bytes.len(),
        "Transcription request received"
    );

    let opts = JobOptions {
        language_hint: language.or_else(|| Some(state.config.language.clone())),
        timeout: state
            .config
            .timeout_secs
            .map(std::time::Duration::from_secs),
        ..Default::default()
    };

    let source = AudioSource::ByteBuffer { bytes, hint };

    // Inference blocks; run it on the worker pool
    let worker_state = state.clone();
    let outcome = web::block(move || {
        pipeline::run(
            worker_state.model.clone(),
            &worker_state.profile,
            source,
            &opts,
        )
    })
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    match outcome {
        Ok(outcome) => Ok(HttpResponse::Ok().json(TranscriptionReport::from_outcome(
            outcome,
            &state.startup_warnings,
        ))),
        Err(e) => {
            warn!(%request_id, error = %e, "Transcription failed");
            Ok(error_response(&e))
        }
    }
}
