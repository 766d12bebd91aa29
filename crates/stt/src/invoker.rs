//! Blocking inference invocation with timeout
//!
//! The core exposes a blocking call contract; callers that need
//! responsiveness offload it to their own worker pool. A caller-supplied
//! timeout is honored here by running the call on a dedicated thread and
//! abandoning it on expiry. whisper.cpp has no cancellation hook, so the
//! worker finishes in the background and its result is dropped.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use taigi_common::{InferenceKind, Result, TaigiError};
use tracing::warn;

use crate::engine::SpeechModel;
use crate::request::TranscriptionRequest;
use crate::types::TranscriptionResult;

/// Run one inference call, honoring the request timeout
pub fn invoke(
    model: Arc<dyn SpeechModel>,
    request: TranscriptionRequest,
) -> Result<TranscriptionResult> {
    let Some(limit) = request.timeout else {
        return model.transcribe(&request);
    };

    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("taigi-infer".to_string())
        .spawn(move || {
            let _ = tx.send(model.transcribe(&request));
        })
        .map_err(|e| {
            TaigiError::inference(
                InferenceKind::Backend,
                format!("Failed to spawn inference worker: {}", e),
            )
        })?;

    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!("Inference exceeded timeout of {:?}", limit);
            Err(TaigiError::timeout(format!(
                "inference did not finish within {:.1}s",
                limit.as_secs_f32()
            )))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(TaigiError::inference(
            InferenceKind::Backend,
            "inference worker terminated unexpectedly",
        )),
    }
}
