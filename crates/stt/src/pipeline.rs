//! Single transcription pipeline
//!
//! The one entry point shared by the CLI and the HTTP server:
//! normalize → build request → invoke → outcome. Each call is a
//! stateless unit of work; the cached execution profile is the only
//! shared state and is read-only here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use taigi_common::Result;
use tracing::info;

use crate::audio::{self, AudioSource, NormalizeOptions};
use crate::engine::SpeechModel;
use crate::invoker;
use crate::probe::ExecutionProfile;
use crate::request::{self, RequestOverrides, ResponseFormat};
use crate::types::TranscriptionResult;

/// Per-call options, transport-independent
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    pub language_hint: Option<String>,
    pub response_format: ResponseFormat,
    pub timeout: Option<Duration>,
    pub trim_silence: bool,
}

/// Everything a caller needs to render a response
#[derive(Debug)]
pub struct TranscriptionOutcome {
    pub result: TranscriptionResult,

    /// Profile the inference ran under
    pub profile: ExecutionProfile,

    /// Non-fatal notices (degraded backend, ignored overrides)
    pub warnings: Vec<String>,

    /// Wall-clock processing time
    pub elapsed: Duration,
}

/// Run one transcription end to end
pub fn run(
    model: Arc<dyn SpeechModel>,
    profile: &ExecutionProfile,
    source: AudioSource,
    opts: &JobOptions,
) -> Result<TranscriptionOutcome> {
    let started = Instant::now();

    let normalize_opts = NormalizeOptions {
        trim_silence: opts.trim_silence,
    };
    let audio = audio::normalize(source, &normalize_opts)?;

    info!(
        duration_secs = audio.duration(),
        profile = %profile.summary(),
        "Audio normalized, starting transcription"
    );

    let built = request::build(
        audio,
        profile,
        RequestOverrides {
            language_hint: opts.language_hint.clone(),
            response_format: Some(opts.response_format),
            timeout: opts.timeout,
        },
    )?;

    let warnings = built.notices;
    let result = invoker::invoke(model, built.request)?;

    let elapsed = started.elapsed();
    info!(
        segments = result.segments.len(),
        chars = result.full_text.len(),
        elapsed_secs = elapsed.as_secs_f32(),
        "Transcription finished"
    );

    Ok(TranscriptionOutcome {
        result,
        profile: profile.clone(),
        warnings,
        elapsed,
    })
}
