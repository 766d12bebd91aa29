//! Result presentation
//!
//! Pure formatting: plain text emits the full text only, segmented emits
//! the whole structure as JSON. No timing is re-derived and segments are
//! never merged or reordered here. The segmented shape is one shared
//! struct, so the CLI and the HTTP API emit identical field names.

use serde::Serialize;
use taigi_common::Result;

use crate::pipeline::TranscriptionOutcome;
use crate::probe::ExecutionProfile;
use crate::request::ResponseFormat;
use crate::types::{Segment, TranscriptionResult};

/// Outcome-level wire shape, used verbatim by the CLI's segmented output
/// and the HTTP success response
#[derive(Debug, Serialize)]
pub struct TranscriptionReport {
    /// Full transcribed text
    pub full_text: String,

    /// Ordered segments with timestamps
    pub segments: Vec<Segment>,

    /// Language used for decoding
    pub language: String,

    /// Mean decoder confidence, when available
    pub overall_confidence: Option<f32>,

    /// Profile the inference ran under
    pub execution_profile: ExecutionProfile,

    /// Wall-clock processing time in seconds
    pub processing_time: f32,

    /// Non-fatal notices (degraded backend, ignored overrides)
    pub warnings: Vec<String>,
}

impl TranscriptionReport {
    /// Build from a pipeline outcome plus process-level warnings
    pub fn from_outcome(outcome: TranscriptionOutcome, extra_warnings: &[String]) -> Self {
        let mut warnings = extra_warnings.to_vec();
        warnings.extend(outcome.warnings);

        Self {
            full_text: outcome.result.full_text,
            segments: outcome.result.segments,
            language: outcome.result.language,
            overall_confidence: outcome.result.overall_confidence,
            execution_profile: outcome.profile,
            processing_time: outcome.elapsed.as_secs_f32(),
            warnings,
        }
    }
}

/// Format a bare transcription result for its caller
pub fn present(result: &TranscriptionResult, format: ResponseFormat) -> Result<String> {
    match format {
        ResponseFormat::Text => Ok(result.full_text.clone()),
        ResponseFormat::Segmented => Ok(serde_json::to_string_pretty(result)?),
    }
}

/// Format a full outcome for its caller
///
/// Text emits the transcription only; segmented emits the same JSON
/// document the HTTP API returns.
pub fn present_outcome(
    outcome: TranscriptionOutcome,
    format: ResponseFormat,
    extra_warnings: &[String],
) -> Result<String> {
    match format {
        ResponseFormat::Text => Ok(outcome.result.full_text),
        ResponseFormat::Segmented => Ok(serde_json::to_string_pretty(
            &TranscriptionReport::from_outcome(outcome, extra_warnings),
        )?),
    }
}
