//! Whisper inference engine
//!
//! The model runtime is an opaque capability behind the [`SpeechModel`]
//! trait; everything above it is testable with a stub implementation.

use std::path::Path;

use taigi_common::{InferenceKind, Result, TaigiError};
use tracing::{debug, info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::probe::{AttentionMode, ExecutionProfile};
use crate::request::TranscriptionRequest;
use crate::types::{Segment, TranscriptionResult};

/// Narrow interface to the external model runtime
pub trait SpeechModel: Send + Sync {
    /// Run one blocking inference call
    fn transcribe(&self, request: &TranscriptionRequest) -> Result<TranscriptionResult>;

    /// Model identifier for reporting surfaces
    fn name(&self) -> &str;
}

/// whisper.cpp-backed engine for the Taiwanese fine-tune
pub struct WhisperEngine {
    ctx: WhisperContext,
    model_path: String,
    model_name: String,
}

/// Context toggles derived from the probed profile: (use_gpu, flash_attn)
fn backend_toggles(profile: &ExecutionProfile) -> (bool, bool) {
    (
        profile.is_gpu(),
        profile.attention_mode == AttentionMode::Optimized,
    )
}

/// Display name for reporting surfaces; the file stem, never the path
fn model_display_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

fn num_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(4) as i32
}

impl WhisperEngine {
    /// Load a GGML model
    ///
    /// The probed profile decides the context flags (GPU use, flash
    /// attention). When a GPU load fails, a second CPU attempt is made
    /// before giving up.
    pub fn load(model_path: impl AsRef<Path>, profile: &ExecutionProfile) -> Result<Self> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(TaigiError::inference(
                InferenceKind::ModelLoad,
                format!("Model file not found: {}", path.display()),
            ));
        }

        let path_str = path.to_str().ok_or_else(|| {
            TaigiError::inference(
                InferenceKind::ModelLoad,
                format!("Model path is not valid UTF-8: {}", path.display()),
            )
        })?;

        info!(
            "Loading Whisper model from {} ({})",
            path.display(),
            profile.summary()
        );

        let (use_gpu, flash_attn) = backend_toggles(profile);
        let mut params = WhisperContextParameters::default();
        params.use_gpu(use_gpu);
        params.flash_attn(flash_attn);

        let ctx = match WhisperContext::new_with_params(path_str, params) {
            Ok(ctx) => ctx,
            Err(e) if profile.is_gpu() => {
                warn!("Model load failed on {} ({}); retrying on CPU", profile.summary(), e);
                let mut cpu_params = WhisperContextParameters::default();
                cpu_params.use_gpu(false);
                cpu_params.flash_attn(false);
                WhisperContext::new_with_params(path_str, cpu_params).map_err(|e| {
                    TaigiError::inference(
                        InferenceKind::ModelLoad,
                        format!("Failed to load Whisper model even on CPU: {}", e),
                    )
                })?
            }
            Err(e) => {
                return Err(TaigiError::inference(
                    InferenceKind::ModelLoad,
                    format!("Failed to load Whisper model: {}", e),
                ));
            }
        };

        info!("Whisper model loaded");

        Ok(Self {
            ctx,
            model_path: path.to_string_lossy().to_string(),
            model_name: model_display_name(path),
        })
    }

    /// Get model path
    pub fn model_path(&self) -> &str {
        &self.model_path
    }
}

/// Map a request language to the token the upstream tokenizer knows
///
/// The Taiwanese fine-tune is registered under the Chinese language
/// token, so "nan" decodes through "zh".
fn whisper_language_code(language: &str) -> &str {
    match language {
        "nan" => "zh",
        other => other,
    }
}

/// Classify a backend error string into an inference kind
fn classify_backend_error(message: &str) -> InferenceKind {
    let lower = message.to_lowercase();
    if lower.contains("memory") || lower.contains("alloc") {
        InferenceKind::OutOfMemory
    } else {
        InferenceKind::Backend
    }
}

impl SpeechModel for WhisperEngine {
    fn transcribe(&self, request: &TranscriptionRequest) -> Result<TranscriptionResult> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        let language = request.language.as_deref().map(whisper_language_code);
        params.set_language(language);
        params.set_translate(false);
        params.set_token_timestamps(true);
        params.set_n_threads(num_threads());

        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        let mut state = self.ctx.create_state().map_err(|e| {
            TaigiError::inference(
                InferenceKind::Backend,
                format!("Failed to create Whisper state: {}", e),
            )
        })?;

        debug!(
            samples = request.audio.samples().len(),
            language = language.unwrap_or("auto"),
            "Starting Whisper inference"
        );

        state.full(params, request.audio.samples()).map_err(|e| {
            let message = format!("Transcription failed: {}", e);
            TaigiError::inference(classify_backend_error(&message), message)
        })?;

        let num_segments = state.full_n_segments();
        let mut segments = Vec::with_capacity(num_segments as usize);
        let mut prob_sum = 0.0f32;
        let mut prob_count = 0usize;

        for seg_idx in 0..num_segments {
            let Some(segment) = state.get_segment(seg_idx) else {
                continue;
            };

            let mut text = String::new();
            let mut start: Option<i64> = None;
            let mut end: i64 = 0;

            for tok_idx in 0..segment.n_tokens() {
                let Some(token) = segment.get_token(tok_idx) else {
                    continue;
                };
                let Ok(piece) = token.to_str() else {
                    continue;
                };

                // Special tokens like [_BEG_] or <|zh|> carry no speech
                let trimmed = piece.trim();
                if trimmed.starts_with('[') || trimmed.starts_with('<') {
                    continue;
                }
                if trimmed.is_empty() {
                    text.push_str(piece);
                    continue;
                }

                let data = token.token_data();
                start.get_or_insert(data.t0);
                end = data.t1;
                prob_sum += token.token_probability();
                prob_count += 1;
                text.push_str(piece);
            }

            let text = text.trim().to_string();
            if text.is_empty() {
                continue;
            }
            let Some(start) = start else {
                continue;
            };

            // Token timestamps are centiseconds
            segments.push(Segment::new(start as f32 / 100.0, end as f32 / 100.0, text));
        }

        let language = request
            .language
            .clone()
            .unwrap_or_else(|| "auto".to_string());

        debug!("Inference complete: {} segments", segments.len());

        let mut result = TranscriptionResult::from_segments(segments, language);
        if prob_count > 0 {
            result.overall_confidence = Some(prob_sum / prob_count as f32);
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{Device, Precision};

    #[test]
    fn test_load_with_missing_model_fails() {
        let err = WhisperEngine::load("nonexistent_model.bin", &ExecutionProfile::cpu())
            .err()
            .expect("load should fail");
        assert_eq!(err.kind_tag(), "inference_error");
    }

    #[test]
    fn test_language_code_mapping() {
        assert_eq!(whisper_language_code("nan"), "zh");
        assert_eq!(whisper_language_code("zh"), "zh");
        assert_eq!(whisper_language_code("en"), "en");
    }

    #[test]
    fn test_backend_error_classification() {
        assert_eq!(
            classify_backend_error("failed to allocate buffer"),
            InferenceKind::OutOfMemory
        );
        assert_eq!(
            classify_backend_error("CUDA out of memory"),
            InferenceKind::OutOfMemory
        );
        assert_eq!(
            classify_backend_error("unexpected token"),
            InferenceKind::Backend
        );
    }

    #[test]
    fn test_backend_toggles_follow_profile() {
        assert_eq!(backend_toggles(&ExecutionProfile::cpu()), (false, false));

        let cuda = ExecutionProfile {
            device: Device::Cuda,
            precision: Precision::Fp16,
            attention_mode: AttentionMode::Optimized,
            gpu_name: Some("test".to_string()),
            gpu_memory_gb: Some(8.0),
        };
        assert_eq!(backend_toggles(&cuda), (true, true));

        let metal = ExecutionProfile {
            device: Device::Metal,
            precision: Precision::Fp16,
            attention_mode: AttentionMode::Standard,
            gpu_name: None,
            gpu_memory_gb: None,
        };
        assert_eq!(backend_toggles(&metal), (true, false));
    }

    #[test]
    fn test_model_display_name_is_file_stem() {
        assert_eq!(
            model_display_name(Path::new("/srv/models/ggml-taigi-v0.5.bin")),
            "ggml-taigi-v0.5"
        );
        assert_eq!(model_display_name(Path::new("model.bin")), "model");
    }
}
