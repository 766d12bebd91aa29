//! Taigi STT core
//!
//! Turns arbitrary audio input plus the runtime environment into a
//! single well-formed inference request against a Whisper model tuned
//! for Taiwanese Hokkien, and formats the result for CLI and HTTP
//! callers.

pub mod audio;
pub mod engine;
pub mod invoker;
pub mod pipeline;
pub mod present;
pub mod probe;
pub mod request;
pub mod types;

// Re-export main types
pub use audio::{normalize, AudioSource, NormalizeOptions, NormalizedAudio, TARGET_SAMPLE_RATE};
pub use engine::{SpeechModel, WhisperEngine};
pub use pipeline::{JobOptions, TranscriptionOutcome};
pub use present::{present, present_outcome, TranscriptionReport};
pub use probe::{detect, AttentionMode, Device, ExecutionProfile, Precision, ProbeReport};
pub use request::{ResponseFormat, SUPPORTED_LANGUAGES};
pub use types::{Segment, TranscriptionResult};
