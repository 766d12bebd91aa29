//! Transcription request assembly
//!
//! Combines a normalized waveform, the execution profile and per-call
//! overrides into one immutable request. Pure assembly: the only failure
//! mode is an invalid override, and an unsupported language hint is
//! dropped with a caller-visible notice so transcription can still
//! proceed with auto-detection.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use taigi_common::{Result, TaigiError};
use tracing::warn;

use crate::audio::NormalizedAudio;
use crate::probe::ExecutionProfile;

/// Languages the model is tuned for
///
/// "nan" is Taiwanese Hokkien; "zh" covers Mandarin input, "en" mixed
/// English.
pub const SUPPORTED_LANGUAGES: &[&str] = &["nan", "zh", "en"];

/// Output shape requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Full text only
    #[default]
    Text,

    /// Full text plus the ordered segment list, as JSON
    Segmented,
}

impl FromStr for ResponseFormat {
    type Err = TaigiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "segmented" | "json" => Ok(Self::Segmented),
            other => Err(TaigiError::configuration(format!(
                "unsupported response format '{}' (expected 'text' or 'segmented')",
                other
            ))),
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Segmented => write!(f, "segmented"),
        }
    }
}

/// Optional per-call overrides
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    /// Preferred language (ISO code); must be in [`SUPPORTED_LANGUAGES`]
    pub language_hint: Option<String>,

    /// Output shape; defaults to plain text
    pub response_format: Option<ResponseFormat>,

    /// Upper bound on the inference call
    pub timeout: Option<Duration>,
}

/// Immutable inference request; one request maps to exactly one
/// inference call
#[derive(Debug)]
pub struct TranscriptionRequest {
    pub audio: NormalizedAudio,
    pub profile: ExecutionProfile,
    pub language: Option<String>,
    pub response_format: ResponseFormat,
    pub timeout: Option<Duration>,
}

/// A built request plus any caller-visible notices produced while
/// applying overrides
#[derive(Debug)]
pub struct BuiltRequest {
    pub request: TranscriptionRequest,
    pub notices: Vec<String>,
}

/// Assemble a request
pub fn build(
    audio: NormalizedAudio,
    profile: &ExecutionProfile,
    overrides: RequestOverrides,
) -> Result<BuiltRequest> {
    let mut notices = Vec::new();

    let language = match overrides.language_hint {
        Some(lang) => {
            let lang = lang.to_lowercase();
            if SUPPORTED_LANGUAGES.contains(&lang.as_str()) {
                Some(lang)
            } else {
                warn!("Unsupported language hint '{}', falling back to auto-detection", lang);
                notices.push(format!(
                    "language hint '{}' is not supported (expected one of {}); using auto-detection",
                    lang,
                    SUPPORTED_LANGUAGES.join(", ")
                ));
                None
            }
        }
        None => None,
    };

    Ok(BuiltRequest {
        request: TranscriptionRequest {
            audio,
            profile: profile.clone(),
            language,
            response_format: overrides.response_format.unwrap_or_default(),
            timeout: overrides.timeout,
        },
        notices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canned_audio() -> NormalizedAudio {
        NormalizedAudio::from_mono_16k(vec![0.0; 16_000])
    }

    #[test]
    fn test_build_with_supported_language() {
        let built = build(
            canned_audio(),
            &ExecutionProfile::cpu(),
            RequestOverrides {
                language_hint: Some("NAN".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(built.request.language.as_deref(), Some("nan"));
        assert!(built.notices.is_empty());
        assert_eq!(built.request.response_format, ResponseFormat::Text);
    }

    #[test]
    fn test_unsupported_language_is_dropped_with_notice() {
        let built = build(
            canned_audio(),
            &ExecutionProfile::cpu(),
            RequestOverrides {
                language_hint: Some("fr".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(built.request.language.is_none());
        assert_eq!(built.notices.len(), 1);
        assert!(built.notices[0].contains("fr"));
    }

    #[test]
    fn test_response_format_parsing() {
        assert_eq!("text".parse::<ResponseFormat>().unwrap(), ResponseFormat::Text);
        assert_eq!(
            "segmented".parse::<ResponseFormat>().unwrap(),
            ResponseFormat::Segmented
        );
        assert_eq!(
            "JSON".parse::<ResponseFormat>().unwrap(),
            ResponseFormat::Segmented
        );

        let err = "xml".parse::<ResponseFormat>().unwrap_err();
        assert_eq!(err.kind_tag(), "configuration_error");
    }

    #[test]
    fn test_timeout_is_carried_through() {
        let built = build(
            canned_audio(),
            &ExecutionProfile::cpu(),
            RequestOverrides {
                timeout: Some(Duration::from_secs(30)),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(built.request.timeout, Some(Duration::from_secs(30)));
    }
}
