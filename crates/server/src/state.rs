use std::sync::Arc;

use taigi_common::AppConfig;
use taigi_stt::{ExecutionProfile, ProbeReport, SpeechModel};

/// Shared application state
///
/// The execution profile is computed once at startup and read-only
/// afterwards; the model handle is shared across requests.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Loaded speech model
    pub model: Arc<dyn SpeechModel>,

    /// Profile inference runs under
    pub profile: ExecutionProfile,

    /// Non-fatal degradations from backend detection, reported alongside
    /// every successful response
    pub startup_warnings: Vec<String>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: AppConfig, model: Arc<dyn SpeechModel>, probe: &ProbeReport) -> Self {
        Self {
            config,
            model,
            profile: probe.profile.clone(),
            startup_warnings: probe.warnings.clone(),
        }
    }
}
