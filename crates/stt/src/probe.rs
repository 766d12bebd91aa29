//! Compute backend detection
//!
//! Probes the runtime environment once per process and selects the best
//! available device/precision/attention combination. Detection never
//! fails: any probe error degrades to the CPU profile and is reported as
//! a warning next to the result instead of aborting.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Compute device used for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    /// CUDA (NVIDIA GPU)
    Cuda,
    /// Metal (Apple GPU)
    Metal,
}

/// Inference precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Fp16,
    Fp32,
}

/// Attention kernel variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttentionMode {
    Standard,
    Optimized,
}

/// Selected combination of compute device and optimization mode
///
/// Immutable once computed; every request reads the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionProfile {
    pub device: Device,
    pub precision: Precision,
    pub attention_mode: AttentionMode,

    /// GPU name as reported by the driver, when a GPU was selected
    pub gpu_name: Option<String>,

    /// Total GPU memory in GiB, when known
    pub gpu_memory_gb: Option<f32>,
}

impl ExecutionProfile {
    /// The fully degraded profile, always usable
    pub fn cpu() -> Self {
        Self {
            device: Device::Cpu,
            precision: Precision::Fp32,
            attention_mode: AttentionMode::Standard,
            gpu_name: None,
            gpu_memory_gb: None,
        }
    }

    /// Whether inference runs on a GPU backend
    pub fn is_gpu(&self) -> bool {
        self.device != Device::Cpu
    }

    /// Short human-readable summary, e.g. "cuda/fp16/optimized"
    pub fn summary(&self) -> String {
        let device = match self.device {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
            Device::Metal => "metal",
        };
        let precision = match self.precision {
            Precision::Fp16 => "fp16",
            Precision::Fp32 => "fp32",
        };
        let attention = match self.attention_mode {
            AttentionMode::Standard => "standard",
            AttentionMode::Optimized => "optimized",
        };
        format!("{}/{}/{}", device, precision, attention)
    }
}

/// Result of the one-time environment probe
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub profile: ExecutionProfile,

    /// Non-fatal degradations observed during detection
    pub warnings: Vec<String>,
}

static PROBE: OnceLock<ProbeReport> = OnceLock::new();

/// Detect the execution profile for this process
///
/// Memoized: hardware probing runs at most once even under concurrent
/// first callers, every caller sees the same report.
pub fn detect() -> &'static ProbeReport {
    PROBE.get_or_init(probe_environment)
}

/// Single uncached probe pass
///
/// GPU support is controlled by compile-time features, mirroring the
/// whisper.cpp build: `--features cuda` selects the CUDA backend,
/// `--features metal` the Metal backend, otherwise CPU only. On CUDA the
/// driver is queried for the device name and memory so the precision can
/// be chosen; fp16 needs at least 4 GiB. The selected attention mode is
/// forwarded to the whisper context when the model loads.
fn probe_environment() -> ProbeReport {
    let mut warnings = Vec::new();

    let mut profile = if cfg!(feature = "cuda") {
        match query_cuda_device() {
            Ok(Some((name, memory_gb))) => {
                info!("CUDA device detected: {} ({:.1} GiB)", name, memory_gb);
                let precision = if memory_gb >= 4.0 {
                    Precision::Fp16
                } else {
                    Precision::Fp32
                };
                ExecutionProfile {
                    device: Device::Cuda,
                    precision,
                    attention_mode: AttentionMode::Standard,
                    gpu_name: Some(name),
                    gpu_memory_gb: Some(memory_gb),
                }
            }
            Ok(None) => {
                warn!("CUDA build but no GPU visible to the driver; using CPU");
                warnings
                    .push("CUDA build but no GPU visible to the driver; using CPU".to_string());
                ExecutionProfile::cpu()
            }
            Err(e) => {
                warn!("GPU probe failed ({}); using CPU", e);
                warnings.push(format!("GPU probe failed ({}); using CPU", e));
                ExecutionProfile::cpu()
            }
        }
    } else if cfg!(feature = "metal") {
        info!("Metal feature enabled; using Metal backend");
        ExecutionProfile {
            device: Device::Metal,
            precision: Precision::Fp16,
            attention_mode: AttentionMode::Standard,
            gpu_name: None,
            gpu_memory_gb: None,
        }
    } else {
        info!("No GPU features enabled; using CPU");
        ExecutionProfile::cpu()
    };

    if profile.is_gpu() && cfg!(feature = "flash-attn") {
        profile.attention_mode = AttentionMode::Optimized;
        info!("Optimized attention kernel enabled");
    }

    info!("Execution profile: {}", profile.summary());

    ProbeReport { profile, warnings }
}

/// Ask nvidia-smi for the first GPU's name and total memory
///
/// Returns Ok(None) when the tool runs but reports no device.
fn query_cuda_device() -> std::io::Result<Option<(String, f32)>> {
    use std::process::Command;

    let output = Command::new("nvidia-smi")
        .args([
            "--query-gpu=name,memory.total",
            "--format=csv,noheader,nounits",
        ])
        .output()?;

    if !output.status.success() {
        return Ok(None);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let Some(line) = stdout.lines().next() else {
        return Ok(None);
    };

    let mut parts = line.splitn(2, ',');
    let name = parts.next().unwrap_or("unknown").trim().to_string();
    let memory_mib: f32 = parts
        .next()
        .and_then(|m| m.trim().parse().ok())
        .unwrap_or(0.0);

    Ok(Some((name, memory_mib / 1024.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cpu_profile_is_fully_degraded() {
        let profile = ExecutionProfile::cpu();
        assert_eq!(profile.device, Device::Cpu);
        assert_eq!(profile.precision, Precision::Fp32);
        assert_eq!(profile.attention_mode, AttentionMode::Standard);
        assert!(!profile.is_gpu());
        assert_eq!(profile.summary(), "cpu/fp32/standard");
    }

    #[test]
    fn test_probe_without_gpu_features_selects_cpu() {
        // This test build has no GPU features enabled
        if !cfg!(feature = "cuda") && !cfg!(feature = "metal") {
            let report = probe_environment();
            assert_eq!(report.profile.device, Device::Cpu);
            assert_eq!(report.profile.attention_mode, AttentionMode::Standard);
        }
    }

    #[test]
    fn test_detect_is_consistent_across_threads() {
        let mut handles = Vec::new();
        for _ in 0..8 {
            handles.push(std::thread::spawn(|| detect().profile.clone()));
        }

        let first = detect().profile.clone();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), first);
        }
    }

    #[test]
    fn test_once_lock_initializes_exactly_once_under_contention() {
        // Same single-flight primitive detect() relies on
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        static CELL: OnceLock<u32> = OnceLock::new();

        let mut handles = Vec::new();
        for _ in 0..16 {
            handles.push(std::thread::spawn(|| {
                *CELL.get_or_init(|| {
                    CALLS.fetch_add(1, Ordering::SeqCst);
                    42
                })
            }));
        }

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 42);
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_profile_serializes_lowercase() {
        let profile = ExecutionProfile::cpu();
        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("\"device\":\"cpu\""));
        assert!(json.contains("\"precision\":\"fp32\""));
        assert!(json.contains("\"attention_mode\":\"standard\""));
    }
}
