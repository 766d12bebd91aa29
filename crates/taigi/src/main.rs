use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use taigi_common::{logger, AppConfig, ModelManager};
use taigi_stt::{
    audio, pipeline, present, AudioSource, JobOptions, ResponseFormat, SpeechModel,
    TranscriptionOutcome, WhisperEngine, SUPPORTED_LANGUAGES, TARGET_SAMPLE_RATE,
};

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "taigi")]
#[command(about = "Taiwanese Hokkien speech-to-text (Whisper Taigi fine-tune)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server with the browser UI
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long)]
        port: Option<u16>,

        /// Bind to 127.0.0.1 only (no LAN access)
        #[arg(long)]
        local: bool,
    },

    /// Transcribe a single audio file or remote URL
    Transcribe {
        /// Audio file path, or an http(s) URL to fetch and transcribe
        input: String,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Language hint (nan, zh, en); unsupported hints fall back to auto
        #[arg(short, long)]
        language: Option<String>,

        /// Output format: text or segmented
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Abort inference after this many seconds (0 disables)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Drop leading and trailing silence before inference
        #[arg(long)]
        trim_silence: bool,
    },

    /// Transcribe every audio file under a directory
    Batch {
        /// Directory to scan recursively
        dir: PathBuf,

        /// Directory for the result files (defaults to alongside the input)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Language hint (nan, zh, en)
        #[arg(short, long)]
        language: Option<String>,

        /// Output format: text or segmented
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Per-file inference timeout in seconds (0 disables)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Drop leading and trailing silence before inference
        #[arg(long)]
        trim_silence: bool,
    },

    /// Show model catalog, installed models and the execution profile
    Info,

    /// Verify configuration, backend and model availability
    Check,
}

/// Resolve the configured model, downloading a catalog model if needed
async fn resolve_model(config: &AppConfig) -> Result<PathBuf> {
    let path = config.resolve_model_path();
    if path.exists() {
        return Ok(path);
    }

    let manager = ModelManager::new(config.models_dir.clone())?;
    Ok(manager.ensure_whisper_model(&config.whisper_model).await?)
}

/// Probe the environment and load the Whisper engine off the async runtime
async fn load_engine(config: &AppConfig) -> Result<Arc<WhisperEngine>> {
    let probe = taigi_stt::detect();
    for warning in &probe.warnings {
        tracing::warn!("{}", warning);
    }

    let model_path = resolve_model(config).await?;
    let profile = probe.profile.clone();
    let engine =
        tokio::task::spawn_blocking(move || WhisperEngine::load(&model_path, &profile)).await??;

    Ok(Arc::new(engine))
}

fn job_options(
    config: &AppConfig,
    language: Option<String>,
    format: &str,
    timeout_secs: Option<u64>,
    trim_silence: bool,
) -> Result<JobOptions> {
    let response_format: ResponseFormat = format.parse()?;
    let timeout = match timeout_secs {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => config.timeout_secs.map(Duration::from_secs),
    };

    Ok(JobOptions {
        language_hint: language.or_else(|| Some(config.language.clone())),
        response_format,
        timeout,
        trim_silence,
    })
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Extension of the URL's path component, if it has one
fn url_extension_hint(url: &str) -> Option<String> {
    let path = url.split(|c| c == '?' || c == '#').next().unwrap_or(url);
    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Fetch remote audio into memory, hinting the format from the URL path
async fn fetch_audio(url: &str) -> Result<AudioSource> {
    tracing::info!("Downloading audio from {}", url);
    let response = reqwest::get(url).await?.error_for_status()?;
    let bytes = response.bytes().await?.to_vec();

    Ok(AudioSource::ByteBuffer {
        bytes,
        hint: url_extension_hint(url),
    })
}

async fn resolve_source(input: &str) -> Result<AudioSource> {
    if is_url(input) {
        fetch_audio(input).await
    } else {
        Ok(AudioSource::FilePath(PathBuf::from(input)))
    }
}

/// Run one source through the pipeline on a blocking thread
async fn run_source(
    engine: Arc<WhisperEngine>,
    source: AudioSource,
    opts: JobOptions,
) -> Result<TranscriptionOutcome> {
    let profile = taigi_stt::detect().profile.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        let model: Arc<dyn SpeechModel> = engine;
        pipeline::run(model, &profile, source, &opts)
    })
    .await??;

    Ok(outcome)
}

/// Collect supported audio files under `dir`, recursively, in sorted order
fn collect_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else if audio::is_supported_audio(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

fn output_extension(format: ResponseFormat) -> &'static str {
    match format {
        ResponseFormat::Text => "txt",
        ResponseFormat::Segmented => "json",
    }
}

async fn cmd_transcribe(
    config: AppConfig,
    input: String,
    output: Option<PathBuf>,
    opts: JobOptions,
) -> Result<()> {
    let engine = load_engine(&config).await?;
    let source = resolve_source(&input).await?;
    let format = opts.response_format;

    let outcome = run_source(engine, source, opts).await?;
    for warning in &outcome.warnings {
        tracing::warn!("{}", warning);
    }
    tracing::info!(
        "Transcribed {} in {:.1}s",
        input,
        outcome.elapsed.as_secs_f32()
    );

    let rendered = present::present_outcome(outcome, format, &taigi_stt::detect().warnings)?;

    match output {
        Some(path) => {
            std::fs::write(&path, rendered)?;
            println!("Result written to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

async fn cmd_batch(
    config: AppConfig,
    dir: PathBuf,
    output_dir: Option<PathBuf>,
    opts: JobOptions,
) -> Result<()> {
    let files = collect_audio_files(&dir)?;
    if files.is_empty() {
        println!("No audio files found under {}", dir.display());
        return Ok(());
    }

    if let Some(out) = &output_dir {
        std::fs::create_dir_all(out)?;
    }

    let engine = load_engine(&config).await?;
    let extension = output_extension(opts.response_format);
    let started = chrono::Local::now();

    println!(
        "Batch started {} ({} files)",
        started.format("%Y-%m-%d %H:%M:%S"),
        files.len()
    );

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    let mut total = Duration::ZERO;

    for (i, file) in files.iter().enumerate() {
        println!("[{}/{}] {}", i + 1, files.len(), file.display());

        let source = AudioSource::FilePath(file.clone());
        match run_source(engine.clone(), source, opts.clone()).await {
            Ok(outcome) => {
                for warning in &outcome.warnings {
                    tracing::warn!("{}: {}", file.display(), warning);
                }

                let dest = match &output_dir {
                    Some(out) => {
                        let name = file.file_name().unwrap_or_else(|| OsStr::new("out"));
                        out.join(name).with_extension(extension)
                    }
                    None => file.with_extension(extension),
                };

                let elapsed = outcome.elapsed;
                let rendered = present::present_outcome(
                    outcome,
                    opts.response_format,
                    &taigi_stt::detect().warnings,
                )?;
                std::fs::write(&dest, rendered)?;

                succeeded += 1;
                total += elapsed;
                println!("    -> {} ({:.1}s)", dest.display(), elapsed.as_secs_f32());
            }
            Err(e) => {
                failed += 1;
                eprintln!("    failed: {}", e);
            }
        }
    }

    println!();
    println!(
        "Batch finished {}: {} ok, {} failed, {:.1}s inference time",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        succeeded,
        failed,
        total.as_secs_f32()
    );

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_info(config: AppConfig) -> Result<()> {
    let probe = taigi_stt::detect();

    println!("Taigi STT");
    println!("  Default model:     {}", config.whisper_model);
    println!("  Base model:        openai/whisper-large-v3-turbo");
    println!("  Languages:         {}", SUPPORTED_LANGUAGES.join(", "));
    println!("  Sample rate:       {} Hz", TARGET_SAMPLE_RATE);
    println!("  Execution profile: {}", probe.profile.summary());
    if let Some(name) = &probe.profile.gpu_name {
        println!("  GPU:               {}", name);
    }
    for warning in &probe.warnings {
        println!("  Warning:           {}", warning);
    }

    let manager = ModelManager::new(config.models_dir.clone())?;
    let installed = manager.list_installed_models().await.unwrap_or_default();

    println!();
    println!("Model catalog ({}):", config.models_dir.display());
    for model in taigi_common::available_whisper_models() {
        let marker = if installed.contains(&model.name) {
            "installed"
        } else {
            "available"
        };
        println!(
            "  {:16} {:>7.0} MB  {}",
            model.name,
            model.size_mb(),
            marker
        );
    }

    Ok(())
}

async fn cmd_check(config: AppConfig) -> Result<()> {
    let mut ok = true;

    match config.validate() {
        Ok(()) => println!("[ok]   configuration valid"),
        Err(e) => {
            ok = false;
            println!("[fail] configuration: {}", e);
        }
    }

    let probe = taigi_stt::detect();
    println!("[ok]   backend: {}", probe.profile.summary());
    for warning in &probe.warnings {
        println!("[warn] {}", warning);
    }

    let model_path = config.resolve_model_path();
    if model_path.exists() {
        println!("[ok]   model present: {}", model_path.display());
    } else {
        let known = taigi_common::available_whisper_models()
            .iter()
            .any(|m| m.name == config.whisper_model);
        if known {
            println!(
                "[warn] model '{}' not downloaded yet; it will be fetched on first use",
                config.whisper_model
            );
        } else {
            ok = false;
            println!(
                "[fail] model '{}' not found at {} and not in the catalog",
                config.whisper_model,
                model_path.display()
            );
        }
    }

    match config.ensure_directories() {
        Ok(()) => println!("[ok]   data directories writable"),
        Err(e) => {
            ok = false;
            println!("[fail] data directories: {}", e);
        }
    }

    if !ok {
        std::process::exit(1);
    }
    println!();
    println!("All checks passed");
    Ok(())
}

async fn cmd_serve(host: Option<String>, port: Option<u16>, local: bool) -> Result<()> {
    if local {
        std::env::set_var("TAIGI_HOST", "127.0.0.1");
    } else if let Some(host) = &host {
        std::env::set_var("TAIGI_HOST", host);
    }
    if let Some(port) = port {
        std::env::set_var("TAIGI_PORT", port.to_string());
    }

    let config = AppConfig::from_env()?;
    logger::setup_logging(&config.log_dir, &config.log_level)?;

    tracing::info!("Taigi STT server starting");
    tracing::info!("  Host: {}", config.server_host);
    tracing::info!("  Port: {}", config.server_port);
    tracing::info!("  Model: {}", config.whisper_model);

    println!("Server listening on http://{}", config.server_bind_address());

    taigi_server::start_server(config).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    load_dotenv_from_project_root();

    match cli.command {
        Some(Commands::Serve { host, port, local }) => cmd_serve(host, port, local).await?,
        Some(Commands::Transcribe {
            input,
            output,
            language,
            format,
            timeout_secs,
            trim_silence,
        }) => {
            let config = AppConfig::from_env()?;
            logger::setup_console_logging(&config.log_level)?;
            let opts = job_options(&config, language, &format, timeout_secs, trim_silence)?;
            cmd_transcribe(config, input, output, opts).await?;
        }
        Some(Commands::Batch {
            dir,
            output_dir,
            language,
            format,
            timeout_secs,
            trim_silence,
        }) => {
            let config = AppConfig::from_env()?;
            logger::setup_console_logging(&config.log_level)?;
            let opts = job_options(&config, language, &format, timeout_secs, trim_silence)?;
            cmd_batch(config, dir, output_dir, opts).await?;
        }
        Some(Commands::Info) => {
            let config = AppConfig::from_env()?;
            logger::setup_console_logging("warn")?;
            cmd_info(config).await?;
        }
        Some(Commands::Check) => {
            let config = AppConfig::from_env()?;
            logger::setup_console_logging("warn")?;
            cmd_check(config).await?;
        }
        None => {
            // Default: start the server, matching the launcher behavior
            cmd_serve(None, None, false).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_detection() {
        assert!(is_url("https://example.com/clip.wav"));
        assert!(is_url("http://10.0.0.5:8000/a.mp3"));
        assert!(!is_url("recordings/clip.wav"));
        assert!(!is_url("/srv/audio/clip.wav"));
        assert!(!is_url("ftp://example.com/clip.wav"));
    }

    #[test]
    fn test_url_extension_hint() {
        assert_eq!(
            url_extension_hint("https://example.com/clip.wav"),
            Some("wav".to_string())
        );
        assert_eq!(
            url_extension_hint("https://example.com/clip.WAV?token=abc"),
            Some("wav".to_string())
        );
        assert_eq!(
            url_extension_hint("https://example.com/a/b/recording.m4a#t=30"),
            Some("m4a".to_string())
        );
        assert_eq!(url_extension_hint("https://example.com/stream"), None);
        assert_eq!(url_extension_hint("https://example.com/clip."), None);
    }
}
