use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use voxkeep::agent::client::AgentClient;
use voxkeep::agent::devices::DeviceCatalog;
use voxkeep::audio::source::{resolve_backend, AudioSource, CpalSource, SubprocessSource};
use voxkeep::audio::vad_backend::VoiceActivityDetectorVad;
use voxkeep::audio::wake_backend::VoskRecognizer;
use voxkeep::cli::Cli;
use voxkeep::commands::list_audio_devices;
use voxkeep::config::Config;
use voxkeep::session::controller::{Collaborators, PROCESS_SAMPLE_RATE};
use voxkeep::session::SessionController;
use voxkeep::stt::whisper_local::WhisperLocalStt;
use voxkeep::tts::piper::PiperTts;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.list_devices {
        return list_audio_devices();
    }

    let config_path = cli
        .config
        .ok_or_else(|| anyhow::anyhow!("--config is required unless --list-devices is used"))?;
    let config = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("voxkeep={}", config.runtime.log_level).parse()?),
        )
        .init();

    let input_backend = resolve_backend(&config.audio.input_backend);
    let output_backend = resolve_backend(&config.audio.output_backend);

    let audio: Box<dyn AudioSource> = if input_backend == "subprocess" {
        Box::new(SubprocessSource::new(
            config.audio.pulse_source.clone(),
            config.audio.sample_rate,
            config.audio.block_size,
        ))
    } else {
        Box::new(CpalSource::new(
            config.audio.input_device.clone(),
            config.audio.sample_rate,
            config.audio.block_size,
        ))
    };

    let wake_recognizer = Box::new(VoskRecognizer::new(
        &config.wake.recognizer.model_path,
        &config.wake.phrases,
        PROCESS_SAMPLE_RATE,
    )?);

    let vad = Box::new(VoiceActivityDetectorVad::new(PROCESS_SAMPLE_RATE)?);

    let stt = Box::new(WhisperLocalStt::new(
        &config.stt.model_ref,
        &config.stt.language,
        &config.stt.device,
    )?);

    let tts = Box::new(PiperTts::new(
        config.tts.bin.clone(),
        config.tts.model_path.clone(),
        config.tts.config_path.clone(),
        config.tts.speaker,
        output_backend.clone(),
        config.audio.output_device.clone(),
    ));

    let agent = AgentClient::new(config.agent.base_url.clone(), config.agent.timeout_s)?;
    let devices = DeviceCatalog::new(
        config.api_gateway.base_url.clone(),
        non_empty(&config.api_gateway.api_key),
        config.agent.timeout_s,
    )?;

    let collaborators = Collaborators {
        audio,
        wake_recognizer,
        vad,
        stt,
        tts,
        agent,
        devices,
        output_backend,
    };

    let mut controller = SessionController::new(&config, config.audio.block_size, collaborators);

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_ctrlc = shutdown.clone();
    ctrlc::set_handler(move || {
        tracing::info!("shutdown signal received");
        shutdown_ctrlc.store(true, Ordering::Relaxed);
    })?;

    tracing::info!(wake_phrases = ?config.wake.phrases, "voxkeep.starting");
    controller.run(&shutdown)
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
