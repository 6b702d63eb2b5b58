// Core IDLE -> LISTEN -> SPEAK loop. Direct port of the Python `main()`
// reference loop: read a block, resample it to the fixed processing
// geometry, feed it to the wake gate or the VAD segmenter depending on
// state, and drive STT/agent/TTS once an utterance is captured.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::agent::client::AgentClient;
use crate::agent::devices::DeviceCatalog;
use crate::agent::speech;
use crate::audio::beep;
use crate::audio::resampler::Resampler;
use crate::audio::source::AudioSource;
use crate::audio::vad_segmenter::{Vad, VadEvent, VadSegmenter};
use crate::audio::wake_gate::{WakeGate, WakeRecognizer};
use crate::config::Config;
use crate::session::state::{Session, State};
use crate::session::text;
use crate::stt::SttEngine;
use crate::tts::TtsEngine;

pub const PROCESS_SAMPLE_RATE: u32 = 16000;
pub const PROCESS_BLOCK_SIZE: usize = 512;

pub struct SessionController {
    audio: Box<dyn AudioSource>,
    wake_recognizer: Box<dyn WakeRecognizer>,
    wake_gate: WakeGate,
    vad: Box<dyn Vad>,
    segmenter: VadSegmenter,
    stt: Box<dyn SttEngine>,
    tts: Box<dyn TtsEngine>,
    agent: AgentClient,
    devices: DeviceCatalog,
    resampler: Resampler,
    beep_cfg: crate::config::BeepConfig,
    output_backend: String,
    output_device: Option<String>,
    wake_cooldown: Duration,
    wake_timeout_ms: u64,
    session_idle_timeout_ms: u64,
    confirm_set: HashSet<String>,
    cancel_set: HashSet<String>,
    exit_set: HashSet<String>,
}

pub struct Collaborators {
    pub audio: Box<dyn AudioSource>,
    pub wake_recognizer: Box<dyn WakeRecognizer>,
    pub vad: Box<dyn Vad>,
    pub stt: Box<dyn SttEngine>,
    pub tts: Box<dyn TtsEngine>,
    pub agent: AgentClient,
    pub devices: DeviceCatalog,
    pub output_backend: String,
}

impl SessionController {
    pub fn new(config: &Config, capture_block_size: usize, collaborators: Collaborators) -> Self {
        let resampler = Resampler::new(capture_block_size, PROCESS_BLOCK_SIZE);
        let segmenter = VadSegmenter::new(&config.vad, PROCESS_SAMPLE_RATE, PROCESS_BLOCK_SIZE);
        let wake_gate = WakeGate::new(&config.wake.phrases);

        Self {
            audio: collaborators.audio,
            wake_recognizer: collaborators.wake_recognizer,
            wake_gate,
            vad: collaborators.vad,
            segmenter,
            stt: collaborators.stt,
            tts: collaborators.tts,
            agent: collaborators.agent,
            devices: collaborators.devices,
            resampler,
            beep_cfg: config.audio.beep.clone(),
            output_backend: collaborators.output_backend,
            output_device: config.audio.output_device.clone(),
            wake_cooldown: Duration::from_millis(config.wake.cooldown_ms),
            wake_timeout_ms: config.wake.timeout_ms,
            session_idle_timeout_ms: config.runtime.session_idle_timeout_ms,
            confirm_set: normalized_set(&config.agent.confirm_phrases),
            cancel_set: normalized_set(&config.agent.cancel_phrases),
            exit_set: normalized_set(&config.agent.exit_phrases),
        }
    }

    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        self.audio.start().map_err(anyhow::Error::from)?;
        let mut session = Session::new();

        tracing::info!("voice-satellite.ready");

        let result = self.run_loop(shutdown, &mut session);
        self.audio.stop();
        result
    }

    fn run_loop(&mut self, shutdown: &AtomicBool, session: &mut Session) -> Result<()> {
        while !shutdown.load(Ordering::Relaxed) {
            let block = self.audio.read(Duration::from_secs(1));
            let now = Instant::now();

            let Some(block) = block else {
                self.housekeep_idle_session(session, now);
                continue;
            };

            let samples = self.resampler.resample(&block.samples);

            if let Some(ignore_until) = session.ignore_until {
                if now < ignore_until {
                    continue;
                }
            }

            match session.state {
                State::Idle => self.handle_idle_block(session, &samples, now),
                State::Listen => self.handle_listen_block(session, &samples, now)?,
                State::Speak => {}
            }
        }
        Ok(())
    }

    fn housekeep_idle_session(&mut self, session: &mut Session, now: Instant) {
        if session.state != State::Listen {
            return;
        }
        let Some(last_turn_at) = session.last_turn_at else {
            return;
        };
        if now.duration_since(last_turn_at).as_millis() as u64 > self.session_idle_timeout_ms {
            tracing::info!(session_id = ?session.session_id, "session.timeout");
            session.return_to_idle();
            self.wake_recognizer.reset();
        }
    }

    fn handle_idle_block(&mut self, session: &mut Session, block: &[i16], now: Instant) {
        if !self.wake_gate.feed(self.wake_recognizer.as_mut(), block) {
            return;
        }

        session.start_wake(now, self.wake_cooldown);
        self.segmenter.reset();

        if let Err(e) = self.devices.refresh() {
            tracing::warn!(error = %e, "devices.refresh_failed");
        }
        if let Err(e) = beep::play_beep(
            &self.beep_cfg,
            PROCESS_SAMPLE_RATE,
            &self.output_backend,
            self.output_device.as_deref(),
        ) {
            tracing::warn!(error = %e, "beep.failed");
        }
        tracing::info!(session_id = ?session.session_id, "wake.detected");
    }

    fn handle_listen_block(&mut self, session: &mut Session, block: &[i16], now: Instant) -> Result<()> {
        if session.awaiting_first_utterance && !self.segmenter.speech_started() {
            if let Some(wake_started_at) = session.wake_started_at {
                let elapsed_ms = now.duration_since(wake_started_at).as_millis() as u64;
                if elapsed_ms > self.wake_timeout_ms {
                    tracing::info!(session_id = ?session.session_id, "wake.timeout");
                    session.return_to_idle();
                    self.wake_recognizer.reset();
                    self.segmenter.reset();
                    return Ok(());
                }
            }
        }

        match self.segmenter.process(block, self.vad.as_mut()) {
            VadEvent::Idle | VadEvent::Continuing | VadEvent::Discarded => {}
            VadEvent::Started => {
                session.awaiting_first_utterance = false;
                session.last_turn_at = Some(now);
            }
            VadEvent::Emitted(pcm) => {
                self.audio.clear();
                session.state = State::Speak;
                self.handle_utterance(session, pcm)?;
                if session.state == State::Speak {
                    session.state = State::Listen;
                }
            }
        }
        Ok(())
    }

    fn handle_utterance(&mut self, session: &mut Session, pcm: Vec<f32>) -> Result<()> {
        let text_raw = self.stt.transcribe(&pcm, PROCESS_SAMPLE_RATE)?;
        let text_raw = text::clean_user_text(&text_raw);
        tracing::info!(text = %text_raw, "stt.done");

        if text_raw.is_empty() {
            return Ok(());
        }

        let normalized = text::normalize_for_match(&text_raw);
        let confirm_match = self.confirm_set.contains(&normalized);
        let cancel_match = self.cancel_set.contains(&normalized);
        let exit_requested = text::match_short_phrase(&normalized, &self.exit_set, 4);

        if exit_requested {
            tracing::info!(session_id = ?session.session_id, text = %text_raw, "session.exit");
            if let Err(e) = self.tts.say("好的，再见。") {
                tracing::error!(error = %e, "tts.failed");
            }
            session.return_to_idle();
            self.wake_recognizer.reset();
            return Ok(());
        }

        let confirm = confirm_match && !cancel_match;
        let session_id = session.session_id.clone().unwrap_or_default();

        match self.agent.turn(&session_id, &text_raw, confirm) {
            Ok(reply) => {
                let spoken = speech::compose_speech(&reply, &self.devices);
                tracing::info!(kind = %reply.kind, speech = %spoken, "agent.reply");
                if let Err(e) = self.tts.say(&spoken) {
                    tracing::error!(error = %e, "tts.failed");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "agent.turn_failed");
                if let Err(e) = self.tts.say("抱歉，出了点问题，请稍后再试。") {
                    tracing::error!(error = %e, "tts.failed");
                }
            }
        }

        session.last_turn_at = Some(Instant::now());
        Ok(())
    }
}

fn normalized_set(phrases: &[String]) -> HashSet<String> {
    phrases.iter().map(|p| text::normalize_for_match(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::client::AgentTurnResponse;
    use crate::audio::PcmBlock;
    use crate::config::Config;
    use crate::error::AudioError;
    use std::sync::Mutex;

    struct ScriptedAudio {
        blocks: Mutex<Vec<Option<PcmBlock>>>,
    }

    impl AudioSource for ScriptedAudio {
        fn start(&mut self) -> std::result::Result<(), AudioError> {
            Ok(())
        }
        fn stop(&mut self) {}
        fn read(&self, _timeout: Duration) -> Option<PcmBlock> {
            self.blocks.lock().unwrap().pop().flatten()
        }
        fn clear(&self) {}
    }

    struct AlwaysWakeRecognizer;
    impl WakeRecognizer for AlwaysWakeRecognizer {
        fn accept(&mut self, _block: &[i16]) -> String {
            "老管家".to_string()
        }
        fn reset(&mut self) {}
    }

    struct SilentVad;
    impl Vad for SilentVad {
        fn probability(&mut self, _block: &[i16]) -> f32 {
            0.0
        }
    }

    struct NoopStt;
    impl SttEngine for NoopStt {
        fn transcribe(&self, _pcm: &[f32], _sample_rate: u32) -> anyhow::Result<String> {
            Ok(String::new())
        }
    }

    struct NoopTts;
    impl TtsEngine for NoopTts {
        fn say(&self, _text: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_idle_block_matching_wake_phrase_enters_listen() {
        let config = Config::default();
        let collaborators = Collaborators {
            audio: Box::new(ScriptedAudio { blocks: Mutex::new(vec![]) }),
            wake_recognizer: Box::new(AlwaysWakeRecognizer),
            vad: Box::new(SilentVad),
            stt: Box::new(NoopStt),
            tts: Box::new(NoopTts),
            agent: AgentClient::new(config.agent.base_url.clone(), 1).unwrap(),
            devices: DeviceCatalog::new(config.api_gateway.base_url.clone(), None, 1).unwrap(),
            output_backend: "direct".to_string(),
        };
        let mut controller = SessionController::new(&config, 512, collaborators);
        controller.beep_cfg.enabled = false;

        let mut session = Session::new();
        controller.handle_idle_block(&mut session, &[0i16; 512], Instant::now());
        assert_eq!(session.state, State::Listen);
        assert!(session.session_id.is_some());
    }

    #[test]
    fn test_empty_stt_result_keeps_session_in_listen() {
        let config = Config::default();
        let collaborators = Collaborators {
            audio: Box::new(ScriptedAudio { blocks: Mutex::new(vec![]) }),
            wake_recognizer: Box::new(AlwaysWakeRecognizer),
            vad: Box::new(SilentVad),
            stt: Box::new(NoopStt),
            tts: Box::new(NoopTts),
            agent: AgentClient::new(config.agent.base_url.clone(), 1).unwrap(),
            devices: DeviceCatalog::new(config.api_gateway.base_url.clone(), None, 1).unwrap(),
            output_backend: "direct".to_string(),
        };
        let mut controller = SessionController::new(&config, 512, collaborators);
        let mut session = Session::new();
        session.start_wake(Instant::now(), Duration::from_millis(1));
        controller
            .handle_utterance(&mut session, vec![0.0f32; 1600])
            .unwrap();
        assert_eq!(session.state, State::Listen);
    }

    #[test]
    fn test_exit_phrase_returns_to_idle() {
        let config = Config::default();
        let collaborators = Collaborators {
            audio: Box::new(ScriptedAudio { blocks: Mutex::new(vec![]) }),
            wake_recognizer: Box::new(AlwaysWakeRecognizer),
            vad: Box::new(SilentVad),
            stt: Box::new(NoopStt),
            tts: Box::new(NoopTts),
            agent: AgentClient::new(config.agent.base_url.clone(), 1).unwrap(),
            devices: DeviceCatalog::new(config.api_gateway.base_url.clone(), None, 1).unwrap(),
            output_backend: "direct".to_string(),
        };
        let mut controller = SessionController::new(&config, 512, collaborators);
        let mut session = Session::new();
        session.start_wake(Instant::now(), Duration::from_millis(1));

        struct ExitOnceStt;
        impl SttEngine for ExitOnceStt {
            fn transcribe(&self, _pcm: &[f32], _sample_rate: u32) -> anyhow::Result<String> {
                Ok("再见".to_string())
            }
        }
        controller.stt = Box::new(ExitOnceStt);

        controller
            .handle_utterance(&mut session, vec![0.0f32; 1600])
            .unwrap();
        assert_eq!(session.state, State::Idle);
        assert!(session.session_id.is_none());
    }

    #[test]
    fn test_compose_speech_unreachable_response_placeholder() {
        // sanity check that AgentTurnResponse deserializes for clarify replies
        let json = r#"{"type": "clarify", "message": "你想打开哪个设备？"}"#;
        let resp: AgentTurnResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.kind, "clarify");
    }
}
