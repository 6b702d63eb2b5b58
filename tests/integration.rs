// End-to-end exercise of the wake -> listen -> utterance -> agent -> speech
// pipeline: a scripted audio source and fake wake/VAD/STT/TTS adapters drive
// a real `SessionController` against a minimal local HTTP stub standing in
// for the device catalog and agent endpoints.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use voxkeep::agent::client::AgentClient;
use voxkeep::agent::devices::DeviceCatalog;
use voxkeep::audio::source::AudioSource;
use voxkeep::audio::vad_segmenter::Vad;
use voxkeep::audio::wake_gate::WakeRecognizer;
use voxkeep::audio::PcmBlock;
use voxkeep::config::Config;
use voxkeep::error::AudioError;
use voxkeep::session::controller::Collaborators;
use voxkeep::session::SessionController;
use voxkeep::stt::SttEngine;
use voxkeep::tts::TtsEngine;

struct ScriptedAudio {
    queue: Mutex<VecDeque<PcmBlock>>,
}

impl AudioSource for ScriptedAudio {
    fn start(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
    fn stop(&mut self) {}
    fn read(&self, _timeout: Duration) -> Option<PcmBlock> {
        self.queue.lock().unwrap().pop_front()
    }
    fn clear(&self) {}
}

fn block(marker: i16) -> PcmBlock {
    PcmBlock {
        samples: vec![marker; 512],
        sample_rate: 16000,
    }
}

struct WakeOnce {
    fired: bool,
}

impl WakeRecognizer for WakeOnce {
    fn accept(&mut self, _block: &[i16]) -> String {
        if self.fired {
            String::new()
        } else {
            self.fired = true;
            "老管家".to_string()
        }
    }
    fn reset(&mut self) {}
}

struct MarkerVad;

impl Vad for MarkerVad {
    fn probability(&mut self, block: &[i16]) -> f32 {
        if block.first().copied().unwrap_or(0) > 0 {
            1.0
        } else {
            0.0
        }
    }
}

struct FixedStt(String);

impl SttEngine for FixedStt {
    fn transcribe(&self, _pcm: &[f32], _sample_rate: u32) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Clone, Default)]
struct CapturingTts {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl TtsEngine for CapturingTts {
    fn say(&self, text: &str) -> anyhow::Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Accepts exactly two requests: the device catalog refresh and the agent
/// turn, replying with canned JSON for each based on the request line.
fn spawn_fake_backend(listener: TcpListener) {
    std::thread::spawn(move || {
        for _ in 0..2 {
            let Ok((stream, _)) = listener.accept() else { return };
            handle_one(stream);
        }
    });
}

fn handle_one(mut stream: TcpStream) {
    let mut buf = [0u8; 8192];
    let n = stream.read(&mut buf).unwrap_or(0);
    let request = String::from_utf8_lossy(&buf[..n]);

    let body = if request.starts_with("GET /devices") {
        r#"{"items": [{"id": "dev-1", "name": "客厅灯", "type": "light"}]}"#
    } else {
        r#"{"type": "executed", "message": "", "actions": [{"deviceId": "dev-1", "action": "turn_on", "params": {}}], "result": {"results": [{"ok": true, "deviceId": "dev-1", "action": "turn_on"}]}}"#
    };

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[test]
fn test_wake_to_utterance_to_spoken_reply_end_to_end() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    spawn_fake_backend(listener);

    let base_url = format!("http://{}", addr);

    let mut config = Config::default();
    config.vad.pre_roll_ms = 0;
    config.vad.end_silence_ms = 10;
    config.vad.min_utterance_ms = 10;
    config.audio.beep.enabled = false;
    config.agent.base_url = base_url.clone();
    config.api_gateway.base_url = base_url;

    let audio = ScriptedAudio {
        queue: Mutex::new(VecDeque::from(vec![
            block(0),   // wake trigger block (content irrelevant)
            block(100), // speech -> utterance starts
            block(0),   // silence -> utterance closes and is emitted
        ])),
    };

    let tts = CapturingTts::default();
    let spoken = tts.spoken.clone();

    let collaborators = Collaborators {
        audio: Box::new(audio),
        wake_recognizer: Box::new(WakeOnce { fired: false }),
        vad: Box::new(MarkerVad),
        stt: Box::new(FixedStt("打开客厅灯".to_string())),
        tts: Box::new(tts),
        agent: AgentClient::new(config.agent.base_url.clone(), 5).unwrap(),
        devices: DeviceCatalog::new(config.api_gateway.base_url.clone(), None, 5).unwrap(),
        output_backend: "direct".to_string(),
    };

    let mut controller = SessionController::new(&config, config.audio.block_size, collaborators);
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_for_watcher = shutdown.clone();
    let spoken_for_watcher = spoken.clone();

    std::thread::spawn(move || {
        for _ in 0..100 {
            std::thread::sleep(Duration::from_millis(50));
            if !spoken_for_watcher.lock().unwrap().is_empty() {
                shutdown_for_watcher.store(true, Ordering::Relaxed);
                return;
            }
        }
        shutdown_for_watcher.store(true, Ordering::Relaxed);
    });

    controller.run(&shutdown).unwrap();

    let spoken = spoken.lock().unwrap();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0], "已提交执行：打开客厅灯");
}
