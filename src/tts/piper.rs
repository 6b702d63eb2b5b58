// Concrete `TtsEngine` adapter: shells out to `piper` to synthesize a
// scratch WAV file, then plays it back through the configured output
// backend. Modeled on the Python `PiperTts` reference.

use std::process::Command;

use anyhow::{Context, Result};

use crate::audio::playback::play_wav_file;
use crate::tts::TtsEngine;

pub struct PiperTts {
    bin: String,
    model_path: String,
    config_path: String,
    speaker: Option<i32>,
    output_backend: String,
    output_device: Option<String>,
}

impl PiperTts {
    pub fn new(
        bin: String,
        model_path: String,
        config_path: String,
        speaker: Option<i32>,
        output_backend: String,
        output_device: Option<String>,
    ) -> Self {
        Self {
            bin,
            model_path,
            config_path,
            speaker,
            output_backend,
            output_device,
        }
    }

    fn synthesize(&self, text: &str, wav_path: &std::path::Path) -> Result<()> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(["--model", &self.model_path])
            .args(["--config", &self.config_path])
            .args(["--output_file", &wav_path.to_string_lossy()]);
        if let Some(speaker) = self.speaker {
            cmd.args(["--speaker", &speaker.to_string()]);
        }

        let mut child = cmd
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .context("failed to spawn piper")?;

        {
            use std::io::Write;
            let mut stdin = child.stdin.take().context("piper stdin not piped")?;
            stdin.write_all(text.as_bytes())?;
            stdin.write_all(b"\n")?;
        }

        let output = child.wait_with_output().context("failed to wait for piper")?;
        if !output.status.success() {
            let err = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "piper failed rc={:?}: {}",
                output.status.code(),
                err.chars().take(300).collect::<String>()
            );
        }
        Ok(())
    }
}

impl TtsEngine for PiperTts {
    fn say(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let dir = tempfile::tempdir().context("failed to create scratch dir")?;
        let wav_path = dir.path().join("tts.wav");
        self.synthesize(text, &wav_path)?;
        play_wav_file(&wav_path, &self.output_backend, self.output_device.as_deref())
    }
}
