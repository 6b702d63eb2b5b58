// Shared WAV playback used by both the confirmation beep and TTS reply
// audio: either through the default output device (`rodio`) or by shelling
// out to `ffplay` against a PulseAudio sink, mirroring the direct/subprocess
// split used for capture.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait};

pub fn play_wav_file(path: &Path, backend: &str, output_device: Option<&str>) -> Result<()> {
    if backend.eq_ignore_ascii_case("subprocess") {
        play_with_ffplay(path)
    } else {
        play_with_rodio(path, output_device)
    }
}

/// Resolves a configured output device selector (numeric index or
/// case-insensitive substring of the device name) against `cpal`'s output
/// device list, mirroring the original `_resolve_output_device` selector.
/// `None` is returned for an absent/blank selector or no match, meaning
/// "use the system default".
fn resolve_output_device(selector: Option<&str>) -> Option<cpal::Device> {
    let key = selector?.trim();
    if key.is_empty() {
        return None;
    }
    let host = cpal::default_host();
    if let Ok(index) = key.parse::<usize>() {
        return host.output_devices().ok()?.nth(index);
    }
    let key = key.to_lowercase();
    host.output_devices()
        .ok()?
        .find(|d| d.name().map(|n| n.to_lowercase().contains(&key)).unwrap_or(false))
}

fn play_with_rodio(path: &Path, output_device: Option<&str>) -> Result<()> {
    let (_stream, handle) = match resolve_output_device(output_device) {
        Some(device) => rodio::OutputStream::try_from_device(&device)
            .context("failed to open selected audio output device")?,
        None => rodio::OutputStream::try_default().context("no default audio output device")?,
    };
    let sink = rodio::Sink::try_new(&handle).context("failed to create playback sink")?;
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let source =
        rodio::Decoder::new(std::io::BufReader::new(file)).context("failed to decode wav")?;
    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}

fn play_with_ffplay(path: &Path) -> Result<()> {
    let output = Command::new("ffplay")
        .args(["-nodisp", "-autoexit", "-loglevel", "error"])
        .arg(path)
        .output()
        .context("failed to spawn ffplay")?;
    if !output.status.success() {
        let err = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffplay failed: {}", err.chars().take(300).collect::<String>());
    }
    Ok(())
}
