// In-process confirmation tone: a short sine wave, no external binary
// needed to synthesize it. Best-effort -- failures are logged, never fatal.

use std::f32::consts::PI;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::config::BeepConfig;
use crate::error::BeepFailure;

fn synthesize(cfg: &BeepConfig, sample_rate: u32) -> Vec<i16> {
    let duration_s = (cfg.duration_ms as f32 / 1000.0).max(0.01);
    let n = (sample_rate as f32 * duration_s) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let sample = (2.0 * PI * cfg.frequency_hz as f32 * t).sin() * cfg.volume;
            (sample * i16::MAX as f32) as i16
        })
        .collect()
}

pub fn play_beep(
    cfg: &BeepConfig,
    sample_rate: u32,
    output_backend: &str,
    output_device: Option<&str>,
) -> Result<(), BeepFailure> {
    if !cfg.enabled {
        return Ok(());
    }

    let tone = synthesize(cfg, sample_rate);
    let dir = tempfile::tempdir().map_err(|e| BeepFailure(e.to_string()))?;
    let path = dir.path().join("beep.wav");

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).map_err(|e| BeepFailure(e.to_string()))?;
    for sample in &tone {
        writer.write_sample(*sample).map_err(|e| BeepFailure(e.to_string()))?;
    }
    writer.finalize().map_err(|e| BeepFailure(e.to_string()))?;

    crate::audio::playback::play_wav_file(&path, output_backend, output_device)
        .map_err(|e| BeepFailure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_produces_requested_duration() {
        let cfg = BeepConfig {
            enabled: true,
            frequency_hz: 880,
            duration_ms: 100,
            volume: 0.2,
        };
        let tone = synthesize(&cfg, 16000);
        assert_eq!(tone.len(), 1600);
    }

    #[test]
    fn test_synthesize_respects_volume_cap() {
        let cfg = BeepConfig {
            enabled: true,
            frequency_hz: 440,
            duration_ms: 50,
            volume: 0.2,
        };
        let tone = synthesize(&cfg, 16000);
        let max = (i16::MAX as f32 * 0.2) as i16;
        assert!(tone.iter().all(|&s| s.abs() <= max + 1));
    }

    #[test]
    fn test_disabled_beep_is_noop() {
        let cfg = BeepConfig {
            enabled: false,
            ..BeepConfig {
                enabled: false,
                frequency_hz: 880,
                duration_ms: 120,
                volume: 0.2,
            }
        };
        assert!(play_beep(&cfg, 16000, "direct", None).is_ok());
    }
}
