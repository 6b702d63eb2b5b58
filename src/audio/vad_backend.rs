// Concrete `Vad` adapter wrapping `voice_activity_detector`, generalized
// from the teacher's Windows-only gating to every target OS.

use anyhow::Result;
use voice_activity_detector::VoiceActivityDetector;

use crate::audio::vad_segmenter::Vad;

pub struct VoiceActivityDetectorVad {
    detector: VoiceActivityDetector,
}

impl VoiceActivityDetectorVad {
    pub fn new(sample_rate: u32) -> Result<Self> {
        let chunk_size = match sample_rate {
            8000 => 256usize,
            16000 => 512usize,
            _ => anyhow::bail!("VAD only supports 8000 or 16000 Hz sample rate"),
        };
        let detector = VoiceActivityDetector::builder()
            .sample_rate(sample_rate)
            .chunk_size(chunk_size)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build VAD: {:?}", e))?;
        Ok(Self { detector })
    }
}

impl Vad for VoiceActivityDetectorVad {
    fn probability(&mut self, block: &[i16]) -> f32 {
        self.detector.predict(block.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vad_initializes_at_supported_rate() {
        assert!(VoiceActivityDetectorVad::new(16000).is_ok());
    }

    #[test]
    fn test_vad_rejects_unsupported_rate() {
        assert!(VoiceActivityDetectorVad::new(44100).is_err());
    }

    #[test]
    fn test_silence_has_low_probability() {
        let mut vad = VoiceActivityDetectorVad::new(16000).unwrap();
        let silence = vec![0i16; 512];
        assert!(vad.probability(&silence) < 0.5);
    }
}
