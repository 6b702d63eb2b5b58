pub mod beep;
pub mod playback;
pub mod resampler;
pub mod source;
pub mod vad_backend;
pub mod vad_segmenter;
pub mod wake_backend;
pub mod wake_gate;

/// A single fixed-length block of mono signed-16-bit PCM samples.
#[derive(Debug, Clone)]
pub struct PcmBlock {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}
