pub mod whisper_local;

/// Batch speech-to-text over an already-segmented utterance. The concrete
/// adapter lives outside this module; this is the seam it plugs into.
pub trait SttEngine {
    fn transcribe(&self, pcm: &[f32], sample_rate: u32) -> anyhow::Result<String>;
}
