pub mod piper;

/// Text-to-speech synthesis and playback. The concrete adapter lives
/// outside this module; this is the seam it plugs into.
pub trait TtsEngine {
    fn say(&self, text: &str) -> anyhow::Result<()>;
}
