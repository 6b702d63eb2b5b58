// Concrete `SttEngine` adapter wrapping `whisper-rs`, generalized from the
// teacher's Windows-gated dependency to every target OS. Call contract
// (f32 PCM in, text out, language hint) follows the Python `WhisperStt`
// reference.

use anyhow::Result;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::stt::SttEngine;

pub struct WhisperLocalStt {
    ctx: WhisperContext,
    language: String,
    use_gpu: bool,
}

impl WhisperLocalStt {
    pub fn new(model_ref: &str, language: &str, device: &str) -> Result<Self> {
        let mut params = WhisperContextParameters::default();
        let use_gpu = device != "cpu";
        params.use_gpu(use_gpu);
        let ctx = WhisperContext::new_with_params(model_ref, params)
            .map_err(|e| anyhow::anyhow!("failed to load whisper model {model_ref}: {:?}", e))?;
        Ok(Self {
            ctx,
            language: language.to_string(),
            use_gpu,
        })
    }
}

impl SttEngine for WhisperLocalStt {
    fn transcribe(&self, pcm: &[f32], _sample_rate: u32) -> Result<String> {
        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| anyhow::anyhow!("failed to create whisper state: {:?}", e))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(4);
        if !self.language.is_empty() {
            params.set_language(Some(&self.language));
        }
        params.set_no_context(true);

        state
            .full(params, pcm)
            .map_err(|e| anyhow::anyhow!("transcription failed: {:?}", e))?;

        let mut text = String::new();
        let n_segments = state.full_n_segments();
        for i in 0..n_segments {
            if let Some(segment) = state.get_segment(i) {
                if let Ok(segment_text) = segment.to_str_lossy() {
                    text.push_str(&segment_text);
                }
            }
        }

        tracing::debug!(use_gpu = self.use_gpu, "whisper.done");
        Ok(text.trim().to_string())
    }
}
