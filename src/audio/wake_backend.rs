// Concrete `WakeRecognizer` adapter wrapping `vosk`'s grammar-restricted
// recognizer, modeled directly on the Python `VoskWakeWord` reference.

use anyhow::{Context, Result};
use vosk::{CompleteResultSingle, DecodingState, Model, Recognizer};

use crate::audio::wake_gate::to_grammar_phrase;
use crate::audio::wake_gate::WakeRecognizer;

pub struct VoskRecognizer {
    // Leaked once at startup: the model must outlive every `Recognizer` we
    // build from it, including the ones created by `reset`.
    model: &'static Model,
    sample_rate: f32,
    grammar: Vec<String>,
    recognizer: Recognizer,
}

impl VoskRecognizer {
    pub fn new(model_path: &str, phrases: &[String], sample_rate: u32) -> Result<Self> {
        if !std::path::Path::new(model_path).is_dir() {
            anyhow::bail!("vosk model_path not found (dir expected): {model_path}");
        }
        let model = Model::new(model_path)
            .ok_or_else(|| anyhow::anyhow!("failed to load vosk model at {model_path}"))?;
        let model: &'static Model = Box::leak(Box::new(model));

        let mut seen = std::collections::HashSet::new();
        let grammar: Vec<String> = phrases
            .iter()
            .map(|p| to_grammar_phrase(p))
            .filter(|g| !g.is_empty() && seen.insert(g.clone()))
            .collect();

        let recognizer = build_recognizer(model, sample_rate as f32, &grammar)?;

        Ok(Self {
            model,
            sample_rate: sample_rate as f32,
            grammar,
            recognizer,
        })
    }
}

fn build_recognizer(model: &'static Model, sample_rate: f32, grammar: &[String]) -> Result<Recognizer> {
    let grammar_refs: Vec<&str> = grammar.iter().map(String::as_str).collect();
    let mut recognizer = Recognizer::new_with_grammar(model, sample_rate, &grammar_refs)
        .context("failed to build vosk recognizer")?;
    recognizer.set_words(false);
    Ok(recognizer)
}

impl WakeRecognizer for VoskRecognizer {
    fn accept(&mut self, block: &[i16]) -> String {
        match self.recognizer.accept_waveform(block) {
            Ok(DecodingState::Finalized) => {
                let result = self.recognizer.result();
                result
                    .single()
                    .map(|r: CompleteResultSingle| r.text.to_string())
                    .unwrap_or_default()
            }
            _ => self.recognizer.partial_result().partial.to_string(),
        }
    }

    fn reset(&mut self) {
        if let Ok(recognizer) = build_recognizer(self.model, self.sample_rate, &self.grammar) {
            self.recognizer = recognizer;
        }
    }
}
