// Pre-roll-buffered speech segmentation: accumulates audio while silent,
// opens an utterance once a speech-probability model crosses threshold, and
// closes it once enough trailing silence has accumulated (or a hard max
// length is hit). Reused almost directly from the capture-pipeline's
// pre-speech-buffer / silence-timeout state machine, re-targeted from
// "segment-to-file" to "segment-to-controller utterance".

use std::collections::VecDeque;

use crate::config::VadConfig;

/// Speech-probability estimator. The concrete adapter lives outside this
/// module; this is the seam the controller plugs an implementation into.
pub trait Vad {
    fn probability(&mut self, block: &[i16]) -> f32;
}

#[derive(Debug)]
pub enum VadEvent {
    /// Still accumulating pre-roll; no speech detected yet.
    Idle,
    /// Speech just started this block.
    Started,
    /// Speech is ongoing (may include trailing silence not yet at threshold).
    Continuing,
    /// Utterance ended but was shorter than `min_utterance_ms`; discarded.
    Discarded,
    /// Utterance ended and is long enough to hand off. Samples are float32
    /// mono, normalized to `[-1.0, 1.0]`.
    Emitted(Vec<f32>),
}

pub struct VadSegmenter {
    pre_roll: VecDeque<Vec<i16>>,
    pre_roll_chunks: usize,
    utterance: Vec<Vec<i16>>,
    speech_started: bool,
    silence_chunks: usize,
    end_silence_chunks: usize,
    max_utt_chunks: usize,
    min_utt_chunks: usize,
    threshold: f32,
}

fn chunks_for(ms: u64, rate: u32, block: usize) -> usize {
    ((ms as f64 / 1000.0) * rate as f64 / block as f64) as usize
}

impl VadSegmenter {
    pub fn new(cfg: &VadConfig, process_rate: u32, process_block: usize) -> Self {
        Self {
            pre_roll: VecDeque::new(),
            pre_roll_chunks: chunks_for(cfg.pre_roll_ms, process_rate, process_block),
            utterance: Vec::new(),
            speech_started: false,
            silence_chunks: 0,
            end_silence_chunks: chunks_for(cfg.end_silence_ms, process_rate, process_block).max(1),
            max_utt_chunks: chunks_for(cfg.max_utterance_ms, process_rate, process_block).max(1),
            min_utt_chunks: chunks_for(cfg.min_utterance_ms, process_rate, process_block).max(1),
            threshold: cfg.threshold,
        }
    }

    pub fn reset(&mut self) {
        self.pre_roll.clear();
        self.utterance.clear();
        self.speech_started = false;
        self.silence_chunks = 0;
    }

    pub fn speech_started(&self) -> bool {
        self.speech_started
    }

    pub fn process(&mut self, block: &[i16], vad: &mut dyn Vad) -> VadEvent {
        let probability = vad.probability(block);
        let is_speech = probability >= self.threshold;

        if !self.speech_started {
            self.pre_roll.push_back(block.to_vec());
            while self.pre_roll.len() > self.pre_roll_chunks {
                self.pre_roll.pop_front();
            }
            if !is_speech {
                return VadEvent::Idle;
            }
            self.speech_started = true;
            self.utterance = self.pre_roll.drain(..).collect();
            self.utterance.push(block.to_vec());
            self.silence_chunks = 0;
            return VadEvent::Started;
        }

        self.utterance.push(block.to_vec());
        if is_speech {
            self.silence_chunks = 0;
        } else {
            self.silence_chunks += 1;
        }

        if self.utterance.len() >= self.max_utt_chunks {
            self.silence_chunks = self.end_silence_chunks;
        }

        if self.silence_chunks < self.end_silence_chunks {
            return VadEvent::Continuing;
        }

        if self.utterance.len() < self.min_utt_chunks {
            self.reset();
            return VadEvent::Discarded;
        }

        let pcm: Vec<f32> = self
            .utterance
            .iter()
            .flatten()
            .map(|&s| s as f32 / 32768.0)
            .collect();
        self.reset();
        VadEvent::Emitted(pcm)
    }
}
