// Wake phrase detection: feeds audio to a grammar-restricted recognizer and
// tests its hypotheses (final or partial) against a configured phrase list
// using substring matching, since partial hypotheses routinely carry extra
// tokens around the phrase itself.

/// Hypothesis producer. The concrete adapter (grammar-restricted speech
/// recognition) lives outside this module; this is the seam it plugs into.
pub trait WakeRecognizer {
    /// Feed one block of audio and return the recognizer's current
    /// hypothesis text -- the final result if a waveform boundary was just
    /// accepted, otherwise the in-progress partial result.
    fn accept(&mut self, block: &[i16]) -> String;

    /// Rebuild internal recognizer state, clearing any accumulated
    /// hypothesis after a session ends.
    fn reset(&mut self);
}

pub struct WakeGate {
    phrases: Vec<String>,
}

impl WakeGate {
    pub fn new(phrases: &[String]) -> Self {
        let mut seen = std::collections::HashSet::new();
        let phrases = phrases
            .iter()
            .map(|p| normalize(p))
            .filter(|p| !p.is_empty() && seen.insert(p.clone()))
            .collect();
        Self { phrases }
    }

    /// Feeds a block to the recognizer and reports whether any configured
    /// phrase is a substring of its current hypothesis.
    pub fn feed(&self, recognizer: &mut dyn WakeRecognizer, block: &[i16]) -> bool {
        let hypothesis = normalize(&recognizer.accept(block));
        self.matches(&hypothesis)
    }

    fn matches(&self, hypothesis: &str) -> bool {
        if hypothesis.is_empty() {
            return false;
        }
        self.phrases.iter().any(|p| hypothesis.contains(p.as_str()))
    }

    pub fn reset(&self, recognizer: &mut dyn WakeRecognizer) {
        recognizer.reset();
    }
}

/// Strips whitespace and punctuation (ASCII and CJK) and returns the raw
/// remaining characters, used for the match-set comparison.
pub fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && !is_punct(*c))
        .collect()
}

/// Splits on whitespace/punctuation and rejoins with single spaces, turning
/// a phrase like "你好，米奇" into recognizer-grammar tokens "你好 米奇".
pub fn to_grammar_phrase(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || is_punct(c))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_punct(c: char) -> bool {
    matches!(
        c,
        '.' | ',' | '!' | '?' | '，' | '。' | '！' | '？' | '、' | '；' | ';' | '：' | ':' | '\u{3000}'
    ) || c.is_ascii_punctuation()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeRecognizer {
        hypotheses: Vec<String>,
    }

    impl WakeRecognizer for FakeRecognizer {
        fn accept(&mut self, _block: &[i16]) -> String {
            if self.hypotheses.is_empty() {
                String::new()
            } else {
                self.hypotheses.remove(0)
            }
        }
        fn reset(&mut self) {
            self.hypotheses.clear();
        }
    }

    #[test]
    fn test_normalize_strips_punctuation_and_whitespace() {
        assert_eq!(normalize("你好， 米奇！"), "你好米奇");
        assert_eq!(normalize("hello, mickey"), "hellomickey");
    }

    #[test]
    fn test_to_grammar_phrase_joins_tokens() {
        assert_eq!(to_grammar_phrase("你好，米奇"), "你好 米奇");
        assert_eq!(to_grammar_phrase("老管家"), "老管家");
    }

    #[test]
    fn test_gate_matches_substring_in_partial_hypothesis() {
        let gate = WakeGate::new(&["老管家".to_string()]);
        let mut rec = FakeRecognizer {
            hypotheses: vec!["嗯 老管家 在 吗".to_string()],
        };
        assert!(gate.feed(&mut rec, &[0i16; 4]));
    }

    #[test]
    fn test_gate_no_match_returns_false() {
        let gate = WakeGate::new(&["老管家".to_string()]);
        let mut rec = FakeRecognizer {
            hypotheses: vec!["你好世界".to_string()],
        };
        assert!(!gate.feed(&mut rec, &[0i16; 4]));
    }

    #[test]
    fn test_dedups_normalized_phrases() {
        let gate = WakeGate::new(&["老管家".to_string(), "老管家！".to_string()]);
        assert_eq!(gate.phrases.len(), 1);
    }
}
