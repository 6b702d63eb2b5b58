// Text cleanup and short-phrase matching for recognized speech. Mirrors the
// exact regex patterns from the Python reference so "confirm/cancel/exit"
// control phrases are recognized the same way.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

const PUNCT_CLASS: &str = r"[\s\u{3000}.,!?，。！？、；;：:]+";

fn space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn trim_punct_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("^{p}|{p}$", p = PUNCT_CLASS)).unwrap()
    })
}

fn punct_any_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PUNCT_CLASS).unwrap())
}

/// Strips leading/trailing punctuation and collapses internal whitespace,
/// but keeps internal spaces for non-Chinese text intact.
pub fn clean_user_text(text: &str) -> String {
    let t = text.trim();
    let t = trim_punct_re().replace_all(t, "");
    let t = space_re().replace_all(&t, " ");
    t.trim().to_string()
}

/// Strips all punctuation and whitespace for comparing short control
/// utterances like "确认"/"取消" against a known phrase set.
pub fn normalize_for_match(text: &str) -> String {
    let t = text.trim();
    let t = punct_any_re().replace_all(t, "");
    let t = space_re().replace_all(&t, "");
    t.to_lowercase()
}

/// True if `text_normalized` equals one of `phrases_normalized`, or contains
/// one of them with at most `max_extra_chars` characters of slack.
pub fn match_short_phrase(
    text_normalized: &str,
    phrases_normalized: &HashSet<String>,
    max_extra_chars: usize,
) -> bool {
    if text_normalized.is_empty() {
        return false;
    }
    if phrases_normalized.contains(text_normalized) {
        return true;
    }
    phrases_normalized.iter().any(|p| {
        !p.is_empty()
            && text_normalized.contains(p.as_str())
            && text_normalized.chars().count() <= p.chars().count() + max_extra_chars
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_user_text_trims_leading_trailing_punct() {
        assert_eq!(clean_user_text("，你好世界。"), "你好世界");
    }

    #[test]
    fn test_clean_user_text_collapses_internal_whitespace() {
        assert_eq!(clean_user_text("turn   on   the light"), "turn on the light");
    }

    #[test]
    fn test_normalize_for_match_strips_all_punct_and_spaces() {
        assert_eq!(normalize_for_match("好 的！"), "好的");
    }

    #[test]
    fn test_normalize_for_match_lowercases() {
        assert_eq!(normalize_for_match("OK"), "ok");
    }

    #[test]
    fn test_match_short_phrase_exact() {
        let set: HashSet<String> = ["确认".to_string()].into_iter().collect();
        assert!(match_short_phrase("确认", &set, 4));
    }

    #[test]
    fn test_match_short_phrase_with_slack() {
        let set: HashSet<String> = ["再见".to_string()].into_iter().collect();
        assert!(match_short_phrase("好的再见啦", &set, 4));
    }

    #[test]
    fn test_match_short_phrase_too_much_extra_fails() {
        let set: HashSet<String> = ["再见".to_string()].into_iter().collect();
        assert!(!match_short_phrase("再见再见再见再见再见再见再见", &set, 4));
    }

    #[test]
    fn test_match_short_phrase_empty_text_fails() {
        let set: HashSet<String> = ["再见".to_string()].into_iter().collect();
        assert!(!match_short_phrase("", &set, 4));
    }
}
