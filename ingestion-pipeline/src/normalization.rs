//! Deterministic content normalization (§4.4): strip HTML/control
//! characters, collapse whitespace, normalize to Unicode NFC, detect
//! language, hash. Case is preserved deliberately — normalization feeds
//! the content hash, and the spec is explicit that hashing is
//! case-sensitive.

use common::ports::hash::Hash;
use unicode_normalization::UnicodeNormalization;

fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if in_tag => {}
            _ => out.push(ch),
        }
    }
    out
}

fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == ' ')
        .collect()
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Very small heuristic: counts characters belonging to a handful of
/// scripts and falls back to English. A real implementation would call
/// out to a model; this is deterministic and dependency-free, adequate
/// for the ASCII-heavy content this pipeline mostly sees.
pub fn detect_language(normalized: &str) -> String {
    let has_cjk = normalized
        .chars()
        .any(|c| ('\u{4E00}'..='\u{9FFF}').contains(&c));
    if has_cjk {
        return "zh".to_string();
    }
    let has_cyrillic = normalized
        .chars()
        .any(|c| ('\u{0400}'..='\u{04FF}').contains(&c));
    if has_cyrillic {
        return "ru".to_string();
    }
    "en".to_string()
}

/// Runs the full normalization pipeline over raw collected content.
pub fn normalize(raw_content: &str) -> String {
    let stripped = strip_html(raw_content);
    let stripped = strip_control_chars(&stripped);
    let collapsed = collapse_whitespace(&stripped);
    collapsed.nfc().collect::<String>()
}

/// `contentHash = SHA-256(normalizedContent, UTF-8)` as 64 lowercase hex
/// characters (§4.4).
pub fn content_hash(hasher: &dyn Hash, normalized_content: &str) -> String {
    hasher.sha256(normalized_content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ports::hash::Sha256Hasher;

    #[test]
    fn strips_html_tags() {
        let out = normalize("<p>Bitcoin <b>hits</b> $50,000</p>");
        assert_eq!(out, "Bitcoin hits $50,000");
    }

    #[test]
    fn collapses_repeated_whitespace() {
        let out = normalize("line one\n\n\tline   two");
        assert_eq!(out, "line one line two");
    }

    #[test]
    fn preserves_case() {
        let out = normalize("Bitcoin HITS $50,000");
        assert_eq!(out, "Bitcoin HITS $50,000");
    }

    #[test]
    fn hash_is_deterministic_and_64_hex_chars() {
        let hasher = Sha256Hasher;
        let normalized = normalize("Bitcoin hits $50,000");
        let hash_a = content_hash(&hasher, &normalized);
        let hash_b = content_hash(&hasher, &normalized);
        assert_eq!(hash_a, hash_b);
        assert_eq!(hash_a.len(), 64);
        assert!(hash_a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn detects_cjk_content() {
        assert_eq!(detect_language("比特币突破五万美元"), "zh");
    }

    #[test]
    fn defaults_to_english() {
        assert_eq!(detect_language("Bitcoin hits $50,000"), "en");
    }
}
