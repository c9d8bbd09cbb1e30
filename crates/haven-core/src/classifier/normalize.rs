//! Obfuscation-tolerant text normalization.
//!
//! Matching runs over a canonical form of the text so that decomposed Unicode,
//! diacritics, leetspeak substitutions, and character elongation cannot slip a
//! pattern past the blocklist. Rule patterns are passed through the same
//! function at load time, so both sides of every comparison share one alphabet.
//!
//! The function is idempotent: `normalize(normalize(x)) == normalize(x)`.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Common single-character substitutions used to disguise words.
///
/// Restricted to digit/symbol-for-letter swaps; sentence punctuation such as
/// `!` is stripped rather than folded.
fn fold_leet(c: char) -> char {
    match c {
        '0' => 'o',
        '1' => 'i',
        '3' => 'e',
        '4' | '@' => 'a',
        '5' | '$' => 's',
        '7' => 't',
        '8' => 'b',
        _ => c,
    }
}

/// Normalizes text for matching.
///
/// Pipeline: lowercase, NFKC compatibility fold, diacritic stripping,
/// leetspeak substitution, punctuation to whitespace, collapse of 3+
/// repeated characters, whitespace collapse.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();

    // NFKC folds width and compatibility forms, NFD then exposes combining
    // marks so diacritics can be stripped.
    let folded: String = lowered
        .nfkc()
        .collect::<String>()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    let mapped: Vec<char> = folded
        .chars()
        .map(fold_leet)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut out = String::with_capacity(mapped.len());
    let mut i = 0;
    let mut pending_space = false;
    while i < mapped.len() {
        let c = mapped[i];
        let mut run = 1;
        while i + run < mapped.len() && mapped[i + run] == c {
            run += 1;
        }
        if c == ' ' {
            if !out.is_empty() {
                pending_space = true;
            }
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            // Elongation collapse: runs of three or more become one character,
            // doubled letters ("book", "grass") are left alone.
            let keep = if run >= 3 { 1 } else { run };
            for _ in 0..keep {
                out.push(c);
            }
        }
        i += run;
    }
    out
}

/// Reduces a normalized token to a crude word stem.
///
/// Strips one common English inflection suffix, mirroring the suffix
/// tolerance the curated term lists rely on ("gun" matches "guns",
/// "blocked" matches "block"). Only strips when a stem of at least three
/// characters remains.
pub fn stem(token: &str) -> String {
    const SUFFIXES: [&str; 5] = ["ing", "ies", "ed", "es", "s"];
    for suffix in SUFFIXES {
        if let Some(base) = token.strip_suffix(suffix) {
            if base.len() >= 3 {
                return base.to_string();
            }
        }
    }
    token.to_string()
}

/// Splits normalized text into tokens.
pub fn tokenize(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Basic normalization ===

    #[test]
    fn lowercases_and_strips_punctuation() {
        assert_eq!(normalize("Hello, World!"), "hello world");
        assert_eq!(normalize("free-download.example"), "free download example");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize("  a   b  "), "a b");
    }

    #[test]
    fn strips_diacritics() {
        assert_eq!(normalize("café"), "cafe");
        assert_eq!(normalize("naïve"), "naive");
    }

    #[test]
    fn folds_decomposed_unicode() {
        // "é" written as 'e' + combining acute accent.
        let decomposed = "cafe\u{0301}";
        assert_eq!(normalize(decomposed), "cafe");
    }

    // === Obfuscation ===

    #[test]
    fn folds_leetspeak_digits() {
        assert_eq!(normalize("pr0xy"), "proxy");
        assert_eq!(normalize("s3lf h4rm"), "self harm");
        assert_eq!(normalize("c4$h"), "cash");
    }

    #[test]
    fn collapses_elongated_characters() {
        assert_eq!(normalize("heeeelp"), "help");
        assert_eq!(normalize("loooool"), "lol");
    }

    #[test]
    fn preserves_double_letters() {
        assert_eq!(normalize("book"), "book");
        assert_eq!(normalize("grass"), "grass");
    }

    // === Idempotence ===

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "Hello, World!",
            "pr0xy s1te",
            "  spaced   out  ",
            "café résumé",
            "heeeelp meeee",
            "unbl0cked-games!!!",
            "普通话 text",
            "",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    // === Stemming ===

    #[test]
    fn stems_common_suffixes() {
        assert_eq!(stem("guns"), "gun");
        assert_eq!(stem("cutting"), "cutt");
        assert_eq!(stem("blocked"), "block");
        assert_eq!(stem("matches"), "match");
    }

    #[test]
    fn keeps_short_tokens_intact() {
        assert_eq!(stem("as"), "as");
        assert_eq!(stem("is"), "is");
        assert_eq!(stem("ring"), "ring");
    }

    #[test]
    fn tokenize_splits_normalized_text() {
        let n = normalize("free download now");
        assert_eq!(tokenize(&n), vec!["free", "download", "now"]);
    }
}
