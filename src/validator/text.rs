//! Lexical checks: normalization, unicode screening, size bounds, and
//! embedded-binary detection.

use crate::config::ValidatorConfig;
use crate::verdict::{RejectReason, Rejection};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Non-ASCII symbols tolerated outside the letter/number categories.
/// Typographic characters that show up in ordinary docstrings and comments.
const ALLOWED_SYMBOLS: &[char] = &[
    '°', '±', '×', '÷', 'µ', '—', '–', '‘', '’', '“', '”', '…', '€', '£', '¥', '§', '©', '®',
    '™', '•', '→', '←', '≤', '≥', '≠', '≈', '√',
];

/// Structural tokens a plausible source snippet should contain at least one of
const STRUCTURAL_TOKENS: &[&str] = &[
    "def ", "class ", "import ", "from ", "=", "print(", "if ", "for ", "while ",
];

/// Binary magic numbers checked at offset 0 of the encoded candidate
const BINARY_MAGICS: &[(&[u8], &str)] = &[
    (b"\x7fELF", "ELF executable"),
    (b"MZ", "Windows PE executable"),
    (b"\xca\xfe\xba\xbe", "Java class / Mach-O fat binary"),
    (b"\xfe\xed\xfa\xce", "Mach-O 32-bit"),
    (b"\xfe\xed\xfa\xcf", "Mach-O 64-bit"),
    (b"\xce\xfa\xed\xfe", "Mach-O 32-bit (little endian)"),
    (b"\xcf\xfa\xed\xfe", "Mach-O 64-bit (little endian)"),
];

/// Canonical compatibility decomposition (NFKD) of the candidate.
///
/// A replacement character in the input means the text was already lossily
/// decoded upstream, so the original bytes cannot be trusted.
pub fn normalize(raw: &str) -> Result<String, Rejection> {
    if raw.contains('\u{FFFD}') {
        return Err(Rejection::new(
            RejectReason::EncodingError,
            "input contains replacement characters from a failed decode",
        ));
    }

    Ok(raw.nfkd().collect())
}

/// Reject characters above the ASCII range that are neither letters, numbers,
/// whitespace, nor allow-listed symbols. Homoglyph and zero-width tricks land
/// here.
///
/// This runs on NFKD output, where accented letters arrive decomposed into a
/// base letter plus combining marks. Marks are fine as long as they ride a
/// letter or digit; a mark with nothing to attach to is rejected.
pub fn check_suspicious_unicode(text: &str) -> Result<(), Rejection> {
    // true while the previous character can carry a combining mark
    let mut anchored = false;
    for (idx, ch) in text.char_indices() {
        if ch.is_ascii() {
            anchored = ch.is_ascii_alphanumeric();
            continue;
        }
        if is_combining_mark(ch) {
            if anchored {
                continue;
            }
            return Err(Rejection::new(
                RejectReason::SuspiciousUnicode,
                format!("combining mark U+{:04X} without a base character at byte {}", ch as u32, idx),
            ));
        }
        if ch.is_alphabetic() || ch.is_numeric() {
            anchored = true;
            continue;
        }
        anchored = false;
        if ch.is_whitespace() || ALLOWED_SYMBOLS.contains(&ch) {
            continue;
        }
        return Err(Rejection::new(
            RejectReason::SuspiciousUnicode,
            format!("disallowed character U+{:04X} at byte {}", ch as u32, idx),
        ));
    }
    Ok(())
}

/// Empty-input and total-size bounds
pub fn check_size_bounds(text: &str, config: &ValidatorConfig) -> Result<(), Rejection> {
    if text.trim().is_empty() {
        return Err(Rejection::new(
            RejectReason::EmptyOrInvalid,
            "candidate is empty after normalization",
        ));
    }

    let char_count = text.chars().count();
    if char_count > config.max_code_size {
        return Err(Rejection::new(
            RejectReason::SizeLimitExceeded,
            format!(
                "candidate has {} characters (limit {})",
                char_count, config.max_code_size
            ),
        ));
    }

    Ok(())
}

/// Per-line length bound
pub fn check_line_lengths(text: &str, config: &ValidatorConfig) -> Result<(), Rejection> {
    for (line_no, line) in text.lines().enumerate() {
        let len = line.chars().count();
        if len > config.max_line_length {
            return Err(Rejection::new(
                RejectReason::LineTooLong,
                format!(
                    "line {} has {} characters (limit {})",
                    line_no + 1,
                    len,
                    config.max_line_length
                ),
            ));
        }
    }
    Ok(())
}

/// The candidate must contain at least one structural token to be worth
/// parsing at all
pub fn check_language_plausibility(text: &str) -> Result<(), Rejection> {
    if STRUCTURAL_TOKENS.iter().any(|tok| text.contains(tok)) {
        Ok(())
    } else {
        Err(Rejection::new(
            RejectReason::NotRecognizedLanguage,
            "no structural keyword found",
        ))
    }
}

/// Scan the encoded candidate for binary magic numbers and NUL bytes
pub fn check_binary_signatures(text: &str) -> Result<(), Rejection> {
    let bytes = text.as_bytes();

    for (magic, name) in BINARY_MAGICS {
        if bytes.starts_with(magic) {
            return Err(Rejection::new(
                RejectReason::SuspiciousByteSequence,
                format!("{} signature at offset 0", name),
            ));
        }
    }

    if let Some(pos) = bytes.iter().position(|&b| b == 0) {
        return Err(Rejection::new(
            RejectReason::SuspiciousByteSequence,
            format!("NUL byte at offset {}", pos),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_ascii() {
        let out = normalize("def add(a, b):\n    return a + b\n").unwrap();
        assert_eq!(out, "def add(a, b):\n    return a + b\n");
    }

    #[test]
    fn test_normalize_decomposes_compatibility_forms() {
        // Fullwidth letters decompose to ASCII under NFKD
        let out = normalize("ｄｅｆ").unwrap();
        assert_eq!(out, "def");
    }

    #[test]
    fn test_replacement_char_is_encoding_error() {
        let err = normalize("def f():\u{FFFD}").unwrap_err();
        assert_eq!(err.reason, RejectReason::EncodingError);
    }

    #[test]
    fn test_accented_identifiers_survive_normalization() {
        // NFKD splits the accented letter into base + combining mark
        let normalized = normalize("número = 1").unwrap();
        assert!(normalized.contains('\u{0301}'));
        assert!(check_suspicious_unicode(&normalized).is_ok());
    }

    #[test]
    fn test_bare_combining_mark_is_suspicious() {
        let err = check_suspicious_unicode("x = \u{0301}1").unwrap_err();
        assert_eq!(err.reason, RejectReason::SuspiciousUnicode);
    }

    #[test]
    fn test_zero_width_char_is_suspicious() {
        let err = check_suspicious_unicode("def f\u{200B}oo(): pass").unwrap_err();
        assert_eq!(err.reason, RejectReason::SuspiciousUnicode);
    }

    #[test]
    fn test_empty_after_trim() {
        let config = ValidatorConfig::default();
        let err = check_size_bounds("   \n\t", &config).unwrap_err();
        assert_eq!(err.reason, RejectReason::EmptyOrInvalid);
    }

    #[test]
    fn test_size_limit() {
        let config = ValidatorConfig {
            max_code_size: 10,
            ..Default::default()
        };
        let err = check_size_bounds("x = 1 + 2 + 3", &config).unwrap_err();
        assert_eq!(err.reason, RejectReason::SizeLimitExceeded);
    }

    #[test]
    fn test_line_length() {
        let config = ValidatorConfig {
            max_line_length: 20,
            ..Default::default()
        };
        assert!(check_line_lengths("x = 1\ny = 2\n", &config).is_ok());
        let long = format!("x = \"{}\"\n", "a".repeat(40));
        let err = check_line_lengths(&long, &config).unwrap_err();
        assert_eq!(err.reason, RejectReason::LineTooLong);
        assert!(err.message.contains("line 1"));
    }

    #[test]
    fn test_plausibility_gate() {
        assert!(check_language_plausibility("def f(): pass").is_ok());
        assert!(check_language_plausibility("x = 1").is_ok());
        let err = check_language_plausibility("hello there, nothing code-like").unwrap_err();
        assert_eq!(err.reason, RejectReason::NotRecognizedLanguage);
    }

    #[test]
    fn test_nul_byte_rejected() {
        let err = check_binary_signatures("x = 1\0").unwrap_err();
        assert_eq!(err.reason, RejectReason::SuspiciousByteSequence);
    }

    #[test]
    fn test_pe_magic_only_at_offset_zero() {
        let err = check_binary_signatures("MZ header bytes").unwrap_err();
        assert_eq!(err.reason, RejectReason::SuspiciousByteSequence);
        // "MZ" inside a string literal is harmless
        assert!(check_binary_signatures("name = 'MZ'").is_ok());
    }
}
