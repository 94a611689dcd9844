//! Obfuscation heuristics: repeated-substring and whitespace flooding
//! detectors plus a table of known obfuscation signatures.
//!
//! Every scan in this module runs under the pattern sub-deadline and bails out
//! with `PATTERN_TIMEOUT` instead of overrunning it.

use crate::config::ValidatorConfig;
use crate::validator::Deadline;
use crate::verdict::{RejectReason, Rejection};
use regex::Regex;
use std::sync::LazyLock;

/// Signature table version, bumped whenever rules are added or changed
pub const SIGNATURE_SET_VERSION: u32 = 1;

/// Obfuscation signature rules: (name, pattern)
///
/// Patterns must stay free of nested unbounded repetition so each rule scans
/// in linear time.
const SIGNATURE_RULES: &[(&str, &str)] = &[
    ("hex_escape_chain", r"(\\x[0-9a-fA-F]{2}){6,}"),
    ("unicode_escape_chain", r"(\\u[0-9a-fA-F]{4}){4,}"),
    ("char_code_concatenation", r"chr\s*\(\s*\d+\s*\)\s*\+\s*chr"),
    (
        "eval_exec_string_concat",
        r#"(?:eval|exec)\s*\(\s*['"][^'"]*['"]\s*\+"#,
    ),
    ("eval_exec_joined_string", r"(?:eval|exec)\s*\([^)]*\.join\s*\("),
    ("eval_of_compile", r"eval\s*\(\s*compile\s*\("),
    (
        "dynamic_scope_lookup",
        r#"(?:globals|locals)\s*\(\s*\)\s*(?:\[|\.get\s*\()"#,
    ),
    ("dunder_import", r"__import__\s*\("),
    (
        "base64_decode_execution",
        r"(?:eval|exec)\s*\(\s*(?:base64\.)?b64decode",
    ),
    ("getattr_dunder_string", r#"getattr\s*\([^,)]+,\s*['"]__"#),
];

/// A single compiled obfuscation signature
#[derive(Debug, Clone)]
pub struct Signature {
    pub name: &'static str,
    regex: Regex,
}

/// Versioned, swappable table of obfuscation signatures
#[derive(Debug, Clone)]
pub struct SignatureSet {
    rules: Vec<Signature>,
}

impl SignatureSet {
    /// Compile the built-in rule library
    pub fn compile() -> Result<Self, regex::Error> {
        let rules = SIGNATURE_RULES
            .iter()
            .map(|&(name, pattern)| {
                Regex::new(pattern).map(|regex| Signature { name, regex })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every signature against the candidate, checking the deadline
    /// before each rule
    pub fn scan(&self, text: &str, deadline: &Deadline) -> Result<(), Rejection> {
        for rule in &self.rules {
            if deadline.expired() {
                return Err(Rejection::new(
                    RejectReason::PatternTimeout,
                    format!("pattern scan timed out before rule '{}'", rule.name),
                ));
            }
            if rule.regex.is_match(text) {
                return Err(Rejection::new(
                    RejectReason::ObfuscationPattern,
                    format!("matched obfuscation signature '{}'", rule.name),
                ));
            }
        }
        Ok(())
    }
}

/// Detect a substring of at least `duplicate_pattern_min_length` bytes
/// repeated at least `duplicate_pattern_min_repeats` times consecutively.
///
/// The `regex` crate has no backreferences, so this works on comparison runs:
/// a unit of length `p` repeated `r` times means `text[i] == text[i + p]`
/// holds over a run of `p * (r - 1)` positions. For `r >= 3` such a run spans
/// at least `2p`, so it must fully contain one block pair aligned at a
/// multiple of `p` - probing only those pairs (a slice compare each, failing
/// on the first byte for ordinary text) keeps the scan near-linear per
/// period, and the exact run is measured only around an actual pair hit.
/// Benign input at the size cap finishes well inside the pattern budget; the
/// deadline is still checked once per period so adversarial near-miss input
/// fails closed.
pub fn check_repeated_substring(
    text: &str,
    config: &ValidatorConfig,
    deadline: &Deadline,
) -> Result<(), Rejection> {
    let bytes = text.as_bytes();
    let min_len = config.duplicate_pattern_min_length;
    let min_repeats = config.duplicate_pattern_min_repeats;

    if bytes.len() < min_len * min_repeats {
        return Ok(());
    }

    let max_period = bytes.len() / min_repeats;
    for period in min_len..=max_period {
        if deadline.expired() {
            return Err(Rejection::new(
                RejectReason::PatternTimeout,
                format!("repetition scan timed out at period {}", period),
            ));
        }

        let needed = period * (min_repeats - 1);
        // a run of `needed < 2p` positions can miss every aligned pair, so
        // two-repeat configs fall back to probing every offset
        let step = if min_repeats > 2 { period } else { 1 };

        let mut pos = 0usize;
        while pos + 2 * period <= bytes.len() {
            if bytes[pos..pos + period] != bytes[pos + period..pos + 2 * period] {
                pos += step;
                continue;
            }

            // pair hit: measure the maximal comparison run around it
            let mut lo = pos;
            while lo > 0 && bytes[lo - 1] == bytes[lo - 1 + period] {
                lo -= 1;
            }
            let mut hi = pos + period;
            while hi + period < bytes.len() && bytes[hi] == bytes[hi + period] {
                hi += 1;
            }

            if hi - lo >= needed {
                return Err(Rejection::new(
                    RejectReason::RepetitivePattern,
                    format!(
                        "substring of length {} repeated {}+ times near byte {}",
                        period, min_repeats, lo
                    ),
                ));
            }

            // run too short; resume past it
            pos = hi + 1;
        }
    }

    Ok(())
}

/// Detect runs of 10+ whitespace characters, counted across line breaks.
///
/// Leading indentation is exempt: legitimate Python nests past 10 columns
/// long before it is dangerous, and the nesting-depth check bounds that
/// separately. Newlines themselves still count, so blank-line flooding is
/// caught even though each line looks empty on its own.
pub fn check_whitespace_runs(text: &str) -> Result<(), Rejection> {
    const MAX_RUN: usize = 10;

    let mut run = 0usize;
    let mut indenting = true;
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            run += 1;
            indenting = true;
        } else if ch.is_whitespace() {
            if !indenting {
                run += 1;
            }
        } else {
            run = 0;
            indenting = false;
        }
        if run >= MAX_RUN {
            return Err(Rejection::new(
                RejectReason::ExcessiveWhitespace,
                format!("{}+ consecutive whitespace characters near byte {}", MAX_RUN, idx),
            ));
        }
    }

    Ok(())
}

static DUNDER_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b__\w+").expect("dunder pattern is valid"));

/// Tokens that reach the import machinery from inside a sandbox
const IMPORT_MACHINERY_TOKENS: &[&str] = &["__import__", "importlib", "builtins"];

/// Heuristic sandbox-escape check: dunder-style names combined with import
/// machinery tokens.
///
/// Known to be coarse with a high false-positive rate on code that merely
/// mentions these tokens; kept deliberately weak rather than treated as a
/// precise security boundary.
pub fn check_sandbox_escape(text: &str) -> Result<(), Rejection> {
    if !DUNDER_NAME_RE.is_match(text) {
        return Ok(());
    }

    for token in IMPORT_MACHINERY_TOKENS {
        if text.contains(token) {
            return Err(Rejection::new(
                RejectReason::PossibleSandboxEscape,
                format!("dunder name combined with '{}'", token),
            ));
        }
    }

    Ok(())
}
