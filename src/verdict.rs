//! Verdict types returned by the code integrity validator.

use serde::{Deserialize, Serialize};

/// Reason a candidate was rejected
///
/// Every rejection carries exactly one of these codes. ACCEPT carries none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// Missing, empty, or whitespace-only input
    EmptyOrInvalid,
    /// Unicode normalization failed
    EncodingError,
    /// Non-ASCII character outside the accepted categories
    SuspiciousUnicode,
    /// Candidate longer than `max_code_size`
    SizeLimitExceeded,
    /// A single line longer than `max_line_length`
    LineTooLong,
    /// A long substring repeated consecutively
    RepetitivePattern,
    /// A run of 10+ whitespace characters
    ExcessiveWhitespace,
    /// Matched a known obfuscation signature
    ObfuscationPattern,
    /// Pattern scanning exceeded its sub-deadline
    PatternTimeout,
    /// No structural keyword found; does not look like source code
    NotRecognizedLanguage,
    /// The grammar reported a syntax error
    SyntaxError,
    /// The parser failed without a syntax position
    ParseError,
    /// Syntax tree node count over `max_ast_nodes`
    TooComplex,
    /// Call to a deny-listed function
    DangerousCall,
    /// Access to a deny-listed attribute
    DangerousAttribute,
    /// Nesting depth over `max_nested_depth`
    ExcessiveNesting,
    /// Import of a deny-listed module
    DangerousImport,
    /// Wildcard import
    StarImportForbidden,
    /// Dunder names combined with import machinery
    PossibleSandboxEscape,
    /// Embedded binary magic or NUL bytes
    SuspiciousByteSequence,
    /// Overall validation deadline elapsed
    ValidationTimeout,
}

impl RejectReason {
    /// Stable wire code for this reason
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::EmptyOrInvalid => "EMPTY_OR_INVALID",
            Self::EncodingError => "ENCODING_ERROR",
            Self::SuspiciousUnicode => "SUSPICIOUS_UNICODE",
            Self::SizeLimitExceeded => "SIZE_LIMIT_EXCEEDED",
            Self::LineTooLong => "LINE_TOO_LONG",
            Self::RepetitivePattern => "REPETITIVE_PATTERN",
            Self::ExcessiveWhitespace => "EXCESSIVE_WHITESPACE",
            Self::ObfuscationPattern => "OBFUSCATION_PATTERN",
            Self::PatternTimeout => "PATTERN_TIMEOUT",
            Self::NotRecognizedLanguage => "NOT_RECOGNIZED_LANGUAGE",
            Self::SyntaxError => "SYNTAX_ERROR",
            Self::ParseError => "PARSE_ERROR",
            Self::TooComplex => "TOO_COMPLEX",
            Self::DangerousCall => "DANGEROUS_CALL",
            Self::DangerousAttribute => "DANGEROUS_ATTRIBUTE",
            Self::ExcessiveNesting => "EXCESSIVE_NESTING",
            Self::DangerousImport => "DANGEROUS_IMPORT",
            Self::StarImportForbidden => "STAR_IMPORT_FORBIDDEN",
            Self::PossibleSandboxEscape => "POSSIBLE_SANDBOX_ESCAPE",
            Self::SuspiciousByteSequence => "SUSPICIOUS_BYTE_SEQUENCE",
            Self::ValidationTimeout => "VALIDATION_TIMEOUT",
        }
    }

    /// Short caller-facing description, without detection internals
    pub fn description(&self) -> &'static str {
        match self {
            Self::EmptyOrInvalid => "Input is empty or not valid text",
            Self::EncodingError => "Input could not be normalized",
            Self::SuspiciousUnicode => "Input contains suspicious unicode characters",
            Self::SizeLimitExceeded => "Input exceeds the size limit",
            Self::LineTooLong => "A line exceeds the length limit",
            Self::RepetitivePattern => "Input contains repetitive patterns",
            Self::ExcessiveWhitespace => "Input contains excessive whitespace",
            Self::ObfuscationPattern => "Input matches an obfuscation pattern",
            Self::PatternTimeout => "Pattern analysis took too long",
            Self::NotRecognizedLanguage => "Input does not look like source code",
            Self::SyntaxError => "Input contains a syntax error",
            Self::ParseError => "Input could not be parsed",
            Self::TooComplex => "Input is too complex to analyze",
            Self::DangerousCall => "Input calls a forbidden function",
            Self::DangerousAttribute => "Input accesses a forbidden attribute",
            Self::ExcessiveNesting => "Input is nested too deeply",
            Self::DangerousImport => "Input imports a forbidden module",
            Self::StarImportForbidden => "Wildcard imports are not allowed",
            Self::PossibleSandboxEscape => "Input resembles a sandbox escape attempt",
            Self::SuspiciousByteSequence => "Input contains binary data",
            Self::ValidationTimeout => "Validation took too long",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

/// Internal rejection carrying the reason plus a diagnostic message
///
/// This is the error type of the check pipeline: each check returns
/// `Result<(), Rejection>` so checks compose with `?` and the first failure
/// short-circuits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: RejectReason,
    pub message: String,
}

impl Rejection {
    pub fn new(reason: RejectReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.reason, self.message)
    }
}

/// Result of one validation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the candidate passed every check
    pub accepted: bool,

    /// Reason code on rejection, `None` on acceptance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<RejectReason>,

    /// Caller-facing message (detailed diagnostics go to the log instead)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Verdict {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason_code: None,
            message: None,
        }
    }

    pub fn reject(reason: RejectReason) -> Self {
        Self {
            accepted: false,
            reason_code: Some(reason),
            message: Some(reason.description().to_string()),
        }
    }

    /// JSON in the shape the front end relays to users:
    /// `{"safe": true}` or `{"safe": false, "reason": "..."}`
    pub fn safe_json(&self) -> serde_json::Value {
        if self.accepted {
            serde_json::json!({ "safe": true })
        } else {
            serde_json::json!({
                "safe": false,
                "reason": self.reason_code.map(|r| r.as_code()).unwrap_or("UNKNOWN"),
            })
        }
    }
}

impl From<Rejection> for Verdict {
    fn from(rejection: Rejection) -> Self {
        Self::reject(rejection.reason)
    }
}
