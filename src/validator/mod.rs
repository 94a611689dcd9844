//! Code integrity validator
//!
//! Decides ACCEPT/REJECT for an untrusted text blob purporting to be Python
//! source, under a bounded wall-clock and complexity budget. The candidate is
//! never executed, evaluated, or mutated; checks run in a fixed order and the
//! first failure wins. Any timeout resolves to REJECT, never to "unknown".
//!
//! # Examples
//!
//! ```
//! use omniseal::config::ValidatorConfig;
//! use omniseal::validator::CodeIntegrityValidator;
//!
//! # fn main() -> anyhow::Result<()> {
//! let validator = CodeIntegrityValidator::new(ValidatorConfig::default())?;
//! let verdict = validator.validate_blocking("def add(a, b):\n    return a + b\n");
//! assert!(verdict.accepted);
//! # Ok(())
//! # }
//! ```

mod patterns;
mod semantic;
mod text;

pub use patterns::{SignatureSet, SIGNATURE_SET_VERSION};
pub use semantic::SecurityFindings;

use crate::config::ValidatorConfig;
use crate::verdict::{RejectReason, Rejection, Verdict};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Wall-clock deadline shared by the pipeline phases.
///
/// The worker checks it cooperatively before each expensive phase, so a
/// worker abandoned by the caller winds down at its next checkpoint instead
/// of burning the thread.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// A tighter deadline for a sub-phase, never later than this one
    pub fn bounded(&self, budget: Duration) -> Self {
        Self {
            at: self.at.min(Instant::now() + budget),
        }
    }

    fn checkpoint(&self, phase: &str) -> Result<(), Rejection> {
        if self.expired() {
            Err(Rejection::new(
                RejectReason::ValidationTimeout,
                format!("deadline elapsed before {}", phase),
            ))
        } else {
            Ok(())
        }
    }
}

/// Validator for untrusted Python snippets.
///
/// Construction compiles the signature tables once; validation itself shares
/// no mutable state between calls, so one instance can serve concurrent
/// validations freely.
#[derive(Debug, Clone)]
pub struct CodeIntegrityValidator {
    config: ValidatorConfig,
    signatures: Arc<SignatureSet>,
}

impl CodeIntegrityValidator {
    pub fn new(config: ValidatorConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let signatures = Arc::new(SignatureSet::compile()?);
        tracing::debug!(
            "signature set v{} loaded with {} rules",
            SIGNATURE_SET_VERSION,
            signatures.len()
        );
        Ok(Self { config, signatures })
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a candidate, returning within the configured wall-clock
    /// budget regardless of input.
    ///
    /// The pipeline runs on a blocking worker raced against the deadline; an
    /// elapsed deadline or a failed worker yields REJECT
    /// `VALIDATION_TIMEOUT`.
    pub async fn validate(&self, candidate: &str) -> Verdict {
        if candidate.trim().is_empty() {
            return self.rejected(Rejection::new(
                RejectReason::EmptyOrInvalid,
                "candidate is missing or empty",
            ));
        }

        let budget = self.config.max_validation_time();
        let deadline = Deadline::after(budget);
        let config = self.config.clone();
        let signatures = Arc::clone(&self.signatures);
        let owned = candidate.to_string();

        let worker =
            tokio::task::spawn_blocking(move || run_pipeline(&owned, &config, &signatures, deadline));

        match tokio::time::timeout(budget, worker).await {
            Ok(Ok(Ok(()))) => Verdict::accept(),
            Ok(Ok(Err(rejection))) => self.rejected(rejection),
            Ok(Err(join_error)) => self.rejected(Rejection::new(
                RejectReason::ValidationTimeout,
                format!("analysis worker failed: {}", join_error),
            )),
            Err(_) => self.rejected(Rejection::new(
                RejectReason::ValidationTimeout,
                format!("validation exceeded {:?}", budget),
            )),
        }
    }

    /// Same contract as [`validate`](Self::validate) for callers without a
    /// runtime: a dedicated worker thread joined through a channel with a
    /// receive timeout.
    pub fn validate_blocking(&self, candidate: &str) -> Verdict {
        if candidate.trim().is_empty() {
            return self.rejected(Rejection::new(
                RejectReason::EmptyOrInvalid,
                "candidate is missing or empty",
            ));
        }

        let budget = self.config.max_validation_time();
        let deadline = Deadline::after(budget);
        let config = self.config.clone();
        let signatures = Arc::clone(&self.signatures);
        let owned = candidate.to_string();

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            // the receiver may be gone if the deadline already fired
            let _ = tx.send(run_pipeline(&owned, &config, &signatures, deadline));
        });

        match rx.recv_timeout(budget) {
            Ok(Ok(())) => Verdict::accept(),
            Ok(Err(rejection)) => self.rejected(rejection),
            Err(_) => self.rejected(Rejection::new(
                RejectReason::ValidationTimeout,
                format!("validation exceeded {:?}", budget),
            )),
        }
    }

    /// Log the detailed diagnostic and return the trimmed-down verdict.
    /// Detection internals stay in the log, not in the caller-facing message.
    fn rejected(&self, rejection: Rejection) -> Verdict {
        tracing::warn!(reason = %rejection.reason, "rejected candidate: {}", rejection.message);
        Verdict::from(rejection)
    }
}

/// The ordered check pipeline. First failing check wins.
fn run_pipeline(
    candidate: &str,
    config: &ValidatorConfig,
    signatures: &SignatureSet,
    deadline: Deadline,
) -> Result<(), Rejection> {
    deadline.checkpoint("normalization")?;
    let normalized = text::normalize(candidate)?;
    text::check_suspicious_unicode(&normalized)?;
    text::check_size_bounds(&normalized, config)?;
    text::check_line_lengths(&normalized, config)?;

    deadline.checkpoint("pattern scan")?;
    let pattern_deadline = deadline.bounded(config.pattern_timeout());
    patterns::check_repeated_substring(&normalized, config, &pattern_deadline)?;
    patterns::check_whitespace_runs(&normalized)?;
    signatures.scan(&normalized, &pattern_deadline)?;

    text::check_language_plausibility(&normalized)?;

    deadline.checkpoint("parse")?;
    let tree = semantic::parse(&normalized)?;

    deadline.checkpoint("semantic scan")?;
    let findings = semantic::analyze(&tree, &normalized);

    if findings.node_count > config.max_ast_nodes {
        return Err(Rejection::new(
            RejectReason::TooComplex,
            format!(
                "{} syntax nodes (limit {})",
                findings.node_count, config.max_ast_nodes
            ),
        ));
    }

    if !findings.dangerous_calls.is_empty() {
        return Err(Rejection::new(
            RejectReason::DangerousCall,
            format!("dangerous calls: {}", findings.dangerous_calls.join(", ")),
        ));
    }

    if !findings.dangerous_attributes.is_empty() {
        return Err(Rejection::new(
            RejectReason::DangerousAttribute,
            format!(
                "dangerous attributes: {}",
                findings.dangerous_attributes.join(", ")
            ),
        ));
    }

    if findings.max_depth > config.max_nested_depth {
        return Err(Rejection::new(
            RejectReason::ExcessiveNesting,
            format!(
                "nesting depth {} (limit {})",
                findings.max_depth, config.max_nested_depth
            ),
        ));
    }

    if !findings.dangerous_imports.is_empty() {
        return Err(Rejection::new(
            RejectReason::DangerousImport,
            format!(
                "dangerous imports: {}",
                findings.dangerous_imports.join(", ")
            ),
        ));
    }

    if findings.has_star_import {
        return Err(Rejection::new(
            RejectReason::StarImportForbidden,
            "wildcard import",
        ));
    }

    patterns::check_sandbox_escape(&normalized)?;
    text::check_binary_signatures(&normalized)?;

    Ok(())
}
