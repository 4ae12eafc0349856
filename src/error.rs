//! Failure taxonomy for the submission and analysis operations.
//!
//! Rejections are returned as structured, user-displayable results at the
//! operation boundary - they never escape as panics. `StoreError` is the
//! one transient infrastructure failure; whether it surfaces or is
//! swallowed depends on where it occurs (see `fraud` for the fail-open
//! contract, `pipeline::submission` for the fail-closed persist).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transient infrastructure failure from a store backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("write conflict persisted after {0} retries")]
    Contention(usize),
}

impl StoreError {
    pub fn unavailable(detail: impl Into<String>) -> Self {
        StoreError::Unavailable(detail.into())
    }
}

/// A single violated field from payload validation.
///
/// Validation collects every violation in one pass so the client can show
/// a complete correction list instead of fixing fields one at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

impl FieldViolation {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why a trip submission was rejected.
#[derive(Debug, Error)]
pub enum SubmitRejection {
    #[error("authentication required")]
    Unauthenticated,

    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("invalid trip data: {}", join_violations(.0))]
    InvalidTripData(Vec<FieldViolation>),

    #[error("{0}")]
    DuplicateOrAbuseDetected(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a similarity analysis request was rejected.
#[derive(Debug, Error)]
pub enum AnalysisRejection {
    #[error("invalid parameters: {}", join_violations(.0))]
    InvalidParameters(Vec<FieldViolation>),

    #[error(transparent)]
    Store(#[from] StoreError),
}
