//! Unified error taxonomy for the pipeline's internal crates.
//!
//! Per the orchestrator's contract, none of these ever cross the turn
//! boundary as a propagated `Err` or a panic — they are captured into
//! `audit_entry` and observability events, then used to decide a fallback.

use thiserror::Error;

/// Governor rule-table errors. A non-empty variant here signals a bug in
/// the fixed rule list, not a runtime condition — the orchestrator logs it
/// and proceeds with the already-merged (possibly partial) effect.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GovernorError {
    #[error("rule invariant violated: {0}")]
    InvariantViolated(String),
}

/// Bridge contributor failures. Always swallowed by the bridge itself; this
/// type exists so a contributor can report *why* it produced no signal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BridgeError {
    #[error("contributor '{0}' timed out")]
    ContributorTimeout(String),

    #[error("contributor '{0}' failed: {1}")]
    ContributorFailed(String, String),
}

/// Executor (L2) failure modes, matching the `LLMProvider` contract.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutorError {
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("provider timed out")]
    Timeout,

    #[error("provider rate limited")]
    RateLimited,

    #[error("template missing for primitive/language")]
    TemplateMissing,
}

/// Verifier hard/soft violation reasons.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VerifierError {
    #[error("constitutional rule '{0}' violated at severity {1}")]
    ConstitutionalViolation(String, f32),

    #[error("responsibility-return marker missing for category {0:?}")]
    ResponsibilityMarkerMissing(String),

    #[error("output exceeds max length after truncation")]
    LengthExceeded,

    #[error("agency-shift phrase overrides responsibility-return marker")]
    AgencyShiftOverride,
}

/// Memory interface errors (working memory and regulatory store).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MemoryError {
    #[error("backing store error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid configuration value: {0} = {1}")]
    InvalidValue(String, String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),
}

/// Unified error type aggregating every internal error family.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("governor error: {0}")]
    Governor(#[from] GovernorError),

    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("verifier error: {0}")]
    Verifier(#[from] VerifierError),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "full")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[cfg(feature = "full")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("other error: {0}")]
    Other(String),
}

impl From<String> for PipelineError {
    fn from(s: String) -> Self {
        PipelineError::Other(s)
    }
}

impl From<&str> for PipelineError {
    fn from(s: &str) -> Self {
        PipelineError::Other(s.to_string())
    }
}
