//! Errors a workflow surfaces to its caller.
//!
//! Tool-local failures (bad arguments, path escapes, disallowed commands) are
//! *not* represented here: those are recovered inside the agent loop and fed
//! back to the model as error payloads. This taxonomy is strictly the set of
//! outcomes that abort a run.

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum WorkbenchError {
    /// Provider rejected the bearer credential, or no credential is configured.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Retries exhausted on HTTP 429.
    #[error("rate limited by provider")]
    RateLimited,

    /// Non-retryable HTTP failure from the provider.
    #[error("provider error {status}: {message}")]
    Provider { status: u16, message: String },

    /// Transport-level failure with retries exhausted.
    #[error("network error: {0}")]
    Network(String),

    /// HTTP or subprocess wall-clock exceeded.
    #[error("timed out")]
    Timeout,

    /// Provider returned a payload we could not decode.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// Repository root vanished or cannot be canonicalised.
    #[error("repository unavailable: {0}")]
    RepoUnavailable(String),

    /// Run-log write failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Referenced project, task, or row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Settings snapshot failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WorkbenchError {
    /// Stable machine-readable code for the `{code, message}` envelope.
    pub fn code(&self) -> &'static str {
        match self {
            WorkbenchError::InvalidCredentials => "INVALID_CREDENTIALS",
            WorkbenchError::RateLimited => "RATE_LIMITED",
            WorkbenchError::Provider { .. } => "PROVIDER_ERROR",
            WorkbenchError::Network(_) => "NETWORK_ERROR",
            WorkbenchError::Timeout => "TIMEOUT",
            WorkbenchError::InvalidResponse(_) => "INVALID_RESPONSE",
            WorkbenchError::RepoUnavailable(_) => "REPO_UNAVAILABLE",
            WorkbenchError::Persistence(_) => "PERSISTENCE_ERROR",
            WorkbenchError::NotFound(_) => "NOT_FOUND",
            WorkbenchError::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}

/// Wire shape the host shell renders to the user.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
}

impl From<WorkbenchError> for ErrorEnvelope {
    fn from(err: WorkbenchError) -> Self {
        ErrorEnvelope {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
