use thiserror::Error;

use rule_engine_cell::RuleEngineError;
use shared_models::error::AppError;

#[derive(Debug, Error)]
pub enum SchedulingError {
    /// A read the query depends on failed. Never answered with "all available".
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error(transparent)]
    Rule(#[from] RuleEngineError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown timezone: {0}")]
    Timezone(String),
}

impl SchedulingError {
    pub fn upstream(what: &str, err: impl std::fmt::Display) -> Self {
        SchedulingError::UpstreamUnavailable(format!("failed to load {}: {}", what, err))
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::UpstreamUnavailable(msg) => AppError::UpstreamUnavailable(msg),
            SchedulingError::Rule(rule_err) => AppError::RuleCorruption(rule_err.to_string()),
            SchedulingError::InvalidRequest(msg) => AppError::BadRequest(msg),
            SchedulingError::Timezone(tz) => AppError::Internal(format!("Unknown clinic timezone: {}", tz)),
        }
    }
}
