//! Error types for the workload model

use walle_http::HttpError;

/// Errors raised while building or provisioning a workload
///
/// Individual request failures never surface here; they are recorded
/// against the [`crate::StatsSink`].
#[derive(Debug, thiserror::Error)]
pub enum WorkloadError {
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Unknown profile '{0}' (expected one of: mixed, load, stress, external-bank)")]
    UnknownProfile(String),

    #[error("Invalid profile '{profile}': {message}")]
    InvalidProfile { profile: String, message: String },

    #[error("Failed to provision {identity}: {source}")]
    Provisioning {
        identity: String,
        #[source]
        source: HttpError,
    },
}

pub type WorkloadResult<T> = Result<T, WorkloadError>;
