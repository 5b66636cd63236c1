//! Runtime error types

use walle_workload::WorkloadError;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Workload(#[from] WorkloadError),

    #[error("Failed to create latency histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),

    #[error("Virtual user task failed: {0}")]
    Task(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
