//! HTTP error types

use std::fmt;

/// Longest response body excerpt kept in an error
const BODY_EXCERPT_LEN: usize = 200;

/// Error type for wallet API calls
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HttpError {
    /// Connection refused, reset, timed out
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The server answered with a status other than the expected one
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The body could not be decoded into the expected shape
    #[error("Payload parse failure: {0}")]
    PayloadParse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Client configuration error: {0}")]
    Client(String),
}

/// Failure taxonomy recorded against the statistics sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Transport,
    UnexpectedStatus,
    PayloadParse,
    /// Success status, but the body reports the operation as failed
    Rejected,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::UnexpectedStatus => write!(f, "unexpected_status"),
            FailureKind::PayloadParse => write!(f, "payload_parse"),
            FailureKind::Rejected => write!(f, "rejected"),
        }
    }
}

impl HttpError {
    pub fn unexpected_status(status: u16, body: &str) -> Self {
        HttpError::UnexpectedStatus {
            status,
            body: excerpt(body),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            HttpError::Transport(_) | HttpError::InvalidUrl(_) | HttpError::Client(_) => {
                FailureKind::Transport
            }
            HttpError::UnexpectedStatus { .. } => FailureKind::UnexpectedStatus,
            HttpError::PayloadParse(_) => FailureKind::PayloadParse,
        }
    }

    /// Short failure reason recorded against the statistics sink
    pub fn reason(&self) -> String {
        match self {
            HttpError::UnexpectedStatus { status, .. } => format!("{} {}", self.kind(), status),
            HttpError::Transport(msg)
            | HttpError::PayloadParse(msg)
            | HttpError::InvalidUrl(msg)
            | HttpError::Client(msg) => format!("{}: {}", self.kind(), msg),
        }
    }

    /// Status code, when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            HttpError::PayloadParse(error.to_string())
        } else if error.is_builder() {
            HttpError::Client(error.to_string())
        } else {
            HttpError::Transport(error.to_string())
        }
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(error: serde_json::Error) -> Self {
        HttpError::PayloadParse(error.to_string())
    }
}

impl From<url::ParseError> for HttpError {
    fn from(error: url::ParseError) -> Self {
        HttpError::InvalidUrl(error.to_string())
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
