use premwatch_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Errors from the AI text-understanding collaborator.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI service returned HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("AI response JSON could not be decoded for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("AI response malformed: {0}")]
    MalformedResponse(String),
}

impl AiError {
    /// Map to the failure taxonomy. Transport and status errors are retryable;
    /// anything wrong with the payload is a parse failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            AiError::Http(_) | AiError::UnexpectedStatus { .. } => ErrorKind::NetworkFailure,
            AiError::Deserialize { .. } | AiError::MalformedResponse(_) => {
                ErrorKind::ParseFailure
            }
        }
    }
}

/// A strategy run that ended without records because something went wrong.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {reason}")]
pub struct StrategyFailure {
    pub kind: ErrorKind,
    pub reason: String,
}

impl StrategyFailure {
    #[must_use]
    pub fn new(kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailure, reason)
    }

    #[must_use]
    pub fn is_retriable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<AiError> for StrategyFailure {
    fn from(err: AiError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}
