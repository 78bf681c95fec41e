use strum_macros::Display;
use thiserror::Error;

/// Where a transport failure came from. Callers see a single error type;
/// the kind is only there for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TransportErrorKind {
    /// The server answered with a non-success status.
    Status,
    /// The body could not be decoded as JSON (or into the requested type).
    Decode,
    /// The request could not be built, so nothing was sent.
    Request,
    /// The request never produced a response.
    Network,
    /// The task driving the request died before settling.
    Aborted,
}

/// Failure of a single GET operation.
///
/// Cloneable so one settled outcome can be handed to every caller sharing
/// the in-flight operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn status(description: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Status, description)
    }

    pub fn decode(description: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Decode, description)
    }

    pub fn request(description: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Request, description)
    }

    pub fn network(description: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, description)
    }

    pub fn aborted(description: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Aborted, description)
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
