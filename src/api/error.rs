//! The single failure shape surfaced by [`ApiClient`](super::ApiClient).
//!
//! Every public client method fails with an [`ApiError`]. Transport and decode
//! errors are kept as the `cause` and never returned on their own.

use std::error::Error as StdError;

use thiserror::Error;

type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// Where in the pipeline a failure was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Rejected on the client before any network attempt.
    Validation,
    /// No response reached the client (connectivity failure or timeout).
    Network,
    /// A response arrived with a non-success status, or an unreadable body.
    Server,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    message: String,
    status: Option<u16>,
    kind: ApiErrorKind,
    #[source]
    cause: Option<Cause>,
}

impl ApiError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            kind: ApiErrorKind::Validation,
            cause: None,
        }
    }

    pub(crate) fn network(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self {
            message: message.into(),
            status: None,
            kind: ApiErrorKind::Network,
            cause: Some(cause.into()),
        }
    }

    pub(crate) fn server(message: impl Into<String>, status: u16, cause: impl Into<Cause>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
            kind: ApiErrorKind::Server,
            cause: Some(cause.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status of the response, absent for validation and network failures.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    pub fn is_validation(&self) -> bool {
        self.kind == ApiErrorKind::Validation
    }

    pub fn is_network(&self) -> bool {
        self.kind == ApiErrorKind::Network
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }
}

/// A non-success response kept as the cause of a server-kind [`ApiError`].
#[derive(Debug, Error)]
#[error("HTTP {status}: {body}")]
pub struct HttpFailure {
    pub status: u16,
    pub body: String,
}
