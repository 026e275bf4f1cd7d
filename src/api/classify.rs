//! Response classification.
//!
//! Each status code the backend is known to produce maps to one [`StatusRule`].
//! [`ResponseClassifier`] applies the matching rule to a finished attempt and
//! fires the session-expiry side effect for 401.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::{ApiError, HttpFailure};
use super::transport::{ApiResponse, TransportError};

pub const NETWORK_ERROR_MESSAGE: &str =
    "Network error. Please check your internet connection and try again.";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Which fields of a JSON error body may override the fallback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMessage {
    Ignore,
    MessageOnly,
    MessageThenDetail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRule {
    pub fallback: &'static str,
    pub server_message: ServerMessage,
    pub expires_session: bool,
}

impl StatusRule {
    const fn fixed(fallback: &'static str) -> Self {
        Self {
            fallback,
            server_message: ServerMessage::Ignore,
            expires_session: false,
        }
    }

    /// Builds the user-facing message for a response body under this rule.
    pub fn message(&self, body: &str) -> String {
        let server = match self.server_message {
            ServerMessage::Ignore => None,
            ServerMessage::MessageOnly => server_field(body, &["message"]),
            ServerMessage::MessageThenDetail => server_field(body, &["message", "detail"]),
        };
        server.unwrap_or_else(|| self.fallback.to_string())
    }
}

pub const BAD_REQUEST: StatusRule = StatusRule {
    fallback: "Invalid request. Please check your input.",
    server_message: ServerMessage::MessageThenDetail,
    expires_session: false,
};
pub const UNAUTHORIZED: StatusRule = StatusRule {
    fallback: "Your session has expired. Please log in again.",
    server_message: ServerMessage::Ignore,
    expires_session: true,
};
pub const FORBIDDEN: StatusRule =
    StatusRule::fixed("You do not have permission to perform this action.");
pub const NOT_FOUND: StatusRule = StatusRule::fixed("The requested resource was not found.");
pub const TOO_MANY_REQUESTS: StatusRule =
    StatusRule::fixed("Too many requests. Please wait a moment and try again.");
pub const INTERNAL_SERVER_ERROR: StatusRule = StatusRule {
    fallback: "Server error. Our team has been notified.",
    server_message: ServerMessage::MessageOnly,
    expires_session: false,
};
pub const SERVICE_UNAVAILABLE: StatusRule =
    StatusRule::fixed("Service temporarily unavailable. Please try again later.");
pub const OTHER: StatusRule = StatusRule {
    fallback: UNEXPECTED_ERROR_MESSAGE,
    server_message: ServerMessage::MessageThenDetail,
    expires_session: false,
};

pub fn rule_for(status: StatusCode) -> StatusRule {
    match status.as_u16() {
        400 => BAD_REQUEST,
        401 => UNAUTHORIZED,
        403 => FORBIDDEN,
        404 => NOT_FOUND,
        429 => TOO_MANY_REQUESTS,
        500 => INTERNAL_SERVER_ERROR,
        503 => SERVICE_UNAVAILABLE,
        _ => OTHER,
    }
}

/// First non-empty string among `fields` of a JSON object body.
fn server_field(body: &str, fields: &[&str]) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    fields.iter().find_map(|field| {
        value
            .get(*field)
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    })
}

/// Receives the 401 side effect.
#[async_trait]
pub trait SessionExpiry: Send + Sync {
    async fn expire(&self);
}

pub struct ResponseClassifier {
    expiry: Arc<dyn SessionExpiry>,
}

impl ResponseClassifier {
    pub fn new(expiry: Arc<dyn SessionExpiry>) -> Self {
        Self { expiry }
    }

    /// Passes successful responses through and normalizes everything else.
    pub async fn classify(
        &self,
        outcome: Result<ApiResponse, TransportError>,
    ) -> Result<ApiResponse, ApiError> {
        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                warn!("No response received: {}", e);
                return Err(ApiError::network(NETWORK_ERROR_MESSAGE, e));
            }
        };

        if response.status.is_success() {
            return Ok(response);
        }

        let status = response.status;
        let rule = rule_for(status);
        let message = rule.message(&response.body);
        debug!("Classified HTTP {} as: {}", status.as_u16(), message);

        if rule.expires_session {
            self.expiry.expire().await;
        }

        Err(ApiError::server(
            message,
            status.as_u16(),
            HttpFailure {
                status: status.as_u16(),
                body: response.body,
            },
        ))
    }
}
