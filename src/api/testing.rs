//! In-memory transport for exercising the client without a server.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;

use super::transport::{ApiRequest, ApiResponse, Transport, TransportError};

enum Reply {
    Response(ApiResponse),
    Delayed(Duration, ApiResponse),
    Unreachable,
}

/// Replays queued replies in order and records every request it receives.
/// An empty queue behaves like an unreachable server.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, status: StatusCode, body: &str) {
        self.replies
            .lock()
            .push_back(Reply::Response(ApiResponse::new(status, body)));
    }

    pub fn respond_json(&self, status: StatusCode, body: serde_json::Value) {
        self.respond(status, &body.to_string());
    }

    pub fn respond_after(&self, delay: Duration, status: StatusCode, body: &str) {
        self.replies
            .lock()
            .push_back(Reply::Delayed(delay, ApiResponse::new(status, body)));
    }

    pub fn fail_network(&self) {
        self.replies.lock().push_back(Reply::Unreachable);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().push(request);
        let reply = self.replies.lock().pop_front();

        match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Delayed(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Some(Reply::Unreachable) | None => {
                Err(TransportError::Connect("connection refused".to_string()))
            }
        }
    }
}
