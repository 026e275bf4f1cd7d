use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use tracing::{debug, warn};

use super::classify::ResponseClassifier;
use super::error::ApiError;
use super::transport::{ApiRequest, ApiResponse, Transport, TransportError};

/// Mutates a request before it is handed to the transport.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn intercept(&self, request: &mut ApiRequest);
}

/// Supplies the bearer credential at dispatch time.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// `None` both when no credential is stored and when the store is unreadable.
    async fn token(&self) -> Option<String>;
}

pub struct BearerAuth {
    credentials: Arc<dyn CredentialSource>,
}

impl BearerAuth {
    pub fn new(credentials: Arc<dyn CredentialSource>) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl RequestInterceptor for BearerAuth {
    async fn intercept(&self, request: &mut ApiRequest) {
        let Some(token) = self.credentials.token().await else {
            return;
        };

        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers.insert(AUTHORIZATION, value);
            }
            Err(e) => warn!("Stored credential is not a valid header value, sending unauthenticated: {}", e),
        }
    }
}

/// Request interceptors, then the bounded transport call, then classification.
pub struct Pipeline {
    transport: Arc<dyn Transport>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    classifier: ResponseClassifier,
    timeout: Duration,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn Transport>, classifier: ResponseClassifier, timeout: Duration) -> Self {
        Self {
            transport,
            interceptors: Vec::new(),
            classifier,
            timeout,
        }
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub async fn dispatch(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        for interceptor in &self.interceptors {
            interceptor.intercept(&mut request).await;
        }

        debug!(
            "Sending {} {} (request {}, authenticated: {})",
            request.method.as_str(),
            request.path,
            request.id,
            request.headers.contains_key(AUTHORIZATION)
        );

        let outcome = match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        };

        self.classifier.classify(outcome).await
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;
    use crate::api::classify::{SessionExpiry, NETWORK_ERROR_MESSAGE};
    use crate::api::testing::ScriptedTransport;
    use crate::api::transport::HttpMethod;

    struct FixedToken(Option<&'static str>);

    #[async_trait]
    impl CredentialSource for FixedToken {
        async fn token(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    struct NoExpiry;

    #[async_trait]
    impl SessionExpiry for NoExpiry {
        async fn expire(&self) {}
    }

    fn pipeline(transport: Arc<ScriptedTransport>, token: Option<&'static str>) -> Pipeline {
        Pipeline::new(
            transport,
            ResponseClassifier::new(Arc::new(NoExpiry)),
            Duration::from_secs(30),
        )
        .with_interceptor(Arc::new(BearerAuth::new(Arc::new(FixedToken(token)))))
    }

    #[tokio::test]
    async fn test_bearer_header_attached_when_token_present() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(StatusCode::OK, "{}");

        pipeline(transport.clone(), Some("abc123"))
            .dispatch(ApiRequest::new(HttpMethod::Get, "/api/auth/me"))
            .await
            .unwrap();

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].header("authorization"), Some("Bearer abc123"));
        assert_eq!(sent[0].header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_no_header_without_token() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(StatusCode::OK, "{}");

        pipeline(transport.clone(), None)
            .dispatch(ApiRequest::new(HttpMethod::Get, "/api/countries"))
            .await
            .unwrap();

        assert!(transport.requests()[0].header("authorization").is_none());
    }

    #[tokio::test]
    async fn test_unencodable_token_sends_unauthenticated() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(StatusCode::OK, "{}");

        pipeline(transport.clone(), Some("bad\ntoken"))
            .dispatch(ApiRequest::new(HttpMethod::Get, "/api/auth/me"))
            .await
            .unwrap();

        assert!(transport.requests()[0].header("authorization").is_none());
    }

    #[tokio::test]
    async fn test_slow_transport_times_out_as_network_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_after(Duration::from_secs(5), StatusCode::OK, "{}");

        let pipeline = Pipeline::new(
            transport,
            ResponseClassifier::new(Arc::new(NoExpiry)),
            Duration::from_millis(20),
        );
        let error = pipeline
            .dispatch(ApiRequest::new(HttpMethod::Get, "/api/chat/history"))
            .await
            .unwrap_err();

        assert!(error.is_network());
        assert_eq!(error.message(), NETWORK_ERROR_MESSAGE);
    }
}
