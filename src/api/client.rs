use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::classify::{ResponseClassifier, SessionExpiry, UNEXPECTED_ERROR_MESSAGE};
use super::error::ApiError;
use super::middleware::{BearerAuth, CredentialSource, Pipeline};
use super::transport::{ApiRequest, HttpMethod, Transport};
use super::types::{
    ChatHistoryItem, ChatResponse, CountryList, Credentials, DeleteChatResponse, HealthStatus,
    TokenResponse, User,
};
use super::validation;

/// What a method does when its call fails.
pub enum FailurePolicy<T> {
    Propagate,
    /// Log the failure and hand back the fallback value instead.
    Degrade(fn() -> T),
}

pub struct Endpoint<T> {
    pub name: &'static str,
    pub method: HttpMethod,
    pub path: &'static str,
    pub on_failure: FailurePolicy<T>,
}

impl<T> Endpoint<T> {
    fn request(&self) -> ApiRequest {
        ApiRequest::new(self.method, self.path)
    }
}

pub const SIGNUP: Endpoint<User> = Endpoint {
    name: "signup",
    method: HttpMethod::Post,
    path: "/api/auth/signup",
    on_failure: FailurePolicy::Propagate,
};

pub const LOGIN: Endpoint<TokenResponse> = Endpoint {
    name: "login",
    method: HttpMethod::Post,
    path: "/api/auth/login",
    on_failure: FailurePolicy::Propagate,
};

pub const CURRENT_USER: Endpoint<User> = Endpoint {
    name: "current_user",
    method: HttpMethod::Get,
    path: "/api/auth/me",
    on_failure: FailurePolicy::Propagate,
};

pub const SEND_MESSAGE: Endpoint<ChatResponse> = Endpoint {
    name: "send_message",
    method: HttpMethod::Post,
    path: "/api/chat",
    on_failure: FailurePolicy::Propagate,
};

pub const CHAT_HISTORY: Endpoint<Vec<ChatHistoryItem>> = Endpoint {
    name: "chat_history",
    method: HttpMethod::Get,
    path: "/api/chat/history",
    on_failure: FailurePolicy::Degrade(Vec::new),
};

pub const DELETE_CHAT: Endpoint<DeleteChatResponse> = Endpoint {
    name: "delete_chat_history",
    method: HttpMethod::Delete,
    path: "/api/chat/history",
    on_failure: FailurePolicy::Propagate,
};

pub const COUNTRIES: Endpoint<CountryList> = Endpoint {
    name: "countries",
    method: HttpMethod::Get,
    path: "/api/countries",
    on_failure: FailurePolicy::Degrade(CountryList::fallback),
};

pub const HEALTH: Endpoint<HealthStatus> = Endpoint {
    name: "health",
    method: HttpMethod::Get,
    path: "/health",
    on_failure: FailurePolicy::Propagate,
};

/// The single choke point for backend calls.
pub struct ApiClient {
    pipeline: Pipeline,
}

impl ApiClient {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    /// Standard wiring: bearer credentials from `session`, 401 handling by `session`.
    pub fn with_session<S>(transport: Arc<dyn Transport>, session: Arc<S>, timeout: Duration) -> Self
    where
        S: CredentialSource + SessionExpiry + 'static,
    {
        let classifier = ResponseClassifier::new(session.clone());
        let pipeline = Pipeline::new(transport, classifier, timeout)
            .with_interceptor(Arc::new(BearerAuth::new(session)));
        Self::new(pipeline)
    }

    pub async fn signup(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let credentials = Credentials::new(email, password);
        validation::validate_signup(&credentials)?;

        let request = SIGNUP.request().with_body(to_body(&credentials)?);
        let user = self.call(&SIGNUP, request).await?;
        info!("Account created for user {}", user.id);
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let credentials = Credentials::new(email, password);
        validation::validate_login(&credentials)?;

        let request = LOGIN.request().with_body(to_body(&credentials)?);
        self.call(&LOGIN, request).await
    }

    pub async fn get_current_user(&self) -> Result<User, ApiError> {
        self.call(&CURRENT_USER, CURRENT_USER.request()).await
    }

    pub async fn send_message(&self, question: &str, country: Option<&str>) -> Result<ChatResponse, ApiError> {
        let chat_request = validation::prepare_question(question, country)?;

        let request = SEND_MESSAGE.request().with_body(to_body(&chat_request)?);
        self.call(&SEND_MESSAGE, request).await
    }

    pub async fn get_chat_history(&self) -> Result<Vec<ChatHistoryItem>, ApiError> {
        self.call(&CHAT_HISTORY, CHAT_HISTORY.request()).await
    }

    pub async fn get_chat_history_page(&self, limit: u32, offset: u32) -> Result<Vec<ChatHistoryItem>, ApiError> {
        validation::validate_history_page(limit)?;

        let request = CHAT_HISTORY
            .request()
            .with_query("limit", limit)
            .with_query("offset", offset);
        self.call(&CHAT_HISTORY, request).await
    }

    pub async fn delete_chat_history(&self, chat_id: i64) -> Result<DeleteChatResponse, ApiError> {
        let mut request = DELETE_CHAT.request();
        request.path = format!("{}/{}", DELETE_CHAT.path, chat_id);
        self.call(&DELETE_CHAT, request).await
    }

    pub async fn get_countries(&self) -> Result<CountryList, ApiError> {
        self.call(&COUNTRIES, COUNTRIES.request()).await
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.call(&HEALTH, HEALTH.request()).await
    }

    async fn call<T: DeserializeOwned>(&self, endpoint: &Endpoint<T>, request: ApiRequest) -> Result<T, ApiError> {
        match self.fetch(request).await {
            Ok(value) => Ok(value),
            Err(error) => match endpoint.on_failure {
                FailurePolicy::Propagate => {
                    debug!("{} failed: {}", endpoint.name, error);
                    Err(error)
                }
                FailurePolicy::Degrade(fallback) => {
                    warn!("{} failed, using fallback: {}", endpoint.name, error);
                    Ok(fallback())
                }
            },
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.pipeline.dispatch(request).await?;
        response.json().map_err(|e| {
            warn!("Could not decode response body (HTTP {}): {}", response.status, e);
            ApiError::server(UNEXPECTED_ERROR_MESSAGE, response.status.as_u16(), e)
        })
    }
}

fn to_body<B: Serialize>(body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::validation(format!("Could not encode request: {}", e)))
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use reqwest::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::api::classify::NETWORK_ERROR_MESSAGE;
    use crate::api::testing::ScriptedTransport;

    #[derive(Default)]
    struct FakeSession {
        token: Mutex<Option<String>>,
        expired: Mutex<u32>,
    }

    #[async_trait::async_trait]
    impl CredentialSource for FakeSession {
        async fn token(&self) -> Option<String> {
            self.token.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl SessionExpiry for FakeSession {
        async fn expire(&self) {
            *self.token.lock() = None;
            *self.expired.lock() += 1;
        }
    }

    fn client() -> (ApiClient, Arc<ScriptedTransport>, Arc<FakeSession>) {
        let transport = Arc::new(ScriptedTransport::new());
        let session = Arc::new(FakeSession::default());
        let client = ApiClient::with_session(transport.clone(), session.clone(), Duration::from_secs(30));
        (client, transport, session)
    }

    #[tokio::test]
    async fn test_signup_validation_happens_before_network() {
        let (client, transport, _) = client();

        let error = client.signup("bad-email", "abcdef").await.unwrap_err();
        assert!(error.message().contains("valid email"));

        let error = client.signup("a@b.com", "abc").await.unwrap_err();
        assert!(error.is_validation());

        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_signup_posts_credentials() {
        let (client, transport, _) = client();
        transport.respond_json(
            StatusCode::CREATED,
            json!({"id": 3, "email": "a@b.com", "created_at": "2024-05-01T10:00:00"}),
        );

        let user = client.signup("a@b.com", "abcdef").await.unwrap();
        assert_eq!(user.id, 3);

        let sent = transport.requests();
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].path, "/api/auth/signup");
        assert_eq!(sent[0].body, Some(json!({"email": "a@b.com", "password": "abcdef"})));
    }

    #[tokio::test]
    async fn test_login_requires_both_fields() {
        let (client, transport, _) = client();
        let error = client.login("a@b.com", "").await.unwrap_err();
        assert_eq!(error.message(), "Please enter both email and password");
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_login_rejection_uses_session_expired_message() {
        let (client, transport, session) = client();
        transport.respond_json(
            StatusCode::UNAUTHORIZED,
            json!({"error": true, "message": "Incorrect email or password", "status_code": 401}),
        );

        let error = client.login("a@b.com", "wrong-password").await.unwrap_err();
        assert_eq!(error.message(), "Your session has expired. Please log in again.");
        assert_eq!(error.status(), Some(401));
        assert_eq!(*session.expired.lock(), 1);
    }

    #[tokio::test]
    async fn test_send_message_fails_fast() {
        let (client, transport, _) = client();

        let error = client.send_message("", None).await.unwrap_err();
        assert_eq!(error.message(), "Please enter a question");

        let error = client.send_message(&"x".repeat(1001), None).await.unwrap_err();
        assert_eq!(error.message(), "Question is too long. Please limit to 1000 characters.");

        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_send_message_posts_trimmed_question() {
        let (client, transport, _) = client();
        transport.respond_json(StatusCode::OK, json!({"answer": "About CAD 20,000.", "country": "Canada"}));

        let response = client
            .send_message("  How much is tuition?  ", Some("Canada"))
            .await
            .unwrap();
        assert_eq!(response.answer, "About CAD 20,000.");

        let sent = transport.requests();
        assert_eq!(sent[0].path, "/api/chat");
        assert_eq!(
            sent[0].body,
            Some(json!({"question": "How much is tuition?", "country": "Canada"}))
        );
    }

    #[tokio::test]
    async fn test_network_failure_message_is_method_independent() {
        let (client, transport, _) = client();
        transport.fail_network();
        transport.fail_network();
        transport.fail_network();

        let errors = [
            client.get_current_user().await.unwrap_err(),
            client.send_message("Hello", None).await.unwrap_err(),
            client.login("a@b.com", "abcdef").await.map(|_| ()).unwrap_err(),
        ];
        for error in errors {
            assert_eq!(error.message(), NETWORK_ERROR_MESSAGE);
            assert_eq!(error.status(), None);
        }
    }

    #[tokio::test]
    async fn test_chat_history_degrades_to_empty() {
        let (client, transport, _) = client();
        transport.fail_network();
        assert!(client.get_chat_history().await.unwrap().is_empty());

        transport.respond(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(client.get_chat_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_countries_degrade_to_fallback() {
        let (client, transport, _) = client();
        transport.fail_network();

        let countries = client.get_countries().await.unwrap();
        assert_eq!(countries, CountryList::fallback());
        assert_eq!(countries.countries, vec!["USA", "UK", "Canada", "Australia"]);
    }

    #[tokio::test]
    async fn test_countries_from_server() {
        let (client, transport, _) = client();
        transport.respond_json(StatusCode::OK, json!({"countries": ["Germany", "Ireland"]}));

        let countries = client.get_countries().await.unwrap();
        assert_eq!(countries.countries, vec!["Germany", "Ireland"]);
    }

    #[tokio::test]
    async fn test_history_page_sends_query_and_checks_limit() {
        let (client, transport, _) = client();
        assert!(client.get_chat_history_page(0, 0).await.unwrap_err().is_validation());
        assert_eq!(transport.request_count(), 0);

        transport.respond(StatusCode::OK, "[]");
        client.get_chat_history_page(25, 50).await.unwrap();
        let sent = transport.requests();
        assert_eq!(sent[0].query[0], ("limit".to_string(), "25".to_string()));
        assert_eq!(sent[0].query[1], ("offset".to_string(), "50".to_string()));
    }

    #[tokio::test]
    async fn test_delete_chat_history_propagates_not_found() {
        let (client, transport, _) = client();
        transport.respond_json(StatusCode::NOT_FOUND, json!({"message": "Chat history item not found"}));

        let error = client.delete_chat_history(42).await.unwrap_err();
        assert_eq!(error.message(), "The requested resource was not found.");
        assert_eq!(transport.requests()[0].path, "/api/chat/history/42");
        assert_eq!(transport.requests()[0].method, HttpMethod::Delete);
    }

    #[tokio::test]
    async fn test_undecodable_success_body_is_normalized() {
        let (client, transport, _) = client();
        transport.respond(StatusCode::OK, "<html>proxy page</html>");

        let error = client.get_current_user().await.unwrap_err();
        assert_eq!(error.message(), UNEXPECTED_ERROR_MESSAGE);
        assert_eq!(error.status(), Some(200));
    }

    #[tokio::test]
    async fn test_bearer_attached_from_session() {
        let (client, transport, session) = client();
        *session.token.lock() = Some("tok-1".to_string());
        transport.respond_json(
            StatusCode::OK,
            json!({"id": 1, "email": "a@b.com", "created_at": "2024-05-01T10:00:00"}),
        );

        client.get_current_user().await.unwrap();
        assert_eq!(transport.requests()[0].header("authorization"), Some("Bearer tok-1"));
    }
}
