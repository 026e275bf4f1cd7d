pub mod classify;
pub mod client;
pub mod error;
pub mod middleware;
pub mod transport;
pub mod types;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{ResponseClassifier, SessionExpiry, StatusRule};
pub use client::{ApiClient, Endpoint, FailurePolicy};
pub use error::{ApiError, ApiErrorKind};
pub use middleware::{BearerAuth, CredentialSource, Pipeline, RequestInterceptor};
pub use transport::{ApiRequest, ApiResponse, HttpMethod, ReqwestTransport, Transport, TransportError};
pub use types::{
    ChatHistoryItem, ChatResponse, CountryList, Credentials, DeleteChatResponse, HealthStatus,
    TokenResponse, User,
};
