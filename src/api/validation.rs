//! Fail-fast checks run before a request is built.

use validator::{Validate, ValidationErrors};

use super::error::ApiError;
use super::types::{ChatRequest, Credentials};

pub const EMPTY_LOGIN_MESSAGE: &str = "Please enter both email and password";
pub const EMPTY_QUESTION_MESSAGE: &str = "Please enter a question";
pub const HISTORY_LIMIT_MESSAGE: &str = "Limit must be between 1 and 100";

pub fn validate_signup(credentials: &Credentials) -> Result<(), ApiError> {
    credentials
        .validate()
        .map_err(|errors| first_message(&errors, &["email", "password"]))
}

pub fn validate_login(credentials: &Credentials) -> Result<(), ApiError> {
    if credentials.email.is_empty() || credentials.password.is_empty() {
        return Err(ApiError::validation(EMPTY_LOGIN_MESSAGE));
    }
    Ok(())
}

/// Checks the question as typed and returns the request to send, with the
/// question trimmed. The length limit applies to the untrimmed text.
pub fn prepare_question(question: &str, country: Option<&str>) -> Result<ChatRequest, ApiError> {
    if question.trim().is_empty() {
        return Err(ApiError::validation(EMPTY_QUESTION_MESSAGE));
    }

    let mut request = ChatRequest {
        question: question.to_string(),
        country: country.map(str::to_string),
    };
    request
        .validate()
        .map_err(|errors| first_message(&errors, &["question"]))?;

    request.question = request.question.trim().to_string();
    Ok(request)
}

pub fn validate_history_page(limit: u32) -> Result<(), ApiError> {
    if !(1..=100).contains(&limit) {
        return Err(ApiError::validation(HISTORY_LIMIT_MESSAGE));
    }
    Ok(())
}

/// Picks the message of the first failing field in `order`.
fn first_message(errors: &ValidationErrors, order: &[&str]) -> ApiError {
    let fields = errors.field_errors();
    let message = order
        .iter()
        .filter_map(|field| {
            fields
                .iter()
                .find(|(name, _)| name.to_string() == *field)
                .map(|(_, field_errors)| *field_errors)
        })
        .flat_map(|field_errors| field_errors.iter())
        .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string());
    ApiError::validation(message)
}
