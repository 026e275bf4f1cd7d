use thiserror::Error;

use crate::api::ApiError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("Secure storage error: {0}")]
    SecureStorage(#[from] keyring::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    pub fn platform(msg: impl Into<String>) -> Self {
        Error::Platform(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn chat(msg: impl Into<String>) -> Self {
        Error::Chat(msg.into())
    }

    /// The message to show the user; normalized API errors keep their own wording.
    pub fn user_message(&self) -> String {
        match self {
            Error::Api(api) => api.message().to_string(),
            Error::Chat(msg) | Error::Validation(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
