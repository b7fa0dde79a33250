//! Unified application error model and mapping helpers.
//! `AppError` is the coarse code/message shape shared by the dev backend and the CLI;
//! `AuthError` and `ApiError` are the typed failures of the session and REST layers.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    NotFound { code: String, message: String },
    Auth { code: String, message: String },
    Forbidden { code: String, message: String },
    RateLimited { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::RateLimited { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::RateLimited { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn forbidden<S: Into<String>>(code: S, msg: S) -> Self { AppError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn rate_limited<S: Into<String>>(code: S, msg: S) -> Self { AppError::RateLimited { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::Auth { .. } => 401,
            AppError::Forbidden { .. } => 403,
            AppError::RateLimited { .. } => 429,
            AppError::Internal { .. } => 500,
        }
    }

    /// JSON body in the `{ message }` shape the portal backend returns on failure.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "code": self.code_str(), "message": self.message() })
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

/// Login and token failures, classified the way the login form presents them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("account not found: {0}")]
    NotFound(String),
    #[error("account disabled: {0}")]
    AccountDisabled(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("malformed token: {0}")]
    MalformedToken(String),
    /// The token could not be written to the durable slot.
    #[error("could not persist session: {0}")]
    Storage(String),
    /// A logout or expiry landed while this login was in flight.
    #[error("login superseded by a later session change")]
    Superseded,
}

impl AuthError {
    /// Classify a non-2xx auth response by status code. Only a 401 is refined by the
    /// backend message; other 4xx are malformed requests and 5xx are server errors.
    pub fn from_status(status: u16, message: &str) -> Self {
        let msg = message.to_string();
        let lower = message.to_ascii_lowercase();
        match status {
            401 => {
                if lower.contains("disabled") || lower.contains("deactivated") {
                    AuthError::AccountDisabled(msg)
                } else {
                    AuthError::InvalidCredentials(msg)
                }
            }
            403 => AuthError::AccountDisabled(msg),
            404 => AuthError::NotFound(msg),
            429 => AuthError::RateLimited(msg),
            400..=499 => AuthError::BadRequest(msg),
            s => AuthError::Server { status: s, message: msg },
        }
    }

    /// Text shown to the user next to the login form.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials(_) => "Invalid student ID or password. Please check your credentials and try again.",
            AuthError::NotFound(_) => "No account was found for that ID. Please check it and try again.",
            AuthError::AccountDisabled(_) => "This account has been disabled. Please contact the organization officers.",
            AuthError::RateLimited(_) => "Too many login attempts. Please wait a moment before trying again.",
            AuthError::BadRequest(_) => "Please fill in both your ID and password.",
            AuthError::Network(_) => "Unable to reach the server. Please check your connection and try again.",
            AuthError::Server { .. } => "The server encountered an error. Please try again later.",
            AuthError::MalformedToken(_) => "Your session could not be read. Please log in again.",
            AuthError::Storage(_) => "Your session could not be saved on this device. Please try again.",
            AuthError::Superseded => "You were signed out while logging in. Please log in again.",
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.to_string())
    }
}

/// Failures of authenticated REST calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("session expired")]
    SessionExpired,
    #[error("request failed ({status}): {message}")]
    Status { status: u16, message: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
