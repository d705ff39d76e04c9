use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Per-request error types.
///
/// Every variant renders as HTTP 200 with `{"ok": false, "error": ...}` so the
/// upstream platform never retries a delivery.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Request body could not be understood.
    BadRequest(String),
    /// Error interacting with the Sheets API.
    ExternalApiError(String),
    /// Failed to obtain an access token for the Sheets API.
    Auth(String),
    /// Internal error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
            AppError::Auth(msg) => write!(f, "Authentication error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an acknowledgement.
    ///
    /// The status is always 200; the failure is carried in the body.
    fn into_response(self) -> Response {
        match &self {
            AppError::BadRequest(msg) => tracing::warn!("Bad request: {}", msg),
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source)
            }
            other => tracing::error!("{}", other),
        }

        let body = Json(json!({
            "ok": false,
            "error": self.to_string(),
        }));

        (StatusCode::OK, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApiError(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Auth(format!("Failed to sign service-account assertion: {}", err))
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Startup configuration errors. Any of these aborts the process before the
/// listener is bound.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SPREADSHEET_ID or GOOGLE_SHEET_ID environment variable required")]
    MissingSpreadsheetId,

    #[error("GOOGLE_SERVICE_ACCOUNT_JSON or GOOGLE_APPLICATION_CREDENTIALS environment variable required")]
    MissingCredentials,

    #[error("failed to read credentials file {path}: {source}")]
    CredentialsFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid service-account credentials: {0}")]
    InvalidCredentials(String),

    #[error("{name} must be {expected}, got {value:?}")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}
