use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tinylink_core::ShortenerError;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    Shortener(ShortenerError),
    /// The request carries no owner identity.
    Unauthorized,
    /// The caller is outside the trusted subnet.
    Forbidden(String),
    /// The short code exists but its mapping was deleted.
    Gone(String),
}

impl From<ShortenerError> for AppError {
    fn from(value: ShortenerError) -> Self {
        AppError::Shortener(value)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Shortener(err) => match err {
                ShortenerError::EmptyUrl
                | ShortenerError::EmptyBatch
                | ShortenerError::InvalidShortCode(_) => StatusCode::BAD_REQUEST,
                ShortenerError::NotFound(_) => StatusCode::NOT_FOUND,
                ShortenerError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                ShortenerError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                ShortenerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Gone(_) => StatusCode::GONE,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Shortener(err) => err.to_string(),
            AppError::Unauthorized => "missing owner identity".to_string(),
            AppError::Forbidden(reason) => reason.clone(),
            AppError::Gone(code) => format!("short url deleted: {code}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, error = %self.message(), "request failed");
        }
        (status, self.message()).into_response()
    }
}
