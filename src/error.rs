use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Unknown poll token")]
    UnknownToken,

    #[error("Poll not found.")]
    PollNotFound,

    #[error("Upstream unreachable: {0}")]
    UpstreamTransport(#[source] BoxError),

    #[error("Corrupt registry record for token")]
    CorruptRecord,

    #[error("Store error: {0}")]
    Store(#[source] BoxError),

    #[error("Internal error: {0}")]
    InternalError(#[from] BoxError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload => StatusCode::BAD_REQUEST,
            AppError::UnknownToken => StatusCode::UNAUTHORIZED,
            AppError::PollNotFound => StatusCode::NOT_FOUND,
            AppError::UpstreamTransport(_) => StatusCode::BAD_GATEWAY,
            AppError::CorruptRecord | AppError::Store(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Store(Box::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("{self}");
        }

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::UnknownToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::PollNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::MalformedPayload.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::UpstreamTransport("connection refused".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Store("down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
