use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::Response,
};
use tracing::warn;

use crate::{error::AppError, upstream::RawReply};

const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Replays an upstream reply body and content type to the client, always as `200`.
/// JotForm's own status stays in the body as `responseCode`.
pub fn passthrough(reply: RawReply) -> Result<Response, AppError> {
    if !reply.status.is_success() {
        warn!("Upstream replied {}, passing body through", reply.status);
    }

    let content_type = reply
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(reply.body))
        .map_err(|e| AppError::InternalError(Box::new(e)))
}
