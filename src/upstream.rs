//! # JotForm API
//!
//! Upstream survey platform owning forms, questions and submissions.
//!
//! Every call carries the poll owner's app key as the `apiKey` query parameter. The proxy never
//! retries and never caches, each call is attempted exactly once with the configured timeout.
//!
//! Endpoints used
//! - `GET /form/{id}/questions`
//! - `GET /form/{id}/submissions?limit=&offset=&filter=`
//! - `PUT /form/{id}/submissions`
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    http::{StatusCode, header::CONTENT_TYPE},
};
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::debug;

use crate::{error::AppError, registry::Credentials};

pub const DEFAULT_API_URL: &str = "https://api.jotform.com";
pub const EXCLUDE_DELETED: &str = r#"{"status:ne":"DELETED"}"#;

/// Upstream reply kept as bytes so proxied routes can pass it through untouched.
#[derive(Debug, Clone)]
pub struct RawReply {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl RawReply {
    pub fn json(status: StatusCode, value: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: Bytes::from(value.to_string()),
        }
    }

    pub fn parse(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

#[async_trait]
pub trait FormApi: Send + Sync {
    async fn list_questions(&self, credentials: &Credentials) -> Result<RawReply, AppError>;

    async fn create_submissions(
        &self,
        credentials: &Credentials,
        submissions: &Value,
    ) -> Result<RawReply, AppError>;

    async fn list_submissions(
        &self,
        credentials: &Credentials,
        offset: usize,
        limit: usize,
    ) -> Result<RawReply, AppError>;
}

pub struct JotformClient {
    client: Client,
    base_url: String,
}

impl JotformClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn form_url(&self, poll_id: &str, resource: &str) -> String {
        format!("{}/form/{poll_id}/{resource}", self.base_url)
    }
}

// The request URL carries the app key.
fn transport(err: reqwest::Error) -> AppError {
    AppError::UpstreamTransport(Box::new(err.without_url()))
}

async fn into_raw(response: Response) -> Result<RawReply, AppError> {
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = response.bytes().await.map_err(transport)?;

    debug!("Upstream replied {status} with {} bytes", body.len());

    Ok(RawReply {
        status,
        content_type,
        body,
    })
}

#[async_trait]
impl FormApi for JotformClient {
    async fn list_questions(&self, credentials: &Credentials) -> Result<RawReply, AppError> {
        let response = self
            .client
            .get(self.form_url(&credentials.poll_id, "questions"))
            .query(&[("apiKey", credentials.app_key.as_str())])
            .send()
            .await
            .map_err(transport)?;

        into_raw(response).await
    }

    async fn create_submissions(
        &self,
        credentials: &Credentials,
        submissions: &Value,
    ) -> Result<RawReply, AppError> {
        let response = self
            .client
            .put(self.form_url(&credentials.poll_id, "submissions"))
            .query(&[("apiKey", credentials.app_key.as_str())])
            .json(submissions)
            .send()
            .await
            .map_err(transport)?;

        into_raw(response).await
    }

    async fn list_submissions(
        &self,
        credentials: &Credentials,
        offset: usize,
        limit: usize,
    ) -> Result<RawReply, AppError> {
        let offset = offset.to_string();
        let limit = limit.to_string();

        let response = self
            .client
            .get(self.form_url(&credentials.poll_id, "submissions"))
            .query(&[
                ("apiKey", credentials.app_key.as_str()),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
                ("filter", EXCLUDE_DELETED),
            ])
            .send()
            .await
            .map_err(transport)?;

        into_raw(response).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_form_url_trims_trailing_slash() {
        let client = JotformClient::new("https://api.example.com/", Duration::from_secs(1)).unwrap();

        assert_eq!(
            client.form_url("123", "questions"),
            "https://api.example.com/form/123/questions"
        );
    }

    #[tokio::test]
    async fn test_transport_error_hides_app_key() {
        // Nothing listens on port 1.
        let client = JotformClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let credentials = Credentials::new("SUPERSECRETKEY", "2401");

        let err = client.list_questions(&credentials).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamTransport(_)));
        assert!(!err.to_string().contains("SUPERSECRETKEY"));

        let err = client
            .list_submissions(&credentials, 0, 1000)
            .await
            .unwrap_err();
        assert!(!err.to_string().contains("SUPERSECRETKEY"));

        let err = client
            .create_submissions(&credentials, &json!([]))
            .await
            .unwrap_err();
        assert!(!err.to_string().contains("SUPERSECRETKEY"));
    }

    #[test]
    fn test_raw_reply_parse() {
        let reply = RawReply::json(StatusCode::OK, &json!({"content": []}));
        assert_eq!(reply.parse(), Some(json!({"content": []})));

        let garbage = RawReply {
            status: StatusCode::OK,
            content_type: Some("text/html".to_string()),
            body: Bytes::from_static(b"<html>"),
        };
        assert_eq!(garbage.parse(), None);
    }
}
