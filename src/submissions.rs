//! # Submission Paginator
//!
//! Pulls every non-deleted submission of a poll, one page of [`PAGE_SIZE`] at a time.
//!
//! ## Termination
//! A page shorter than [`PAGE_SIZE`] is taken as the last one, an empty page included. This is a
//! heuristic, JotForm's `resultSet` count is not consulted. A poll holding an exact multiple of
//! [`PAGE_SIZE`] submissions costs one extra call that comes back empty.
//!
//! ## Failure
//! - Transport failure on any page aborts the whole fetch, nothing partial is returned
//! - A page that is not JSON, or has no `content` list, reads as a missing poll
//!
//! Pages are concatenated in upstream order with no deduplication.
use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    error::AppError, questions::QuestionType, registry::Credentials, upstream::FormApi,
};

pub const PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Submission {
    #[serde(default, deserialize_with = "lenient_answers")]
    pub answers: HashMap<String, Answer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Answer {
    #[serde(rename = "type", default)]
    pub kind: QuestionType,
    #[serde(rename = "prettyFormat", default)]
    pub pretty_format: Option<Value>,
    #[serde(default)]
    pub answer: Option<Value>,
}

impl Submission {
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

impl Answer {
    /// Values this answer contributes to its question's tally.
    pub fn values(&self) -> Vec<String> {
        match self.kind {
            QuestionType::Radio => self
                .pretty_format
                .as_ref()
                .and_then(display_value)
                .into_iter()
                .collect(),
            QuestionType::Checkbox => match &self.answer {
                Some(Value::Array(selected)) => selected.iter().filter_map(display_value).collect(),
                Some(single) => display_value(single).into_iter().collect(),
                None => Vec::new(),
            },
            QuestionType::Other => Vec::new(),
        }
    }
}

fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

// JotForm sends `"answers": []` for a submission with nothing filled in. Only radio and
// checkbox answers are kept.
fn lenient_answers<'de, D>(deserializer: D) -> Result<HashMap<String, Answer>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(raw) = Value::deserialize(deserializer)? else {
        return Ok(HashMap::new());
    };

    Ok(raw
        .into_iter()
        .filter_map(|(qid, answer)| {
            serde_json::from_value::<Answer>(answer)
                .ok()
                .filter(|answer| answer.kind.is_aggregable())
                .map(|answer| (qid, answer))
        })
        .collect())
}

fn page_content(body: Option<Value>) -> Result<Vec<Value>, AppError> {
    match body {
        Some(Value::Object(mut map)) => match map.remove("content") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(AppError::PollNotFound),
        },
        _ => Err(AppError::PollNotFound),
    }
}

pub async fn fetch_all_submissions(
    api: &dyn FormApi,
    credentials: &Credentials,
) -> Result<Vec<Submission>, AppError> {
    let mut submissions = Vec::new();
    let mut offset = 0;

    loop {
        let reply = api
            .list_submissions(credentials, offset, PAGE_SIZE)
            .await?;
        let batch = page_content(reply.parse())?;
        let batch_len = batch.len();

        debug!(
            "Poll {} page at offset {offset}: {batch_len} submissions",
            credentials.poll_id
        );

        submissions.extend(batch.into_iter().map(Submission::from_value));

        if batch_len < PAGE_SIZE {
            break;
        }

        offset += PAGE_SIZE;
    }

    info!(
        "Fetched {} submissions for poll {}",
        submissions.len(),
        credentials.poll_id
    );

    Ok(submissions)
}
