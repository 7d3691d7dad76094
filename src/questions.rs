//! # Question Filter
//!
//! Picks the questions whose answers can be tallied.
//!
//! Only discrete-choice controls count:
//! - `control_radio`: one value per submission
//! - `control_checkbox`: any number of values per submission
//!
//! JotForm answers the question listing with `{"content": {qid: {...}}}`, but a form without
//! questions comes back with `content` as an empty list. The raw reply is resolved once into a
//! [`QuestionListing`], anything unexpected meaning no questions.
use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::upstream::RawReply;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "control_radio")]
    Radio,
    #[serde(rename = "control_checkbox")]
    Checkbox,
    #[default]
    #[serde(other)]
    Other,
}

impl QuestionType {
    pub fn is_aggregable(self) -> bool {
        matches!(self, QuestionType::Radio | QuestionType::Checkbox)
    }
}

#[derive(Debug, Default, Deserialize)]
struct QuestionMeta {
    #[serde(rename = "type", default)]
    kind: QuestionType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuestionListing {
    NoQuestions,
    Questions(Map<String, Value>),
}

impl QuestionListing {
    pub fn from_reply(reply: &RawReply) -> Self {
        reply
            .parse()
            .map(|body| Self::from_body(&body))
            .unwrap_or(QuestionListing::NoQuestions)
    }

    pub fn from_body(body: &Value) -> Self {
        match body.get("content") {
            Some(Value::Object(questions)) => QuestionListing::Questions(questions.clone()),
            _ => QuestionListing::NoQuestions,
        }
    }
}

pub fn filter_aggregable_questions(listing: &QuestionListing) -> BTreeSet<String> {
    let QuestionListing::Questions(questions) = listing else {
        return BTreeSet::new();
    };

    questions
        .iter()
        .filter(|(_, meta)| {
            QuestionMeta::deserialize(*meta)
                .unwrap_or_default()
                .kind
                .is_aggregable()
        })
        .map(|(qid, _)| qid.clone())
        .collect()
}
