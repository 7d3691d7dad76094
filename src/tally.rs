//! # Answer Tally
//!
//! Counts how often each answer value was given to each aggregable question.
//!
//! Every requested question gets its own counter map up front, so a question nobody answered
//! still shows up as `{}`. Counts are a pure function of the inputs, and sorted maps keep the
//! serialized output stable between requests.
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::submissions::Submission;

pub type AnswerCounts = BTreeMap<String, u64>;
pub type AnswerTally = BTreeMap<String, AnswerCounts>;

pub fn tally(submissions: &[Submission], question_ids: &BTreeSet<String>) -> AnswerTally {
    let mut counts: AnswerTally = question_ids
        .iter()
        .map(|qid| (qid.clone(), AnswerCounts::new()))
        .collect();

    for submission in submissions {
        for (qid, question_counts) in counts.iter_mut() {
            let Some(answer) = submission.answers.get(qid) else {
                continue;
            };

            for value in answer.values() {
                *question_counts.entry(value).or_insert(0) += 1;
            }
        }
    }

    debug!(
        "Tallied {} submissions over {} questions",
        submissions.len(),
        counts.len()
    );

    counts
}
