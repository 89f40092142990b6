//! Pairing engine: pair generation, resume filtering, and session progress
//!
//! A session presents every unordered 2-combination of catalog keys exactly
//! once, in a uniformly shuffled order. Returning respondents (matched by
//! email) get the same coverage minus the pairs they already answered.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{AnswerRecord, AnswerResult, RespondentIdentity};

/// Canonical unordered form of a pair: the two keys in lexicographic order.
///
/// Left/right presentation order never affects this key, so a pair answered
/// as (B, A) matches a generated pair (A, B).
pub fn canonical_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// One pair as presented: `left` and `right` are distinct catalog keys.
///
/// Orientation is fixed when the order is built, so re-fetching the current
/// pair within a trial is stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub left: String,
    pub right: String,
}

impl Pair {
    pub fn canonical(&self) -> (String, String) {
        canonical_pair(&self.left, &self.right)
    }
}

/// Generate the full randomized pair order for a catalog.
///
/// Produces every 2-combination of the given keys exactly once (no
/// self-pairs, no duplicates), shuffles the sequence uniformly, and
/// randomizes which item of each pair is presented on the left.
///
/// Fewer than two keys yields an empty order; the caller surfaces that as a
/// 0/0 "nothing to do" session rather than an error.
pub fn generate_pair_order<R: Rng + ?Sized>(keys: &[String], rng: &mut R) -> Vec<Pair> {
    use rand::seq::SliceRandom;

    let mut order = Vec::with_capacity(keys.len() * keys.len().saturating_sub(1) / 2);
    for i in 0..keys.len() {
        for j in (i + 1)..keys.len() {
            let (left, right) = if rng.gen_bool(0.5) {
                (keys[i].clone(), keys[j].clone())
            } else {
                (keys[j].clone(), keys[i].clone())
            };
            order.push(Pair { left, right });
        }
    }
    order.shuffle(rng);
    order
}

/// Remove pairs whose canonical form appears in `answered`.
///
/// Stable: survivors keep their relative order from the shuffled sequence.
/// Idempotent: filtering an already-filtered order with the same set is a
/// no-op.
pub fn filter_answered(order: Vec<Pair>, answered: &HashSet<(String, String)>) -> Vec<Pair> {
    order
        .into_iter()
        .filter(|pair| !answered.contains(&pair.canonical()))
        .collect()
}

/// Trial progress: answers recorded out of total pairs for this session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub index: usize,
    pub total: usize,
}

/// A live survey session for one respondent.
///
/// The pair order is fixed at creation (already shuffled and resume-filtered)
/// and the index only ever advances, by exactly one per recorded answer.
/// When the index reaches the total the session is terminally completed and
/// further submissions are rejected.
#[derive(Debug, Clone)]
pub struct SurveySession {
    identity: RespondentIdentity,
    source: Option<String>,
    order: Vec<Pair>,
    index: usize,
}

impl SurveySession {
    /// Create a session over an already-filtered pair order.
    ///
    /// An empty order produces a session that is completed from the start.
    pub fn new(identity: RespondentIdentity, source: Option<String>, order: Vec<Pair>) -> Self {
        Self {
            identity,
            source,
            order,
            index: 0,
        }
    }

    pub fn identity(&self) -> &RespondentIdentity {
        &self.identity
    }

    pub fn progress(&self) -> Progress {
        Progress {
            index: self.index,
            total: self.order.len(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.index >= self.order.len()
    }

    /// The pair currently awaiting judgment, None once completed
    pub fn current_pair(&self) -> Option<&Pair> {
        self.order.get(self.index)
    }

    /// Build the answer record for the current pair.
    ///
    /// Captures the pair identities and trial index before any advancement,
    /// so the record cannot race against the index increment. Returns None
    /// once the session is completed.
    pub fn build_record(&self, result: AnswerResult) -> Option<AnswerRecord> {
        let pair = self.current_pair()?;
        Some(AnswerRecord {
            id: uuid::Uuid::new_v4(),
            language: self.identity.language,
            first_name: self.identity.first_name.clone(),
            last_name: self.identity.last_name.clone(),
            email: self.identity.email.clone(),
            option_left: pair.left.clone(),
            option_right: pair.right.clone(),
            n_trials: self.index as i64,
            result,
            source: self.source.clone(),
            created_at: chrono::Utc::now(),
        })
    }

    /// Advance to the next pair after a successful answer write.
    ///
    /// Only call once persistence has succeeded. Returns false (and leaves
    /// the index untouched) if the session is already completed.
    pub fn advance(&mut self) -> bool {
        if self.is_completed() {
            return false;
        }
        self.index += 1;
        true
    }
}
