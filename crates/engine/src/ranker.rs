//! Feedback similarity ranking.
//!
//! Scoring model per candidate:
//! ```text
//! weight = max(1 · (1 + liked_sim) · (1 − 0.5 · disliked_sim), 0.1)
//! ```
//! where `liked_sim` / `disliked_sim` are the best token-overlap similarities
//! against the user's liked / disliked messages.  The floor keeps every
//! candidate reachable.

use std::collections::BTreeSet;

use tracing::trace;

use crate::schema::FeedbackSnapshot;

const BASE_WEIGHT: f64 = 1.0;
const DISLIKE_PENALTY: f64 = 0.5;
pub const MIN_WEIGHT: f64 = 0.1;

/// Common English stop words excluded from the token set.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "your", "all", "any",
    "can", "her", "was", "one", "our", "out", "has", "have", "this", "that",
    "with", "from", "they", "will", "what", "when", "who", "its", "into",
];

/// Lowercase, strip punctuation, split on whitespace, and drop short tokens
/// and stop words.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace())
        .collect();
    cleaned
        .split_whitespace()
        .filter(|t| t.chars().count() > 2)
        .filter(|t| !STOP_WORDS.contains(t))
        .map(String::from)
        .collect()
}

/// `|a ∩ b| / max(|a|, |b|)`; zero when both sets are empty.
pub fn overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let denom = a.len().max(b.len());
    if denom == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / denom as f64
}

pub fn similarity(a: &str, b: &str) -> f64 {
    overlap(&tokenize(a), &tokenize(b))
}

pub fn feedback_weight(liked_sim: f64, disliked_sim: f64) -> f64 {
    (BASE_WEIGHT * (1.0 + liked_sim) * (1.0 - DISLIKE_PENALTY * disliked_sim)).max(MIN_WEIGHT)
}

/// Pre-tokenized feedback lists, built once per selection.
pub struct FeedbackRanker {
    liked: Vec<BTreeSet<String>>,
    disliked: Vec<BTreeSet<String>>,
}

impl FeedbackRanker {
    pub fn new(feedback: &FeedbackSnapshot) -> Self {
        Self {
            liked: feedback.liked.iter().map(|m| tokenize(m)).collect(),
            disliked: feedback.disliked.iter().map(|m| tokenize(m)).collect(),
        }
    }

    pub fn weight(&self, message: &str) -> f64 {
        let tokens = tokenize(message);
        let liked_sim = best_match(&tokens, &self.liked);
        let disliked_sim = best_match(&tokens, &self.disliked);
        let weight = feedback_weight(liked_sim, disliked_sim);
        trace!(liked_sim, disliked_sim, weight, "ranked candidate");
        weight
    }

    pub fn rank<'a>(&self, candidates: &[&'a str]) -> Vec<(&'a str, f64)> {
        candidates.iter().map(|m| (*m, self.weight(m))).collect()
    }
}

fn best_match(tokens: &BTreeSet<String>, references: &[BTreeSet<String>]) -> f64 {
    references
        .iter()
        .map(|r| overlap(tokens, r))
        .fold(0.0, f64::max)
}

/// Uniform weights for anonymous callers.
pub fn uniform<'a>(candidates: &[&'a str]) -> Vec<(&'a str, f64)> {
    candidates.iter().map(|m| (*m, BASE_WEIGHT)).collect()
}
