//! Category weight composition.
//!
//! ```text
//! weights = mood row (or default)
//!         ⊗ time row   (shared: ×1.5, time-only: inserted at ×0.3)
//!         ⊗ repetition (last N picks: >3 → ×0.3, 2–3 → ×0.7)
//!         → normalized to sum 1
//! ```
//!
//! When every mood category also appears in the time row the uniform ×1.5
//! cancels during normalization, so the mood ratios survive unchanged.

use std::collections::BTreeMap;

use tracing::trace;

use crate::schema::{Category, Mood};
use crate::tables::{DEFAULT_MOOD_WEIGHTS, TimeBucket, mood_weights, time_weights};

const SHARED_TIME_BOOST: f64 = 1.5;
const TIME_ONLY_SHARE: f64 = 0.3;
const HEAVY_REPEAT_FACTOR: f64 = 0.3;
const LIGHT_REPEAT_FACTOR: f64 = 0.7;

/// Category → weight.  Iterates in [`Category`] declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryWeights(BTreeMap<Category, f64>);

impl CategoryWeights {
    pub fn from_pairs(pairs: &[(Category, f64)]) -> Self {
        Self(pairs.iter().copied().collect())
    }

    pub fn get(&self, category: Category) -> Option<f64> {
        self.0.get(&category).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        self.0.iter().map(|(c, w)| (*c, *w))
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fold the time-of-day row into the mood weights.
    pub fn apply_time(&mut self, row: &[(Category, f64)]) {
        for &(category, weight) in row {
            self.0
                .entry(category)
                .and_modify(|w| *w *= SHARED_TIME_BOOST)
                .or_insert(weight * TIME_ONLY_SHARE);
        }
    }

    /// Damp categories that dominated the recent picks.
    pub fn apply_repetition(&mut self, recent: impl IntoIterator<Item = Category>) {
        let mut counts: BTreeMap<Category, usize> = BTreeMap::new();
        for category in recent {
            *counts.entry(category).or_default() += 1;
        }
        for (category, weight) in self.0.iter_mut() {
            *weight *= repetition_factor(counts.get(category).copied().unwrap_or(0));
        }
    }

    /// Scale so the weights sum to 1.  A map with no positive mass is left
    /// untouched; callers never produce one from the static tables.
    pub fn normalize(&mut self) {
        let total = self.total();
        if total > 0.0 && total.is_finite() {
            for weight in self.0.values_mut() {
                *weight /= total;
            }
        }
    }
}

fn repetition_factor(count: usize) -> f64 {
    match count {
        0 | 1 => 1.0,
        2 | 3 => LIGHT_REPEAT_FACTOR,
        _ => HEAVY_REPEAT_FACTOR,
    }
}

/// Compose the normalized category distribution for one selection.
///
/// * `recent` – categories of the user's newest history records (already
///   limited to the repetition window); empty for anonymous callers.
pub fn compose(
    mood: Mood,
    bucket: TimeBucket,
    recent: impl IntoIterator<Item = Category>,
) -> CategoryWeights {
    let mut weights = CategoryWeights::from_pairs(mood_weights(mood).unwrap_or(DEFAULT_MOOD_WEIGHTS));
    weights.apply_time(time_weights(bucket));
    weights.apply_repetition(recent);
    weights.normalize();
    trace!(mood = mood.slug(), bucket = bucket.label(), ?weights, "composed category weights");
    weights
}
