use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::schema::{Category, Mood};
use crate::store::UserState;

/// Engagement summary derived from one user's history and feedback.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserStats {
    pub total_messages: usize,
    pub favorite_category: Option<Category>,
    pub common_mood: Option<Mood>,
    /// `liked / max(history, 1)`.
    pub engagement_rate: f64,
    pub category_stats: BTreeMap<Category, usize>,
    pub mood_stats: BTreeMap<Mood, usize>,
    pub last_activity: Option<DateTime<Utc>>,
    pub liked: usize,
    pub disliked: usize,
}

impl UserStats {
    pub fn from_state(state: &UserState) -> Self {
        let mut category_stats = BTreeMap::new();
        let mut mood_stats = BTreeMap::new();
        for record in state.history.iter() {
            *category_stats.entry(record.category).or_default() += 1;
            *mood_stats.entry(record.mood).or_default() += 1;
        }

        let total_messages = state.history.len();
        let liked = state.feedback.liked().len();
        Self {
            total_messages,
            favorite_category: most_common(&category_stats),
            common_mood: most_common(&mood_stats),
            engagement_rate: liked as f64 / total_messages.max(1) as f64,
            last_activity: state.history.iter().map(|r| r.time).max(),
            category_stats,
            mood_stats,
            liked,
            disliked: state.feedback.disliked().len(),
        }
    }
}

/// Highest count wins; ties go to the key that sorts first.
fn most_common<K: Copy + Ord>(counts: &BTreeMap<K, usize>) -> Option<K> {
    counts
        .iter()
        .fold(None, |best: Option<(K, usize)>, (&key, &count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((key, count)),
        })
        .map(|(key, _)| key)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::schema::{FeedbackKind, SelectionRecord};
    use crate::store::StoreLimits;

    fn push(state: &mut UserState, category: Category, mood: Mood, minutes_ago: i64) {
        state.history.append(SelectionRecord {
            message: format!("{category:?}"),
            category,
            mood,
            time: Utc::now() - Duration::minutes(minutes_ago),
        });
    }

    #[test]
    fn empty_state_has_zero_engagement() {
        let stats = UserStats::from_state(&UserState::empty(StoreLimits::default()));
        assert_eq!(stats.total_messages, 0);
        assert_eq!(stats.favorite_category, None);
        assert_eq!(stats.common_mood, None);
        assert_eq!(stats.engagement_rate, 0.0);
        assert_eq!(stats.last_activity, None);
    }

    #[test]
    fn counts_favorites_and_engagement() {
        let mut state = UserState::empty(StoreLimits::default());
        push(&mut state, Category::Focus, Mood::Focused, 30);
        push(&mut state, Category::Sleep, Mood::Calm, 20);
        push(&mut state, Category::Focus, Mood::Calm, 10);
        push(&mut state, Category::Gratitude, Mood::Calm, 5);
        state.feedback.record(FeedbackKind::Like, "nice".into());
        state.feedback.record(FeedbackKind::Dislike, "meh".into());

        let stats = UserStats::from_state(&state);
        assert_eq!(stats.total_messages, 4);
        assert_eq!(stats.favorite_category, Some(Category::Focus));
        assert_eq!(stats.common_mood, Some(Mood::Calm));
        assert_eq!(stats.category_stats.get(&Category::Focus), Some(&2));
        assert_eq!(stats.mood_stats.get(&Mood::Calm), Some(&3));
        assert!((stats.engagement_rate - 0.25).abs() < 1e-12);
        assert_eq!(stats.liked, 1);
        assert_eq!(stats.disliked, 1);
        assert_eq!(stats.last_activity, state.history.last().map(|r| r.time));
    }

    #[test]
    fn ties_resolve_to_declaration_order() {
        let mut counts = BTreeMap::new();
        counts.insert(Category::Sleep, 2);
        counts.insert(Category::Relaxation, 2);
        assert_eq!(most_common(&counts), Some(Category::Relaxation));
    }

    #[test]
    fn engagement_without_history_uses_denominator_one() {
        let mut state = UserState::empty(StoreLimits::default());
        state.feedback.record(FeedbackKind::Like, "a".into());
        state.feedback.record(FeedbackKind::Like, "b".into());
        assert_eq!(UserStats::from_state(&state).engagement_rate, 2.0);
    }
}
