use crate::bounded::BoundedQueue;
use crate::schema::{Category, FeedbackKind, FeedbackSnapshot, SelectionRecord};

/// Capacities for the per-user bounded stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    pub history: usize,
    pub feedback: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            history: 50,
            feedback: 20,
        }
    }
}

/// Liked and disliked messages, each capped independently.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackStore {
    liked: BoundedQueue<String>,
    disliked: BoundedQueue<String>,
}

impl FeedbackStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            liked: BoundedQueue::new(capacity),
            disliked: BoundedQueue::new(capacity),
        }
    }

    pub fn from_snapshot(capacity: usize, snapshot: FeedbackSnapshot) -> Self {
        Self {
            liked: BoundedQueue::from_items(capacity, snapshot.liked),
            disliked: BoundedQueue::from_items(capacity, snapshot.disliked),
        }
    }

    pub fn record(&mut self, kind: FeedbackKind, message: String) -> Option<String> {
        match kind {
            FeedbackKind::Like => self.liked.append(message),
            FeedbackKind::Dislike => self.disliked.append(message),
        }
    }

    pub fn liked(&self) -> &BoundedQueue<String> {
        &self.liked
    }

    pub fn disliked(&self) -> &BoundedQueue<String> {
        &self.disliked
    }

    pub fn snapshot(&self) -> FeedbackSnapshot {
        FeedbackSnapshot {
            liked: self.liked.to_vec(),
            disliked: self.disliked.to_vec(),
        }
    }
}

/// Everything the engine knows about one user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserState {
    pub history: BoundedQueue<SelectionRecord>,
    pub feedback: FeedbackStore,
}

impl UserState {
    pub fn empty(limits: StoreLimits) -> Self {
        Self {
            history: BoundedQueue::new(limits.history),
            feedback: FeedbackStore::new(limits.feedback),
        }
    }

    pub fn from_persisted(
        limits: StoreLimits,
        history: Vec<SelectionRecord>,
        feedback: FeedbackSnapshot,
    ) -> Self {
        Self {
            history: BoundedQueue::from_items(limits.history, history),
            feedback: FeedbackStore::from_snapshot(limits.feedback, feedback),
        }
    }

    /// Categories of the newest `window` selections, oldest first.
    pub fn recent_categories(&self, window: usize) -> impl Iterator<Item = Category> + '_ {
        self.history.recent(window).map(|record| record.category)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::schema::Mood;

    fn record(category: Category, n: usize) -> SelectionRecord {
        SelectionRecord {
            message: format!("message {n}"),
            category,
            mood: Mood::Calm,
            time: Utc::now(),
        }
    }

    #[test]
    fn persisted_state_is_trimmed_to_limits() {
        let history = (0..60).map(|n| record(Category::Focus, n)).collect();
        let feedback = FeedbackSnapshot {
            liked: (0..25).map(|n| format!("liked {n}")).collect(),
            disliked: vec!["meh".to_string()],
        };
        let state = UserState::from_persisted(StoreLimits::default(), history, feedback);
        assert_eq!(state.history.len(), 50);
        assert_eq!(state.history.iter().next().unwrap().message, "message 10");
        assert_eq!(state.feedback.liked().len(), 20);
        assert_eq!(state.feedback.liked().iter().next().unwrap(), "liked 5");
        assert_eq!(state.feedback.disliked().len(), 1);
    }

    #[test]
    fn feedback_lists_are_independent() {
        let mut store = FeedbackStore::new(2);
        store.record(FeedbackKind::Like, "a".into());
        store.record(FeedbackKind::Like, "b".into());
        assert_eq!(store.record(FeedbackKind::Like, "c".into()), Some("a".to_string()));
        store.record(FeedbackKind::Dislike, "x".into());
        let snapshot = store.snapshot();
        assert_eq!(snapshot.liked, vec!["b", "c"]);
        assert_eq!(snapshot.disliked, vec!["x"]);
    }

    #[test]
    fn recent_categories_respects_window() {
        let mut state = UserState::empty(StoreLimits::default());
        for (n, category) in [Category::Sleep, Category::Focus, Category::Focus]
            .into_iter()
            .enumerate()
        {
            state.history.append(record(category, n));
        }
        let recent: Vec<_> = state.recent_categories(2).collect();
        assert_eq!(recent, vec![Category::Focus, Category::Focus]);
    }
}
