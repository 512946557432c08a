use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Thematic message buckets.
///
/// Declaration order is significant: it is the iteration order of every
/// weight map and therefore the order the samplers walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Motivation,
    Relaxation,
    SelfImprovement,
    Focus,
    Gratitude,
    Morning,
    Evening,
    Energy,
    Mindfulness,
    Confidence,
    Inspiration,
    Sleep,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Self::Motivation,
        Self::Relaxation,
        Self::SelfImprovement,
        Self::Focus,
        Self::Gratitude,
        Self::Morning,
        Self::Evening,
        Self::Energy,
        Self::Mindfulness,
        Self::Confidence,
        Self::Inspiration,
        Self::Sleep,
    ];

    /// Snake-case slug used in catalog files, config, and log lines.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Motivation => "motivation",
            Self::Relaxation => "relaxation",
            Self::SelfImprovement => "self_improvement",
            Self::Focus => "focus",
            Self::Gratitude => "gratitude",
            Self::Morning => "morning",
            Self::Evening => "evening",
            Self::Energy => "energy",
            Self::Mindfulness => "mindfulness",
            Self::Confidence => "confidence",
            Self::Inspiration => "inspiration",
            Self::Sleep => "sleep",
        }
    }

    /// Parse a category from its slug (case-insensitive, `-` accepted for `_`).
    pub fn from_label(s: &str) -> Option<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|c| c.slug() == normalized)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Happy,
    Sad,
    Anxious,
    Motivated,
    Calm,
    Focused,
    Grateful,
    Energetic,
    Peaceful,
    Inspired,
    /// Any label outside the known set.  Composes with the default weights.
    #[serde(other)]
    Unknown,
}

impl Mood {
    pub fn slug(self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Anxious => "anxious",
            Self::Motivated => "motivated",
            Self::Calm => "calm",
            Self::Focused => "focused",
            Self::Grateful => "grateful",
            Self::Energetic => "energetic",
            Self::Peaceful => "peaceful",
            Self::Inspired => "inspired",
            Self::Unknown => "unknown",
        }
    }

    /// Never fails: unrecognised labels map to [`Mood::Unknown`].
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "happy" => Self::Happy,
            "sad" => Self::Sad,
            "anxious" => Self::Anxious,
            "motivated" => Self::Motivated,
            "calm" => Self::Calm,
            "focused" => Self::Focused,
            "grateful" => Self::Grateful,
            "energetic" => Self::Energetic,
            "peaceful" => Self::Peaceful,
            "inspired" => Self::Inspired,
            _ => Self::Unknown,
        }
    }
}

/// Character-count bucket of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthBucket {
    Short,
    Medium,
    Long,
}

impl LengthBucket {
    /// Accepted character-count range.  Ranges overlap on purpose.
    pub fn range(self) -> RangeInclusive<usize> {
        match self {
            Self::Short => 0..=100,
            Self::Medium => 80..=200,
            Self::Long => 150..=400,
        }
    }

    /// Classify a message by its character count (first matching range wins).
    pub fn of(message: &str) -> Self {
        match message.chars().count() {
            0..=100 => Self::Short,
            101..=200 => Self::Medium,
            _ => Self::Long,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

/// Caller preference for message length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredLength {
    Short,
    Medium,
    Long,
    #[default]
    #[serde(other)]
    Any,
}

impl PreferredLength {
    /// Unrecognised labels are treated as [`PreferredLength::Any`].
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Self::Short,
            "medium" => Self::Medium,
            "long" => Self::Long,
            _ => Self::Any,
        }
    }

    pub fn bucket(self) -> Option<LengthBucket> {
        match self {
            Self::Short => Some(LengthBucket::Short),
            Self::Medium => Some(LengthBucket::Medium),
            Self::Long => Some(LengthBucket::Long),
            Self::Any => None,
        }
    }
}

/// Input to one selection call.  Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionContext {
    pub mood: Mood,
    pub time: DateTime<Utc>,
    pub language: String,
    #[serde(default)]
    pub preferred_length: PreferredLength,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl SelectionContext {
    pub fn new(mood: Mood, language: impl Into<String>) -> Self {
        Self {
            mood,
            time: Utc::now(),
            language: language.into(),
            preferred_length: PreferredLength::Any,
            user_id: None,
        }
    }

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_length(mut self, preferred_length: PreferredLength) -> Self {
        self.preferred_length = preferred_length;
        self
    }
}

/// One past selection, appended to the user's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub message: String,
    pub category: Category,
    pub mood: Mood,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionMetadata {
    pub mood: Mood,
    pub language: String,
    pub length: LengthBucket,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub message: String,
    pub category: Category,
    pub metadata: SelectionMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Like,
    Dislike,
}

impl FeedbackKind {
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "like" | "liked" | "up" => Some(Self::Like),
            "dislike" | "disliked" | "down" => Some(Self::Dislike),
            _ => None,
        }
    }
}

/// Persisted form of a user's feedback lists, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSnapshot {
    #[serde(default)]
    pub liked: Vec<String>,
    #[serde(default)]
    pub disliked: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_label(category.slug()), Some(category));
        }
        assert_eq!(Category::from_label("Self-Improvement"), Some(Category::SelfImprovement));
        assert_eq!(Category::from_label("astrology"), None);
    }

    #[test]
    fn category_order_follows_declaration() {
        let mut sorted = Category::ALL;
        sorted.sort();
        assert_eq!(sorted, Category::ALL);
    }

    #[test]
    fn unknown_mood_label_maps_to_unknown() {
        assert_eq!(Mood::from_label("Happy"), Mood::Happy);
        assert_eq!(Mood::from_label("melancholic"), Mood::Unknown);
        let parsed: Mood = serde_json::from_str("\"melancholic\"").unwrap();
        assert_eq!(parsed, Mood::Unknown);
    }

    #[test]
    fn unknown_length_label_is_any() {
        assert_eq!(PreferredLength::from_label("SHORT"), PreferredLength::Short);
        assert_eq!(PreferredLength::from_label("tiny"), PreferredLength::Any);
        let parsed: PreferredLength = serde_json::from_str("\"tiny\"").unwrap();
        assert_eq!(parsed, PreferredLength::Any);
    }

    #[test]
    fn length_bucket_classifies_by_char_count() {
        assert_eq!(LengthBucket::of(""), LengthBucket::Short);
        assert_eq!(LengthBucket::of(&"a".repeat(100)), LengthBucket::Short);
        assert_eq!(LengthBucket::of(&"a".repeat(101)), LengthBucket::Medium);
        assert_eq!(LengthBucket::of(&"a".repeat(200)), LengthBucket::Medium);
        assert_eq!(LengthBucket::of(&"a".repeat(201)), LengthBucket::Long);
        assert_eq!(LengthBucket::of(&"a".repeat(900)), LengthBucket::Long);
        // Multi-byte characters count once.
        assert_eq!(LengthBucket::of(&"é".repeat(100)), LengthBucket::Short);
    }
}
