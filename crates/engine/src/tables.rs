//! Static mood and time-of-day weight tables.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::schema::{Category, Mood};

/// Used when a mood has no table row (including [`Mood::Unknown`]).
pub const DEFAULT_MOOD_WEIGHTS: &[(Category, f64)] = &[
    (Category::Motivation, 0.4),
    (Category::Relaxation, 0.3),
    (Category::SelfImprovement, 0.3),
];

/// Partial category weights for a mood, or `None` when the mood has no row.
pub fn mood_weights(mood: Mood) -> Option<&'static [(Category, f64)]> {
    use Category::*;
    let row: &'static [(Category, f64)] = match mood {
        Mood::Happy => &[(Gratitude, 0.4), (Inspiration, 0.3), (Energy, 0.3)],
        Mood::Sad => &[
            (SelfImprovement, 0.3),
            (Relaxation, 0.3),
            (Confidence, 0.2),
            (Gratitude, 0.2),
        ],
        Mood::Anxious => &[(Relaxation, 0.5), (Mindfulness, 0.3), (Confidence, 0.2)],
        Mood::Motivated => &[(Motivation, 0.6), (Focus, 0.4)],
        Mood::Calm => &[(Mindfulness, 0.5), (Relaxation, 0.3), (Gratitude, 0.2)],
        Mood::Focused => &[(Focus, 0.7), (SelfImprovement, 0.3)],
        Mood::Grateful => &[(Gratitude, 0.8), (Morning, 0.2)],
        Mood::Energetic => &[(Energy, 0.6), (Motivation, 0.4)],
        Mood::Peaceful => &[(Relaxation, 0.4), (Mindfulness, 0.4), (Sleep, 0.2)],
        Mood::Inspired => &[(Inspiration, 0.6), (SelfImprovement, 0.4)],
        Mood::Unknown => return None,
    };
    Some(row)
}

/// Hour-of-day windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeBucket {
    /// 06:00 – 11:59
    Morning,
    /// 12:00 – 17:59
    Afternoon,
    /// 18:00 – 21:59
    Evening,
    /// 22:00 – 05:59, wraps midnight
    Night,
}

impl TimeBucket {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            18..=21 => Self::Evening,
            _ => Self::Night,
        }
    }

    /// Bucket for `time` as seen on the wall clock of `tz`.
    pub fn at(time: DateTime<Utc>, tz: Tz) -> Self {
        Self::from_hour(time.with_timezone(&tz).hour())
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Morning => "06:00-11:59",
            Self::Afternoon => "12:00-17:59",
            Self::Evening => "18:00-21:59",
            Self::Night => "22:00-05:59",
        }
    }
}

pub fn time_weights(bucket: TimeBucket) -> &'static [(Category, f64)] {
    use Category::*;
    match bucket {
        TimeBucket::Morning => &[(Morning, 0.7), (Motivation, 0.3)],
        TimeBucket::Afternoon => &[(Focus, 0.4), (Motivation, 0.3), (SelfImprovement, 0.3)],
        TimeBucket::Evening => &[(Evening, 0.5), (Relaxation, 0.3), (Gratitude, 0.2)],
        TimeBucket::Night => &[(Sleep, 0.6), (Relaxation, 0.4)],
    }
}
