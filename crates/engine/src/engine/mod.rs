//! The content selection engine: one request/response pipeline per call.
//!
//! ```text
//! context ─▶ compose weights ─▶ draw category ─▶ catalog lookup
//!         ─▶ rank by feedback ─▶ draw message ─▶ append history ─▶ result
//! ```
//!
//! Calls for the same user are serialized through a per-user async lock so
//! the bounded stores never see interleaved read-modify-write cycles.  Calls
//! for different users proceed independently.
//!
//! A user's slot lives only while a call holds it or while it has unsaved
//! changes; clean slots are dropped as the last call for that user returns.

mod stats;

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use anyhow::{Result, bail};
use chrono_tz::Tz;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uplift_config::EngineConfig;

use crate::catalog::{CatalogLookup, MessageCatalog};
use crate::composer::{CategoryWeights, compose};
use crate::persistence::{PersistenceAdapter, StoreError};
use crate::ranker::{FeedbackRanker, uniform};
use crate::sampler::{draw_category, draw_message};
use crate::schema::{
    Category, FeedbackKind, FeedbackSnapshot, LengthBucket, SelectionContext, SelectionMetadata,
    SelectionRecord, SelectionResult,
};
use crate::store::{StoreLimits, UserState};
use crate::tables::TimeBucket;

pub use stats::UserStats;

/// Resolved engine tunables.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub limits: StoreLimits,
    /// Newest history records considered by the repetition penalty.
    pub recent_window: usize,
    pub fallback_category: Category,
    pub default_message: String,
    pub timezone: Tz,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            limits: StoreLimits::default(),
            recent_window: 10,
            fallback_category: Category::Motivation,
            default_message: EngineConfig::default().default_message,
            timezone: chrono_tz::UTC,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let Some(fallback_category) = Category::from_label(&config.fallback_category) else {
            bail!(
                "engine.fallback_category '{}' is not a known category",
                config.fallback_category
            );
        };
        if config.default_message.trim().is_empty() {
            bail!("engine.default_message must not be empty");
        }
        let timezone: Tz = config.timezone.parse().unwrap_or_else(|_| {
            warn!(tz = %config.timezone, "unrecognised timezone, falling back to UTC");
            chrono_tz::UTC
        });
        Ok(Self {
            limits: StoreLimits {
                history: config.history_capacity,
                feedback: config.feedback_capacity,
            },
            recent_window: config.recent_window,
            fallback_category,
            default_message: config.default_message.clone(),
            timezone,
        })
    }
}

/// Per-user lock target.  Keeps the loaded state while calls are queued on
/// it, and past that only while a save is outstanding.
#[derive(Debug, Default)]
struct UserSlot {
    state: Option<UserState>,
    history_dirty: bool,
    feedback_dirty: bool,
}

pub struct ContentEngine<R = StdRng> {
    catalog: Arc<MessageCatalog>,
    settings: EngineSettings,
    fallback_category: Category,
    store: Arc<dyn PersistenceAdapter>,
    rng: StdMutex<R>,
    users: StdMutex<HashMap<String, Arc<Mutex<UserSlot>>>>,
}

impl ContentEngine<StdRng> {
    /// Engine with an entropy-seeded random source.
    pub fn new(
        catalog: Arc<MessageCatalog>,
        settings: EngineSettings,
        store: Arc<dyn PersistenceAdapter>,
    ) -> Self {
        Self::with_rng(catalog, settings, store, StdRng::from_entropy())
    }

    /// Build from `[engine]` config; a configured `seed` makes every draw
    /// reproducible.
    pub fn from_config(
        config: &EngineConfig,
        catalog: Arc<MessageCatalog>,
        store: Arc<dyn PersistenceAdapter>,
    ) -> Result<Self> {
        let settings = EngineSettings::from_config(config)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self::with_rng(catalog, settings, store, rng))
    }
}

impl<R: RngCore + Send> ContentEngine<R> {
    pub fn with_rng(
        catalog: Arc<MessageCatalog>,
        settings: EngineSettings,
        store: Arc<dyn PersistenceAdapter>,
        rng: R,
    ) -> Self {
        // A catalog-declared fallback wins over the configured one.
        let fallback_category = catalog
            .fallback_category()
            .unwrap_or(settings.fallback_category);
        if catalog.languages(fallback_category).next().is_none() {
            warn!(
                fallback = fallback_category.slug(),
                "fallback category has no messages; misses will return the default message"
            );
        }
        info!(
            backend = store.name(),
            fallback = fallback_category.slug(),
            messages = catalog.message_count(),
            "content engine ready"
        );
        Self {
            catalog,
            settings,
            fallback_category,
            store,
            rng: StdMutex::new(rng),
            users: StdMutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &MessageCatalog {
        &self.catalog
    }

    pub fn fallback_category(&self) -> Category {
        self.fallback_category
    }

    // ── Public operations ──────────────────────────────────────────────────

    /// Pick one message for `context`.  Never fails: catalog misses end in
    /// the default message and persistence problems only degrade the call.
    pub async fn select_message(&self, context: &SelectionContext) -> SelectionResult {
        let bucket = TimeBucket::at(context.time, self.settings.timezone);
        let Some(user_id) = context.user_id.as_deref() else {
            return self.pick(context, bucket, None);
        };

        let slot = self.slot(user_id);
        let result = {
            let mut guard = slot.lock().await;
            self.select_for_user(user_id, context, bucket, &mut guard).await
        };
        self.release(user_id, slot);
        result
    }

    async fn select_for_user(
        &self,
        user_id: &str,
        context: &SelectionContext,
        bucket: TimeBucket,
        slot: &mut UserSlot,
    ) -> SelectionResult {
        if !self.ensure_loaded(user_id, slot).await {
            // Degraded: run on throwaway state and persist nothing.
            let scratch = UserState::empty(self.settings.limits);
            return self.pick(context, bucket, Some(&scratch));
        }

        let Some(state) = slot.state.as_mut() else {
            return self.pick(context, bucket, None);
        };
        let result = self.pick(context, bucket, Some(&*state));
        state.history.append(SelectionRecord {
            message: result.message.clone(),
            category: result.category,
            mood: context.mood,
            time: context.time,
        });
        slot.history_dirty = true;
        self.flush(user_id, slot).await;
        result
    }

    /// Append `message` to the user's liked or disliked list.  Without a
    /// user id this is a no-op.
    pub async fn record_feedback(&self, user_id: Option<&str>, kind: FeedbackKind, message: &str) {
        let Some(user_id) = user_id else {
            debug!(?kind, "feedback without user id ignored");
            return;
        };
        if message.trim().is_empty() {
            debug!(user = user_id, ?kind, "blank feedback message ignored");
            return;
        }

        let slot = self.slot(user_id);
        {
            let mut guard = slot.lock().await;
            self.record_for_user(user_id, kind, message, &mut guard).await;
        }
        self.release(user_id, slot);
    }

    async fn record_for_user(
        &self,
        user_id: &str,
        kind: FeedbackKind,
        message: &str,
        slot: &mut UserSlot,
    ) {
        if !self.ensure_loaded(user_id, slot).await {
            warn!(user = user_id, ?kind, "feedback dropped: user state unavailable");
            return;
        }
        let Some(state) = slot.state.as_mut() else {
            return;
        };
        if let Some(evicted) = state.feedback.record(kind, message.to_string()) {
            debug!(user = user_id, ?kind, %evicted, "feedback list full, evicted oldest");
        }
        slot.feedback_dirty = true;
        self.flush(user_id, slot).await;
    }

    pub async fn get_stats(&self, user_id: &str) -> UserStats {
        self.with_state(user_id, UserStats::from_state)
            .await
            .unwrap_or_default()
    }

    /// Snapshot of the user's selection history, oldest first.
    pub async fn history(&self, user_id: &str) -> Vec<SelectionRecord> {
        self.with_state(user_id, |state| state.history.to_vec())
            .await
            .unwrap_or_default()
    }

    pub async fn feedback(&self, user_id: &str) -> FeedbackSnapshot {
        self.with_state(user_id, |state| state.feedback.snapshot())
            .await
            .unwrap_or_default()
    }

    /// Category distribution `select_message` would draw from for `context`,
    /// including the user's repetition damping.
    pub async fn category_weights(&self, context: &SelectionContext) -> CategoryWeights {
        let bucket = TimeBucket::at(context.time, self.settings.timezone);
        let Some(user_id) = context.user_id.as_deref() else {
            return self.weights_for(context, bucket, None);
        };
        self.with_state(user_id, |state| self.weights_for(context, bucket, Some(state)))
            .await
            .unwrap_or_else(|| self.weights_for(context, bucket, None))
    }

    /// Number of users whose slot is currently held in memory.
    pub fn cached_users(&self) -> usize {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // ── Pipeline ───────────────────────────────────────────────────────────

    fn weights_for(
        &self,
        context: &SelectionContext,
        bucket: TimeBucket,
        state: Option<&UserState>,
    ) -> CategoryWeights {
        let recent: Vec<Category> = state
            .map(|s| s.recent_categories(self.settings.recent_window).collect())
            .unwrap_or_default();
        compose(context.mood, bucket, recent)
    }

    fn pick(
        &self,
        context: &SelectionContext,
        bucket: TimeBucket,
        state: Option<&UserState>,
    ) -> SelectionResult {
        let weights = self.weights_for(context, bucket, state);

        let drawn = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            draw_category(&weights, &mut *rng)
        }
        .unwrap_or(self.fallback_category);

        let (category, message) = match self.catalog.lookup(
            drawn,
            self.fallback_category,
            &context.language,
            context.preferred_length,
        ) {
            CatalogLookup::Exhausted => (self.fallback_category, self.settings.default_message.clone()),
            CatalogLookup::Candidates { category, messages } => {
                let ranked = match state {
                    Some(s) => FeedbackRanker::new(&s.feedback.snapshot()).rank(&messages),
                    None => uniform(&messages),
                };
                let chosen = {
                    let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                    draw_message(&ranked, &mut *rng)
                };
                let message = chosen
                    .map(str::to_string)
                    .unwrap_or_else(|| self.settings.default_message.clone());
                (category, message)
            }
        };

        debug!(
            user = context.user_id.as_deref().unwrap_or("-"),
            mood = context.mood.slug(),
            bucket = bucket.label(),
            drawn = drawn.slug(),
            category = category.slug(),
            "message selected"
        );

        SelectionResult {
            metadata: SelectionMetadata {
                mood: context.mood,
                language: context.language.clone(),
                length: LengthBucket::of(&message),
                timestamp: context.time,
            },
            message,
            category,
        }
    }

    // ── Per-user state ─────────────────────────────────────────────────────

    fn slot(&self, user_id: &str) -> Arc<Mutex<UserSlot>> {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        users.entry(user_id.to_string()).or_default().clone()
    }

    /// Drop `slot` from the map when it is the entry for `user_id`, no other
    /// call holds it, and nothing is waiting to be written.
    fn release(&self, user_id: &str, slot: Arc<Mutex<UserSlot>>) {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(current) = users.get(user_id) else {
            return;
        };
        // One reference in the map, one here.
        if !Arc::ptr_eq(current, &slot) || Arc::strong_count(&slot) > 2 {
            return;
        }
        let clean = slot
            .try_lock()
            .map(|s| !s.history_dirty && !s.feedback_dirty)
            .unwrap_or(false);
        if clean {
            users.remove(user_id);
        }
    }

    /// Read-only view of a user's state.  Goes through the live slot when one
    /// exists (it may hold unsaved changes); otherwise reads the adapter
    /// directly without caching anything.
    async fn with_state<T>(&self, user_id: &str, read: impl FnOnce(&UserState) -> T) -> Option<T> {
        let live = self
            .users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned();

        let Some(slot) = live else {
            return match self.load(user_id).await {
                Ok(state) => Some(read(&state)),
                Err(err) => {
                    warn!(user = user_id, backend = self.store.name(), %err, "failed to load user state");
                    None
                }
            };
        };

        let result = {
            let mut guard = slot.lock().await;
            if self.ensure_loaded(user_id, &mut guard).await {
                guard.state.as_ref().map(read)
            } else {
                None
            }
        };
        self.release(user_id, slot);
        result
    }

    /// Make sure the slot holds the user's state.  Returns `false` when the
    /// adapter could not be read.
    async fn ensure_loaded(&self, user_id: &str, slot: &mut UserSlot) -> bool {
        if slot.state.is_some() {
            return true;
        }
        match self.load(user_id).await {
            Ok(state) => {
                debug!(
                    user = user_id,
                    history = state.history.len(),
                    liked = state.feedback.liked().len(),
                    disliked = state.feedback.disliked().len(),
                    "user state loaded"
                );
                slot.state = Some(state);
                true
            }
            Err(err) => {
                warn!(user = user_id, backend = self.store.name(), %err, "failed to load user state, continuing degraded");
                false
            }
        }
    }

    async fn load(&self, user_id: &str) -> Result<UserState, StoreError> {
        let history = self.store.load_history(user_id).await?;
        let feedback = self.store.load_feedback(user_id).await?;
        Ok(UserState::from_persisted(self.settings.limits, history, feedback))
    }

    /// Write dirty lists back.  Failures keep the dirty flag so the next call
    /// for this user retries.
    async fn flush(&self, user_id: &str, slot: &mut UserSlot) {
        let Some(state) = slot.state.as_ref() else {
            return;
        };
        if slot.history_dirty {
            match self.store.save_history(user_id, &state.history.to_vec()).await {
                Ok(()) => slot.history_dirty = false,
                Err(err) => {
                    warn!(user = user_id, backend = self.store.name(), %err, "failed to save history, will retry on next call");
                }
            }
        }
        if slot.feedback_dirty {
            match self.store.save_feedback(user_id, &state.feedback.snapshot()).await {
                Ok(()) => slot.feedback_dirty = false,
                Err(err) => {
                    warn!(user = user_id, backend = self.store.name(), %err, "failed to save feedback, will retry on next call");
                }
            }
        }
    }
}
