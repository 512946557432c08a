use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

// ── Storage backend ───────────────────────────────────────────────────────────

/// Which persistence adapter backs the per-user stores.
///
/// | Backend  | Layout                                                        |
/// |----------|---------------------------------------------------------------|
/// | `jsonl`  | One directory per user: `history.jsonl` + `feedback.json`.    |
/// | `redb`   | Single embedded database with `history` / `feedback` tables.  |
/// | `memory` | In-process only; nothing survives a restart.                  |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Jsonl,
    Redb,
    Memory,
}

impl StorageBackend {
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonl" | "file" | "eventlog" => Some(Self::Jsonl),
            "redb" => Some(Self::Redb),
            "memory" | "mem" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum selection records kept per user (FIFO eviction).
    pub history_capacity: usize,
    /// Maximum entries in each of the liked / disliked lists.
    pub feedback_capacity: usize,
    /// How many of the newest history records feed the repetition penalty.
    pub recent_window: usize,
    /// Category retried when the requested one has no messages.
    /// A catalog may override this with its own `fallback_category`.
    pub fallback_category: String,
    /// Returned verbatim when neither the requested nor the fallback category
    /// has any message in the requested language.
    pub default_message: String,
    /// IANA timezone name used to derive the hour-of-day bucket.
    /// Falls back to UTC when the name is unrecognised.
    pub timezone: String,
    /// Fixed seed for the random source.  `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: 50,
            feedback_capacity: 20,
            recent_window: 10,
            fallback_category: "motivation".to_string(),
            default_message: "Every day is a new opportunity to grow and shine.".to_string(),
            timezone: "UTC".to_string(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "config/catalog.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// State directory.  `jsonl` keeps per-user files under it and `redb`
    /// keeps `state.redb` in it; a path ending in `.redb` names the database
    /// file directly.  Unused for `memory`.
    pub path: String,
}

pub const REDB_FILE_NAME: &str = "state.redb";

impl StorageConfig {
    /// Database file used by the `redb` backend.
    pub fn redb_file(&self) -> PathBuf {
        let path = Path::new(&self.path);
        if path.extension().is_some_and(|ext| ext == "redb") {
            path.to_path_buf()
        } else {
            path.join(REDB_FILE_NAME)
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Jsonl,
            path: ".uplift/state".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub catalog: CatalogConfig,
    pub storage: StorageConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        if let Ok(value) = env::var("UPLIFT_STORAGE_BACKEND") {
            match StorageBackend::from_label(&value) {
                Some(backend) => config.storage.backend = backend,
                None => anyhow::bail!("unknown UPLIFT_STORAGE_BACKEND '{value}'"),
            }
        }

        if let Ok(value) = env::var("UPLIFT_CATALOG_PATH") {
            if !value.is_empty() {
                config.catalog.path = value;
            }
        }

        if let Ok(value) = env::var("UPLIFT_SEED") {
            config.engine.seed = Some(value.trim().parse()?);
        }

        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
