use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};

use uplift_config::AppConfig;
use uplift_engine::{
    Category, ContentEngine, FeedbackKind, MessageCatalog, Mood, PreferredLength,
    SelectionContext, open_adapter,
};

pub(crate) struct SelectRequest {
    pub mood: String,
    pub language: String,
    pub user: Option<String>,
    pub length: PreferredLength,
    pub at: Option<String>,
    pub count: usize,
    pub json: bool,
}

fn build_engine(config: &AppConfig) -> Result<ContentEngine> {
    let catalog = Arc::new(MessageCatalog::load(&config.catalog.path)?);
    let store = open_adapter(&config.storage)?;
    ContentEngine::from_config(&config.engine, catalog, store)
}

fn parse_time(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("invalid --at timestamp '{raw}' (expected RFC 3339)"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

pub(crate) async fn run_select(config: &AppConfig, request: SelectRequest) -> Result<()> {
    let engine = build_engine(config)?;
    let mood = Mood::from_label(&request.mood);
    if mood == Mood::Unknown {
        tracing::warn!(mood = %request.mood, "unrecognised mood, using default weights");
    }

    let mut context = SelectionContext::new(mood, request.language)
        .at(parse_time(request.at.as_deref())?)
        .with_length(request.length);
    if let Some(user) = request.user {
        context = context.for_user(user);
    }

    for _ in 0..request.count.max(1) {
        let result = engine.select_message(&context).await;
        if request.json {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            println!(
                "[{} · {}] {}",
                result.category.slug(),
                result.metadata.length.label(),
                result.message
            );
        }
    }
    Ok(())
}

pub(crate) async fn run_feedback(
    config: &AppConfig,
    user: &str,
    kind: FeedbackKind,
    message: &str,
) -> Result<()> {
    if message.trim().is_empty() {
        bail!("feedback message must not be empty");
    }
    let engine = build_engine(config)?;
    engine.record_feedback(Some(user), kind, message).await;
    let snapshot = engine.feedback(user).await;
    println!(
        "feedback recorded for {user}: liked={} disliked={}",
        snapshot.liked.len(),
        snapshot.disliked.len()
    );
    Ok(())
}

pub(crate) async fn run_stats(config: &AppConfig, user: &str, json: bool) -> Result<()> {
    let engine = build_engine(config)?;
    let stats = engine.get_stats(user).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("── stats for {user} ─────────────────────────────────");
    println!("  total_messages    : {}", stats.total_messages);
    println!(
        "  favorite_category : {}",
        stats.favorite_category.map(Category::slug).unwrap_or("(none)")
    );
    println!(
        "  common_mood       : {}",
        stats.common_mood.map(Mood::slug).unwrap_or("(none)")
    );
    println!("  engagement_rate   : {:.2}", stats.engagement_rate);
    println!("  liked / disliked  : {} / {}", stats.liked, stats.disliked);
    println!(
        "  last_activity     : {}",
        stats
            .last_activity
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "(never)".to_string())
    );
    if !stats.category_stats.is_empty() {
        println!("  by category:");
        for (category, count) in &stats.category_stats {
            println!("    {:<18} {count}", category.slug());
        }
    }
    Ok(())
}

pub(crate) fn run_catalog_check(path: &Path) -> Result<()> {
    let catalog = MessageCatalog::load(path)?;
    println!("catalog {} is valid", path.display());
    println!("- messages: {}", catalog.message_count());
    if let Some(fallback) = catalog.fallback_category() {
        println!("- declared fallback: {}", fallback.slug());
    }

    let mut missing = Vec::new();
    for category in Category::ALL {
        let languages: Vec<&str> = catalog.languages(category).collect();
        if languages.is_empty() {
            missing.push(category.slug());
            continue;
        }
        let counts: Vec<String> = languages
            .iter()
            .map(|lang| format!("{lang}={}", catalog.messages(category, lang).len()))
            .collect();
        println!("  {:<18} {}", category.slug(), counts.join(" "));
    }
    if !missing.is_empty() {
        println!("- categories without messages: {}", missing.join(", "));
    }
    Ok(())
}

pub(crate) async fn run_doctor(config: &AppConfig, config_path: &Path) {
    println!("uplift doctor");
    println!(
        "- config file: {} ({})",
        config_path.display(),
        if config_path.exists() { "found" } else { "missing, using defaults" }
    );
    println!("- storage backend: {:?} at {}", config.storage.backend, config.storage.path);
    println!("- timezone: {}", config.engine.timezone);
    println!(
        "- capacities: history={} feedback={} recent_window={}",
        config.engine.history_capacity, config.engine.feedback_capacity, config.engine.recent_window
    );
    match config.engine.seed {
        Some(seed) => println!("- seed: {seed}"),
        None => println!("- seed: entropy"),
    }

    match MessageCatalog::load(&config.catalog.path) {
        Ok(catalog) => println!(
            "- catalog: {} ({} messages across {} categories)",
            config.catalog.path,
            catalog.message_count(),
            catalog.categories().count()
        ),
        Err(err) => println!("- catalog: {} FAILED: {err:#}", config.catalog.path),
    }

    match open_adapter(&config.storage) {
        Ok(store) => match store.load_history("doctor-probe").await {
            Ok(_) => println!("- store: {} readable", store.name()),
            Err(err) => println!("- store: {} FAILED: {err}", store.name()),
        },
        Err(err) => println!("- store: FAILED to open: {err:#}"),
    }
}
