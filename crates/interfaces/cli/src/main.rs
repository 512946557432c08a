mod cmds;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use uplift_config::AppConfig;
use uplift_engine::{FeedbackKind, PreferredLength};

#[derive(Debug, Parser)]
#[command(
    name = "uplift",
    version,
    about = "Adaptive motivational message selection"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = "config/default.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Pick one or more messages for a mood.
    Select {
        #[arg(long, default_value = "motivated")]
        mood: String,
        #[arg(long, default_value = "en")]
        language: String,
        /// Track history and feedback under this id.
        #[arg(long)]
        user: Option<String>,
        #[arg(long, value_enum, default_value = "any")]
        length: CliLength,
        /// Override the request time (RFC 3339).
        #[arg(long)]
        at: Option<String>,
        #[arg(long, default_value_t = 1)]
        count: usize,
        /// Print results as JSON lines.
        #[arg(long)]
        json: bool,
    },
    /// Record a like or dislike for a message.
    Feedback {
        #[arg(long)]
        user: String,
        #[arg(long, value_enum)]
        kind: CliFeedback,
        #[arg(long)]
        message: String,
    },
    /// Show engagement statistics for a user.
    Stats {
        #[arg(long)]
        user: String,
        #[arg(long)]
        json: bool,
    },
    /// Message catalog utilities.
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// Print the resolved configuration and check the catalog and store.
    Doctor,
}

#[derive(Debug, Subcommand)]
enum CatalogCommands {
    /// Validate a catalog file and summarise its coverage.
    Check {
        /// Defaults to `catalog.path` from the config.
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLength {
    Short,
    Medium,
    Long,
    Any,
}

impl From<CliLength> for PreferredLength {
    fn from(value: CliLength) -> Self {
        match value {
            CliLength::Short => PreferredLength::Short,
            CliLength::Medium => PreferredLength::Medium,
            CliLength::Long => PreferredLength::Long,
            CliLength::Any => PreferredLength::Any,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFeedback {
    Like,
    Dislike,
}

impl From<CliFeedback> for FeedbackKind {
    fn from(value: CliFeedback) -> Self {
        match value {
            CliFeedback::Like => FeedbackKind::Like,
            CliFeedback::Dislike => FeedbackKind::Dislike,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;

    // RUST_LOG wins; otherwise the configured level applies.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Select {
            mood,
            language,
            user,
            length,
            at,
            count,
            json,
        } => {
            let request = cmds::SelectRequest {
                mood,
                language,
                user,
                length: length.into(),
                at,
                count,
                json,
            };
            cmds::run_select(&config, request).await?;
        }
        Commands::Feedback { user, kind, message } => {
            cmds::run_feedback(&config, &user, kind.into(), &message).await?;
        }
        Commands::Stats { user, json } => {
            cmds::run_stats(&config, &user, json).await?;
        }
        Commands::Catalog { command } => match command {
            CatalogCommands::Check { path } => {
                let path = path.unwrap_or_else(|| PathBuf::from(&config.catalog.path));
                cmds::run_catalog_check(&path)?;
            }
        },
        Commands::Doctor => {
            cmds::run_doctor(&config, &cli.config).await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_select_with_defaults() {
        let cli = Cli::try_parse_from(["uplift", "select", "--mood", "calm"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config/default.toml"));
        match cli.command {
            Commands::Select {
                mood,
                language,
                user,
                count,
                json,
                ..
            } => {
                assert_eq!(mood, "calm");
                assert_eq!(language, "en");
                assert_eq!(user, None);
                assert_eq!(count, 1);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_feedback_and_catalog_check() {
        let cli = Cli::try_parse_from([
            "uplift",
            "--config",
            "alt.toml",
            "feedback",
            "--user",
            "u1",
            "--kind",
            "dislike",
            "--message",
            "Keep going.",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("alt.toml"));
        assert!(matches!(
            cli.command,
            Commands::Feedback { kind: CliFeedback::Dislike, .. }
        ));

        let cli = Cli::try_parse_from(["uplift", "catalog", "check", "--path", "c.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Catalog {
                command: CatalogCommands::Check { path: Some(_) }
            }
        ));
    }

    #[test]
    fn rejects_unknown_length() {
        assert!(Cli::try_parse_from(["uplift", "select", "--length", "huge"]).is_err());
    }
}
