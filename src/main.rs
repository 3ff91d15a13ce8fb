mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use deskmate_core::DeskmateConfig;
use serde_json::{Value, json};
use tracing::error;

use commands::calendar::{CalendarAction, CalendarArgs};
use commands::content::ContentMethod;
use commands::recommend::RecommendMethod;

#[derive(Parser)]
#[command(name = "deskmate")]
#[command(about = "Offline-first calendar sync and interest-based recommendations")]
#[command(version)]
struct Cli {
    /// Directory holding the local databases (overrides config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read and write calendar events
    Calendar {
        #[arg(long, value_enum)]
        action: CalendarAction,

        /// First day of the range (YYYY-MM-DD)
        #[arg(long, alias = "start_date")]
        start_date: Option<String>,

        /// Last day of the range (YYYY-MM-DD)
        #[arg(long, alias = "end_date")]
        end_date: Option<String>,

        /// Event to update or delete (local or remote id)
        #[arg(long, alias = "event_id")]
        event_id: Option<String>,

        /// Event as JSON (Google Calendar event shape)
        #[arg(long, alias = "event_data")]
        event_data: Option<String>,
    },
    /// Browsing-history analysis and recommendations
    Recommend {
        #[arg(value_enum)]
        method: RecommendMethod,

        /// Number of recommendations to produce or return
        #[arg(long, default_value_t = 5)]
        limit: usize,

        /// Visits to record, as a JSON array ("-" reads stdin)
        #[arg(long)]
        visits: Option<String>,
    },
    /// Search for videos or news
    Content {
        #[arg(value_enum)]
        method: ContentMethod,

        #[arg(long)]
        query: String,

        #[arg(long, default_value_t = 3)]
        max_results: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            eprint!("{e}");
            let rendered = e.render().to_string();
            let message = rendered.lines().next().unwrap_or_default();
            return emit(json!({
                "success": false,
                "error": message.trim_start_matches("error: "),
            }));
        }
    };

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("{e:#}");
    }

    let result = match run(cli).await {
        Ok(value) => value,
        Err(e) => {
            error!("{:#}", e);
            json!({ "success": false, "error": format!("{e:#}") })
        }
    };

    emit(result)
}

async fn run(cli: Cli) -> Result<Value> {
    let mut config = DeskmateConfig::load()?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    match cli.command {
        Commands::Calendar {
            action,
            start_date,
            end_date,
            event_id,
            event_data,
        } => {
            let args = CalendarArgs {
                action,
                start_date,
                end_date,
                event_id,
                event_data,
            };
            commands::calendar::run(&config, args).await
        }
        Commands::Recommend {
            method,
            limit,
            visits,
        } => commands::recommend::run(&config, method, limit, visits),
        Commands::Content {
            method,
            query,
            max_results,
        } => commands::content::run(&config, method, &query, max_results).await,
    }
}

/// Print the one JSON value for this invocation. Exit status follows its
/// `success` field when it has one.
fn emit(value: Value) -> ExitCode {
    println!("{value}");

    if value.get("success").and_then(Value::as_bool) == Some(false) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Logs go to stderr so stdout only ever carries the result.
fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_env("DESKMATE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_calendar_flags() {
        let cli = Cli::try_parse_from([
            "deskmate",
            "calendar",
            "--action",
            "get_events",
            "--start_date",
            "2025-04-01",
            "--end-date",
            "2025-04-30",
        ])
        .unwrap();

        let Commands::Calendar {
            action,
            start_date,
            end_date,
            ..
        } = cli.command
        else {
            panic!("expected calendar command");
        };
        assert_eq!(action, CalendarAction::GetEvents);
        assert_eq!(start_date.as_deref(), Some("2025-04-01"));
        assert_eq!(end_date.as_deref(), Some("2025-04-30"));
    }

    #[test]
    fn test_parses_recommend_method() {
        let cli = Cli::try_parse_from(["deskmate", "-v", "recommend", "get_user_interests"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Recommend {
                method: RecommendMethod::GetUserInterests,
                limit: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_unknown_action() {
        assert!(Cli::try_parse_from(["deskmate", "calendar", "--action", "explode"]).is_err());
    }
}
