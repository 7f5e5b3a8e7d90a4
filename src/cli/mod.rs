pub mod output;
pub mod search;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use search::{parse_search_time, DateStyle};
use tracing::{level_filters::LevelFilter, warn};

use crate::{
    activity::ActivityLog,
    storage::{
        entities::{Entry, EntryId},
        open_storage, BackendKind, EntryStorage,
    },
    utils::{
        clock::DefaultClock,
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

/// Categories offered by default. Others are accepted as free tags.
pub const KNOWN_CATEGORIES: [&str; 5] =
    ["Work", "Personal", "Exercise", "Entertainment", "Other"];

const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "lifelog", version, long_about = None)]
#[command(about = "Log what you are doing and see where your time goes", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        env = "LIFELOG_DIR",
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        env = "LIFELOG_BACKEND",
        global = true,
        default_value_t = BackendKind::Json,
        help = "Storage backend. json keeps a single file, sqlite a transactional database"
    )]
    backend: BackendKind,
    #[arg(long, global = true, help = "Print logs to the console")]
    log: bool,
    #[arg(long = "log-filter", global = true, help = "Log level, overrides RUST_LOG")]
    log_filter: Option<LevelFilter>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Log what you are doing right now")]
    Log {
        activity: String,
        #[arg(
            short,
            long,
            default_value = "Other",
            help = "One of Work, Personal, Exercise, Entertainment, Other or any custom tag"
        )]
        category: String,
    },
    #[command(about = "Show the current activity and for how long it has been going on")]
    Status {},
    #[command(about = "List the most recent activities")]
    Recent {
        #[arg(short = 'n', long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
    },
    #[command(about = "Show time spent per category")]
    Stats {},
    #[command(about = "Find the activity logged closest to a moment")]
    Search {
        #[arg(
            help = "Moment to search around. Examples are \"yesterday 14:00\", \"1 hour ago\", \"15/03/2025\", \"2025-03-15T12:00:00Z\""
        )]
        when: String,
        #[arg(
            long,
            default_value_t = DateStyle::Uk,
            help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year"
        )]
        date_style: DateStyle,
    },
    #[command(about = "Delete an entry by id")]
    Delete { id: EntryId },
    #[command(about = "List every entry in chronological order")]
    Entries {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = args
        .dir
        .clone()
        .map_or_else(create_application_default_path, Ok)?;

    let logging_level = args
        .log_filter
        .or_else(|| args.log.then_some(LevelFilter::TRACE));
    enable_logging(CLI_PREFIX, &dir, logging_level, args.log)?;

    let storage = open_storage(args.backend, &dir).await?;
    let log = ActivityLog::new(storage, Box::new(DefaultClock));

    let result = process_command(&log, args.commands).await;
    let closed = log.close().await;
    result?;
    closed?;
    Ok(())
}

async fn process_command<S: EntryStorage>(log: &ActivityLog<S>, command: Commands) -> Result<()> {
    match command {
        Commands::Log { activity, category } => {
            let activity = activity.trim();
            if activity.is_empty() {
                return Err(Args::command()
                    .error(
                        clap::error::ErrorKind::ValueValidation,
                        "Activity can't be empty",
                    )
                    .into());
            }
            let entry = log
                .log_activity(activity, canonical_category(&category))
                .await?;
            println!(
                "Logged '{}' ({}) with id {}",
                entry.activity, entry.category, entry.id
            );
        }
        Commands::Status {} => {
            println!("{}", output::render_status(&log.current_status().await?));
        }
        Commands::Recent { limit } => {
            let entries = log.recent_activities(limit).await?;
            print_entries(&entries, entries.first().map(|e| e.id), log.now());
        }
        Commands::Stats {} => {
            let totals = log.category_totals().await?;
            let counts = log.category_counts().await?;
            if totals.is_empty() {
                println!("No data available for activity distribution");
            }
            for line in output::render_stats(&totals, &counts) {
                println!("{line}");
            }
        }
        Commands::Search { when, date_style } => {
            let target = parse_search_time(&when, date_style, Local::now())?;
            let latest_id = log.all_entries().await?.last().map(|e| e.id);
            match log.search_nearest(target).await? {
                Some(entry) => print_entries(&[entry], latest_id, log.now()),
                None => println!("No activities logged yet"),
            }
        }
        Commands::Delete { id } => {
            if log.delete_entry(id).await? {
                println!("Deleted entry {id}");
            } else {
                println!("Entry {id} not found");
            }
        }
        Commands::Entries {} => {
            let entries = log.all_entries().await?;
            print_entries(&entries, entries.last().map(|e| e.id), log.now());
        }
    }
    Ok(())
}

fn print_entries(entries: &[Entry], latest_id: Option<EntryId>, now: DateTime<Utc>) {
    if entries.is_empty() {
        println!("No activities logged yet");
        return;
    }
    for line in output::render_entries(entries, latest_id, now) {
        println!("{line}");
    }
}

/// Matches known categories case-insensitively so "work" and "Work" end up in the same bucket.
fn canonical_category(category: &str) -> String {
    let category = category.trim();
    if category.is_empty() {
        return "Other".to_string();
    }
    match KNOWN_CATEGORIES
        .iter()
        .find(|known| known.eq_ignore_ascii_case(category))
    {
        Some(known) => known.to_string(),
        None => {
            warn!("Category '{category}' is not one of {KNOWN_CATEGORIES:?}, keeping it as is");
            category.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::storage::BackendKind;

    use super::{canonical_category, Args, Commands};

    #[test]
    fn test_canonical_category() {
        assert_eq!(canonical_category("work"), "Work");
        assert_eq!(canonical_category(" EXERCISE "), "Exercise");
        assert_eq!(canonical_category("Gardening"), "Gardening");
        assert_eq!(canonical_category("  "), "Other");
    }

    #[test]
    fn test_parse_log_command() {
        let args = Args::parse_from([
            "lifelog", "--backend", "sqlite", "log", "coding", "-c", "Work",
        ]);
        assert_eq!(args.backend, BackendKind::Sqlite);
        assert!(matches!(
            args.commands,
            Commands::Log { ref activity, ref category }
                if activity == "coding" && category == "Work"
        ));
    }

    #[test]
    fn test_parse_defaults() {
        let args = Args::parse_from(["lifelog", "recent"]);
        assert!(matches!(args.commands, Commands::Recent { limit: 10 }));

        let args = Args::parse_from(["lifelog", "log", "reading"]);
        assert!(matches!(
            args.commands,
            Commands::Log { ref category, .. } if category == "Other"
        ));
    }
}
