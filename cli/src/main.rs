//! `email-triage`: classify recent mail, draft replies, and clean up noise.

mod adapters;
mod commands;
mod config;
mod prompt;
#[cfg(test)]
mod testing;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use commands::scan::ScanOptions;
use config::{AppConfig, MAX_INBOX_HOURS, MAX_SENT_DAYS};

#[derive(Parser)]
#[command(name = "email-triage")]
#[command(about = "Find the emails that need a reply, draft responses, and queue noise for deletion")]
struct Cli {
    /// Config file (defaults to ~/.config/email-triage/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and classify recent inbox mail, then write the reports
    Scan {
        /// Classify a saved mailbox dump instead of fetching
        #[arg(long)]
        from_dump: Option<PathBuf>,
        /// Inbox lookback in hours
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=MAX_INBOX_HOURS))]
        hours: Option<i64>,
        /// Sent-mail lookback in days
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=MAX_SENT_DAYS))]
        days: Option<i64>,
    },
    /// Draft and send replies for the last scan, one by one
    Respond {
        /// Sent-mail lookback in days
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=MAX_SENT_DAYS))]
        days: Option<i64>,
    },
    /// Sort recent inbox mail into sponsorship, business and other
    Categorize {
        /// Categorize a saved mailbox dump instead of fetching
        #[arg(long)]
        from_dump: Option<PathBuf>,
        /// Inbox lookback in hours
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=MAX_INBOX_HOURS))]
        hours: Option<i64>,
    },
    /// Rank the last categorization's business and sponsorship emails
    Opportunities,
    /// Review the deletion queue
    Tasks {
        #[command(subcommand)]
        action: TasksAction,
    },
    /// Delete the messages of approved tasks
    Sweep,
    /// Show the last scan grouped by topic
    Topics,
}

#[derive(Subcommand)]
enum TasksAction {
    /// List queued tasks
    List,
    /// Approve tasks for deletion
    Approve {
        /// Task numbers as shown by `tasks list`
        numbers: Vec<usize>,
        /// Approve every task still under review
        #[arg(long, conflicts_with = "numbers")]
        all: bool,
    },
}

fn init_tracing() {
    // RUST_LOG wins; the binary and the core both log under `email_triage`
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("email_triage=debug,info")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn dispatch(cli: Cli) -> email_triage::Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan { from_dump, hours, days } => {
            let options = ScanOptions {
                from_dump: from_dump.as_deref(),
                hours: hours.unwrap_or(config.triage.inbox_hours),
                days: days.unwrap_or(config.triage.sent_days),
            };
            commands::scan::run(&config, &options).await
        }
        Commands::Respond { days } => {
            commands::respond::run(&config, days.unwrap_or(config.triage.sent_days)).await
        }
        Commands::Categorize { from_dump, hours } => {
            let hours = hours.unwrap_or(config.triage.inbox_hours);
            commands::categorize::run(&config, from_dump.as_deref(), hours).await
        }
        Commands::Opportunities => commands::opportunities::run(&config).await,
        Commands::Tasks { action } => match action {
            TasksAction::List => commands::tasks::list(&config),
            TasksAction::Approve { numbers, all } => commands::tasks::approve(&config, &numbers, all),
        },
        Commands::Sweep => commands::sweep::run(&config).await,
        Commands::Topics => commands::topics::run(&config),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    info!("Starting email-triage ...");
    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
