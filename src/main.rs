mod config;
mod db;
mod id;
mod logging;
mod models;
mod store;
mod tui;
mod view;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use config::Config;
use db::{Database, KeyValueStore};
use models::{ApplicationRecord, NewApplication, Status, StatusFilter};
use std::path::PathBuf;
use store::Store;

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Track job applications - record, filter, and follow up")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new application
    Add {
        /// Company name
        company: String,

        /// Role or job title
        role: String,

        /// Initial status (applied, interviewing, offer, rejected)
        #[arg(short, long)]
        status: Option<Status>,

        /// Application date, defaults to today (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        /// Link to the posting
        #[arg(short, long, default_value = "")]
        link: String,

        /// Free-form notes
        #[arg(short, long, default_value = "")]
        notes: String,
    },

    /// List applications
    List {
        /// Filter by status (all, applied, interviewing, offer, rejected)
        #[arg(short, long, default_value = "all")]
        status: StatusFilter,

        /// Search company, role and notes
        #[arg(short = 'q', long, default_value = "")]
        search: String,

        /// Print the filtered records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show application details
    Show {
        /// Application ID or unique prefix
        id: String,
    },

    /// Change the status of an application
    Status {
        /// Application ID or unique prefix
        id: String,

        /// New status (applied, interviewing, offer, rejected)
        status: Status,
    },

    /// Delete an application
    Remove {
        /// Application ID or unique prefix
        id: String,
    },

    /// Browse applications interactively
    Browse {
        /// Initial filter (all, applied, interviewing, offer, rejected)
        #[arg(short, long, default_value = "all")]
        status: StatusFilter,

        /// Initial search query
        #[arg(short = 'q', long, default_value = "")]
        search: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Set the database location
    DatabasePath {
        /// Path to the SQLite database file
        path: PathBuf,
    },

    /// Set the default log filter (e.g. "info", "jobtrack=debug")
    LogFilter {
        /// tracing filter directive
        filter: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    logging::init(config.log_filter.as_deref())?;
    if let Err(e) = config::config_file_path() {
        tracing::warn!(error = %e, "no config directory; using default settings");
    }

    match cli.command {
        Commands::Add {
            company,
            role,
            status,
            date,
            link,
            notes,
        } => {
            let mut store = open_store(&config)?;
            let record = store.add(NewApplication {
                company,
                role,
                status,
                date,
                link,
                notes,
            })?;
            println!("Added application {} ({} at {})", record.id, record.role, record.company);
        }

        Commands::List {
            status,
            search,
            json,
        } => {
            let store = open_store(&config)?;
            let derived = view::derive(store.records(), status, &search);
            if json {
                println!("{}", serde_json::to_string_pretty(&derived.filtered)?);
                return Ok(());
            }

            if derived.filtered.is_empty() {
                println!("No applications found.");
            } else {
                println!("{:<10} {:<13} {:<24} {:<24} {:<10}", "ID", "STATUS", "COMPANY", "ROLE", "DATE");
                println!("{}", "-".repeat(85));
                for record in &derived.filtered {
                    println!(
                        "{:<10} {:<13} {:<24} {:<24} {:<10}",
                        short_id(&record.id),
                        record.status,
                        truncate(&record.company, 22),
                        truncate(&record.role, 22),
                        record.date
                    );
                }
            }
            let counts = derived.counts;
            println!(
                "\nAll: {}  Applied: {}  Interviewing: {}  Offer: {}  Rejected: {}",
                counts.all, counts.applied, counts.interviewing, counts.offer, counts.rejected
            );
        }

        Commands::Show { id } => {
            let store = open_store(&config)?;
            let record = resolve(&store, &id)?;
            println!("Application {}", record.id);
            println!("Company: {}", record.company);
            println!("Role: {}", record.role);
            println!("Status: {}", record.status);
            println!("Date: {}", record.date);
            if !record.link.is_empty() {
                println!("Link: {}", record.link);
            }
            if let Some(created) = chrono::DateTime::from_timestamp_millis(record.created_at) {
                println!(
                    "Created: {}",
                    created.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
                );
            }
            if !record.notes.is_empty() {
                println!("\n--- Notes ---\n{}", record.notes);
            }
        }

        Commands::Status { id, status } => {
            let mut store = open_store(&config)?;
            let record = resolve(&store, &id)?.clone();
            store.set_status(&record.id, status)?;
            println!("Marked {} at {} as {}.", record.role, record.company, status);
        }

        Commands::Remove { id } => {
            let mut store = open_store(&config)?;
            let record = resolve(&store, &id)?.clone();
            store.remove(&record.id)?;
            println!("Removed {} at {}.", record.role, record.company);
        }

        Commands::Browse { status, search } => {
            tui::run_browse(open_store(&config)?, status, search)?;
        }

        Commands::Config { command } => {
            run_config(&mut config, command)?;
        }
    }

    Ok(())
}

fn run_config(config: &mut Config, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            match config::config_file_path() {
                Ok(path) => println!("Config file: {}", path.display()),
                Err(e) => println!("Config file: ({})", e),
            }
            println!("Database: {}", config.database_path().display());
            println!(
                "Log filter: {}",
                config.log_filter.as_deref().unwrap_or("warn (default)")
            );
        }

        ConfigCommands::DatabasePath { path } => {
            config.database_path = Some(path);
            let saved = config.save()?;
            println!("Saved {}", saved.display());
        }

        ConfigCommands::LogFilter { filter } => {
            config.log_filter = Some(filter);
            let saved = config.save()?;
            println!("Saved {}", saved.display());
        }
    }
    Ok(())
}

fn open_store(config: &Config) -> Result<Store<Database>> {
    let db = Database::open(&config.database_path())?;
    let location = db.path().display().to_string();
    Store::open(db).with_context(|| format!("Failed to load applications from {}", location))
}

fn resolve<'a, B: KeyValueStore>(store: &'a Store<B>, id: &str) -> Result<&'a ApplicationRecord> {
    store
        .find_by_prefix(id)
        .ok_or_else(|| anyhow!("No application matches '{}' (unknown or ambiguous id)", id))
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
