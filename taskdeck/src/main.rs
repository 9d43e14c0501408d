//! taskdeck — local-first task list with cloud sync.
//!
//! Thin CLI over the sync engine. Without an identity (or without a
//! configured backend — this binary ships none) the engine runs
//! local-only against the JSON snapshot in the data directory.
//!
//! ```bash
//! cargo run --bin taskdeck -- add "write the report" --priority high
//! cargo run --bin taskdeck -- list
//! cargo run --bin taskdeck -- import backup.json --yes
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use taskdeck::config::{CliArgs, ClientConfig};
use taskdeck::remote::{NullRemote, UserId};
use taskdeck::storage::JsonFileStore;
use taskdeck::sync::SyncEngine;
use taskdeck::transfer::{self, parse_import};
use taskdeck_model::{NewTaskOptions, Priority, Task};

#[derive(clap::Parser, Debug)]
#[command(version, about = "Local-first task list with cloud sync")]
struct Cli {
    #[command(flatten)]
    args: CliArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Add a task.
    Add {
        /// Task text.
        text: String,
        /// Priority: low, medium, or high.
        #[arg(long)]
        priority: Option<String>,
        /// Schedule date (YYYY-MM-DD).
        #[arg(long)]
        due_date: Option<String>,
        /// Schedule time (HH:MM).
        #[arg(long)]
        due_time: Option<String>,
    },
    /// List all tasks, newest first.
    List,
    /// Flip a task's completion flag.
    Toggle {
        /// Task id (prefix of `list` output).
        id: String,
    },
    /// Delete a task.
    Delete {
        /// Task id.
        id: String,
    },
    /// Remove every completed task.
    ClearCompleted,
    /// Import tasks from a JSON file.
    Import {
        /// File containing a JSON array of tasks.
        path: PathBuf,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Export all tasks as indented JSON.
    Export {
        /// Output file (default: `tasks-export-<date>.json` in the
        /// configured export directory).
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();

    // Load and resolve configuration (CLI args > config file > defaults).
    let config = match ClientConfig::load(&cli.args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file, keeping stdout for command output.
    let _log_guard = init_logging(&cli.args.log_level, cli.args.log_file.as_deref());

    tracing::info!("taskdeck starting");

    let snapshot_path = config.snapshot_path().map_err(io::Error::other)?;
    let store = Arc::new(JsonFileStore::new(snapshot_path));
    let engine = SyncEngine::new(Arc::new(NullRemote), store);
    engine
        .set_user(config.user_id.clone().map(UserId::new))
        .await;

    run_command(&engine, cli.command, &config).await?;

    tracing::info!("taskdeck exiting");
    Ok(())
}

async fn run_command(
    engine: &SyncEngine<NullRemote, JsonFileStore>,
    command: Command,
    config: &ClientConfig,
) -> io::Result<()> {
    match command {
        Command::Add {
            text,
            priority,
            due_date,
            due_time,
        } => {
            let options = NewTaskOptions {
                due_date,
                due_time,
                priority: Some(Priority::coerce(priority.as_deref())),
                attachments: Vec::new(),
            };
            engine.add_task(&text, options).await;
            println!("Added. {} task(s) total.", engine.snapshot().tasks.len());
        }
        Command::List => {
            let state = engine.snapshot();
            if state.tasks.is_empty() {
                println!("No tasks.");
            } else {
                for task in &state.tasks {
                    println!("{}", format_task_line(task));
                }
            }
        }
        Command::Toggle { id } => {
            let Some(id) = resolve_id(engine, &id) else {
                eprintln!("No task matches id '{id}'.");
                return Ok(());
            };
            engine.toggle_task(&id).await;
        }
        Command::Delete { id } => {
            let Some(id) = resolve_id(engine, &id) else {
                eprintln!("No task matches id '{id}'.");
                return Ok(());
            };
            engine.delete_task(&id).await;
            println!("Deleted.");
        }
        Command::ClearCompleted => {
            let before = engine.snapshot().tasks.len();
            engine.clear_completed().await;
            let removed = before - engine.snapshot().tasks.len();
            println!("Removed {removed} completed task(s).");
        }
        Command::Import { path, yes } => {
            let payload = tokio::fs::read_to_string(&path).await?;
            let batch = parse_import(&payload).map_err(io::Error::other)?;
            println!("{}", batch.summary());
            if !yes {
                println!("Re-run with --yes to confirm.");
                return Ok(());
            }
            let imported = engine.import_batch(batch).await;
            println!("Imported {imported} task(s).");
        }
        Command::Export { path } => {
            let state = engine.snapshot();
            let stats = transfer::export_stats(&state.tasks);
            let json = engine.export_json().map_err(io::Error::other)?;
            let path = path.unwrap_or_else(|| default_export_path(config));
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, json).await?;
            println!(
                "Exported {} task(s) ({} completed, {} active) to {}",
                stats.total,
                stats.completed,
                stats.active,
                path.display()
            );
        }
    }
    Ok(())
}

/// Matches a full id or a unique id prefix against the current list.
fn resolve_id(engine: &SyncEngine<NullRemote, JsonFileStore>, input: &str) -> Option<String> {
    let state = engine.snapshot();
    if state.tasks.iter().any(|t| t.id == input) {
        return Some(input.to_string());
    }
    let mut matches = state.tasks.iter().filter(|t| t.id.starts_with(input));
    let first = matches.next()?;
    // Ambiguous prefixes match nothing.
    if matches.next().is_some() {
        return None;
    }
    Some(first.id.clone())
}

fn format_task_line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    let short_id: String = task.id.chars().take(8).collect();
    let mut line = format!(
        "[{mark}] {short_id}  {:<6}  {}",
        task.priority.to_string(),
        task.text
    );
    if let Some(date) = &task.due_date {
        line.push_str(&format!("  (due {date}"));
        if let Some(time) = &task.due_time {
            line.push_str(&format!(" {time}"));
        }
        line.push(')');
    }
    line
}

fn default_export_path(config: &ClientConfig) -> PathBuf {
    let file_name = format!("tasks-export-{}.json", chrono::Local::now().format("%Y-%m-%d"));
    match &config.export_dir {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskdeck.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
