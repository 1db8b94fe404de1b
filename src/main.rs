//! CLI entry point for memory-nexus.
//!
//! # Architecture overview
//!
//! `main.rs` is the thin coordination layer between the CLI surface and the
//! library crate: parse arguments with `clap`, load configuration, run the
//! startup recovery scan, dispatch to the matching library call, and map the
//! result to a process exit code via `MemoryNexusError::exit_code()`.
//!
//! The `hook` subcommand is the one exception — it never opens the database
//! itself (the detached child it spawns does), and its exit code is always
//! 0 regardless of what happened inside.

use std::io::Read as _;
use std::path::PathBuf;

use clap::{Parser as ClapParser, Subcommand};

use memory_nexus::config::{self, Config};
use memory_nexus::db::repositories::extraction_state;
use memory_nexus::db::Connection as DbConnection;
use memory_nexus::error::MemoryNexusError;
use memory_nexus::logging::{self, LogWriter};
use memory_nexus::search;
use memory_nexus::stats;
use memory_nexus::sync::{self, discover, FileOutcome};
use memory_nexus::{export, hook};

#[derive(ClapParser)]
#[command(
    name = "memory-nexus",
    about = "Turn host coding-assistant session logs into a persistent, searchable knowledge base"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync session files into the database
    Sync {
        /// Sync only this session id
        #[arg(long)]
        session: Option<String>,
        /// Sync only this project (the host session directory name)
        #[arg(long)]
        project: Option<String>,
        /// Resync even if the file is unchanged since last sync
        #[arg(long)]
        force: bool,
        /// Suppress per-file progress output
        #[arg(long)]
        quiet: bool,
    },
    /// Full-text search over synced messages
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long = "role")]
        role: Vec<String>,
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        before: Option<String>,
        #[arg(long = "case-sensitive")]
        case_sensitive: bool,
    },
    /// Aggregate counts and per-project breakdown
    Stats {
        #[arg(long)]
        project_limit: Option<i64>,
    },
    /// Hook-install state, pending sessions, and last sync time
    Status,
    /// Register the host lifecycle hook (host settings editor, out of scope here)
    Install,
    /// Remove the host lifecycle hook (host settings editor, out of scope here)
    Uninstall {
        #[arg(long)]
        restore: bool,
    },
    /// Write a JSON snapshot of the whole database
    Export { path: PathBuf },
    /// Restore a JSON snapshot into the database
    Import {
        path: PathBuf,
        #[arg(long = "clear-existing")]
        clear_existing: bool,
    },
    /// Host lifecycle hook entry point; reads one JSON payload from stdin
    Hook,
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load();
    logging::init_tracing(config.log_level);

    let exit_code = run(cli, &config).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        e.exit_code()
    });
    std::process::exit(exit_code);
}

fn run(cli: Cli, config: &Config) -> Result<i32, MemoryNexusError> {
    let command = cli.command;
    if matches!(command, Command::Hook) {
        return Ok(run_hook(config));
    }

    let mut db = DbConnection::open(&config::db_path()?)?;
    run_startup_recovery(&mut db, config);

    match command {
        Command::Hook => unreachable!("handled above"),
        Command::Sync { session, project, force, quiet } => {
            run_sync(&mut db, session, project, force, quiet)
        }
        Command::Search {
            query,
            limit,
            project,
            role,
            session,
            since,
            before,
            case_sensitive,
        } => run_search(&db, query, limit, project, role, session, since, before, case_sensitive),
        Command::Stats { project_limit } => run_stats(&db, project_limit),
        Command::Status => run_status(&db, config),
        Command::Install => {
            println!(
                "install edits the host's own settings file, which is out of scope for this core; \
                 register the `hook` subcommand as the host's lifecycle hook manually."
            );
            Ok(0)
        }
        Command::Uninstall { restore: _ } => {
            println!(
                "uninstall edits the host's own settings file, which is out of scope for this core; \
                 remove the hook registration manually."
            );
            Ok(0)
        }
        Command::Export { path } => run_export(&db, &path),
        Command::Import { path, clear_existing } => run_import(&mut db, &path, clear_existing),
    }
}

fn run_hook(config: &Config) -> i32 {
    let mut input = String::new();
    let _ = std::io::stdin().read_to_string(&mut input);
    let log_writer = match config::log_path() {
        Ok(path) => LogWriter::new(path, config.log_level, config.log_retention_days),
        Err(_) => return 0,
    };
    let exe_path = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("memory-nexus"));
    hook::run(&input, config, &log_writer, &exe_path);
    0
}

/// Spec §4.9's startup recovery scan: re-enqueue any session file whose
/// `ExtractionState` is missing or `error`, regardless of which subcommand
/// was invoked. Failures here are swallowed — recovery is best-effort and
/// must never block the command the user actually asked for.
fn run_startup_recovery(db: &mut DbConnection, config: &Config) {
    if !config.recovery_on_startup {
        return;
    }
    let Ok(root) = config::session_root() else { return };
    let Ok(files) = sync::recoverable_files(db, &root) else { return };
    let now = now_rfc3339();
    for file in files {
        let session_id = discover::session_id_from_path(&file);
        let project_encoded = discover::project_dir_name(&root, &file).unwrap_or_default();
        let _ = sync::sync_file(db, &file, &session_id, &project_encoded, &now);
    }
}

fn run_sync(
    db: &mut DbConnection,
    session: Option<String>,
    project: Option<String>,
    force: bool,
    quiet: bool,
) -> Result<i32, MemoryNexusError> {
    let root = config::session_root()?;
    let now = now_rfc3339();

    if let Some(id) = session {
        let files = discover::session_files(&root);
        let path = files
            .iter()
            .find(|f| discover::session_id_from_path(f) == id)
            .ok_or_else(|| MemoryNexusError::FileNotFound(PathBuf::from(id.as_str())))?;
        if force {
            extraction_state::delete(db.raw(), &path.to_string_lossy().to_string())?;
        }
        let project_encoded = discover::project_dir_name(&root, path).unwrap_or_default();
        let outcome = sync::sync_file(db, path, &id, &project_encoded, &now)?;
        if !quiet {
            println!("{id}: {outcome:?}");
        }
        return Ok(if matches!(outcome, FileOutcome::Failed { .. }) { 6 } else { 0 });
    }

    if let Some(project_name) = project {
        let files: Vec<_> = discover::session_files(&root)
            .into_iter()
            .filter(|f| discover::project_dir_name(&root, f).as_deref() == Some(project_name.as_str()))
            .collect();
        let mut failed = 0;
        for file in &files {
            let session_id = discover::session_id_from_path(file);
            if force {
                extraction_state::delete(db.raw(), &file.to_string_lossy().to_string())?;
            }
            match sync::sync_file(db, file, &session_id, &project_name, &now)? {
                FileOutcome::Failed { error } => {
                    failed += 1;
                    if !quiet {
                        println!("{session_id}: failed ({error})");
                    }
                }
                outcome => {
                    if !quiet {
                        println!("{session_id}: {outcome:?}");
                    }
                }
            }
        }
        return Ok(if failed > 0 { 6 } else { 0 });
    }

    if force {
        for file in discover::session_files(&root) {
            extraction_state::delete(db.raw(), &file.to_string_lossy().to_string())?;
        }
    }
    let checkpoint_path = config::checkpoint_path()?;
    let summary = sync::sync_all(db, &root, &checkpoint_path, &now)?;
    if !quiet {
        println!(
            "synced: {} succeeded, {} failed, {} warnings",
            summary.succeeded, summary.failed, summary.warnings
        );
    }
    Ok(if summary.failed > 0 { 6 } else { 0 })
}

#[allow(clippy::too_many_arguments)]
fn run_search(
    db: &DbConnection,
    query: String,
    limit: Option<usize>,
    project: Option<String>,
    role: Vec<String>,
    session: Option<String>,
    since: Option<String>,
    before: Option<String>,
    case_sensitive: bool,
) -> Result<i32, MemoryNexusError> {
    let mut options = search::SearchOptions {
        project_filter: project,
        role_filter: role,
        session_filter: session,
        since,
        before,
        case_sensitive,
        ..search::SearchOptions::default()
    };
    if let Some(limit) = limit {
        options.limit = limit;
    }

    let results = search::search(db.raw(), &query, &options)?;
    for r in &results {
        println!("[{:.2}] {} {} ({}): {}", r.score, r.timestamp, r.session_id, r.role, r.snippet);
    }
    Ok(0)
}

fn run_stats(db: &DbConnection, project_limit: Option<i64>) -> Result<i32, MemoryNexusError> {
    let stats = stats::compute(db.raw(), project_limit.unwrap_or(10))?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(0)
}

fn run_status(db: &DbConnection, config: &Config) -> Result<i32, MemoryNexusError> {
    let root = config::session_root()?;
    let pending = sync::recoverable_files(db, &root)?.len();
    let last_sync = extraction_state::last_completed_at(db.raw())?;
    println!("autoSync: {}", config.auto_sync);
    println!("pendingSessions: {pending}");
    println!("lastSyncAt: {}", last_sync.as_deref().unwrap_or("never"));
    Ok(0)
}

fn run_export(db: &DbConnection, path: &std::path::Path) -> Result<i32, MemoryNexusError> {
    let doc = export::export(db.raw(), &now_rfc3339())?;
    let content = serde_json::to_string_pretty(&doc)?;
    std::fs::write(path, content)?;
    Ok(0)
}

fn run_import(db: &mut DbConnection, path: &std::path::Path, clear_existing: bool) -> Result<i32, MemoryNexusError> {
    let content =
        std::fs::read_to_string(path).map_err(|_| MemoryNexusError::FileNotFound(path.to_path_buf()))?;
    let doc = export::parse(&content)?;
    export::import(db.raw_mut(), &doc, clear_existing)?;
    Ok(0)
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
