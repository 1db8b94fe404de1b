//! Host lifecycle hook entry point.
//!
//! Reads one JSON payload from stdin, gates on config, and hands off to a
//! detached sync process. Per spec §4.10/§6, exit status MUST be 0
//! regardless of internal outcome — every branch here returns without
//! propagating an error; callers should not wrap this in `?`.

use std::fs::OpenOptions;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use serde::Deserialize;

use crate::config::{Config, LogLevel};
use crate::logging::{self, LogWriter};

#[derive(Debug, Deserialize)]
struct HookPayload {
    hook_event_name: String,
    #[serde(default)]
    session_id: Option<String>,
}

/// Run the hook end to end: parse `input`, gate on `config`, spawn a
/// detached `<exe_path> sync --session <id> --quiet`, and write one log
/// record through `log_writer`.
pub fn run(input: &str, config: &Config, log_writer: &LogWriter, exe_path: &Path) {
    let payload: HookPayload = match serde_json::from_str(input) {
        Ok(p) => p,
        Err(e) => {
            log_error(log_writer, "malformed hook payload", None, &e.to_string(), None);
            return;
        }
    };

    if payload.hook_event_name == "PreCompact" && !config.sync_on_compaction {
        return;
    }
    if !config.auto_sync {
        return;
    }

    let session_id = match payload.session_id.as_deref() {
        Some(id) if !id.is_empty() => id,
        _ => {
            let (level, record) = logging::now_record(
                LogLevel::Warn,
                format!("No session_id in {} hook input", payload.hook_event_name),
            )
            .hook_event(&payload.hook_event_name)
            .build();
            log_writer.write(level, &record);
            return;
        }
    };

    match spawn_detached(exe_path, session_id, log_writer.path()) {
        Ok(child) => {
            // Release the child reference immediately so this process can
            // exit without waiting on the detached sync.
            drop(child);
            let (level, record) = logging::now_record(LogLevel::Info, "sync triggered")
                .session_id(session_id)
                .hook_event(&payload.hook_event_name)
                .build();
            log_writer.write(level, &record);
        }
        Err(e) => {
            log_error(
                log_writer,
                "failed to spawn sync process",
                Some(session_id),
                &e.to_string(),
                Some(&payload.hook_event_name),
            );
        }
    }
}

fn log_error(
    log_writer: &LogWriter,
    message: &str,
    session_id: Option<&str>,
    error: &str,
    hook_event: Option<&str>,
) {
    let mut builder = logging::now_record(LogLevel::Error, message).error(error);
    if let Some(id) = session_id {
        builder = builder.session_id(id);
    }
    if let Some(event) = hook_event {
        builder = builder.hook_event(event);
    }
    let (level, record) = builder.build();
    log_writer.write(level, &record);
}

/// Spawn the sync binary detached, with stdio redirected to the append-only
/// log file so nothing is lost and nothing blocks this process's exit.
fn spawn_detached(exe_path: &Path, session_id: &str, log_path: &Path) -> std::io::Result<Child> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let stdout = OpenOptions::new().create(true).append(true).open(log_path)?;
    let stderr = stdout.try_clone()?;
    Command::new(exe_path)
        .args(["sync", "--session", session_id, "--quiet"])
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
}
