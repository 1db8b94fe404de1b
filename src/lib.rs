//! Turns a host coding-assistant's per-project session logs into a
//! persistent, searchable knowledge base.
//!
//! # Architecture overview
//!
//! `main.rs` is the thin CLI shell; everything else lives here so it can be
//! exercised directly in tests without going through a subprocess.
//!
//! - [`project_path`] / [`timestamp`] / [`event`] / [`stream_parser`]: decode
//!   a session file into a lazy stream of classified events.
//! - [`db`]: connection setup, migrations, and one repository module per
//!   entity in the data model.
//! - [`extraction`]: structural entity/link extraction (file mentions,
//!   session continuation) layered on top of the repositories.
//! - [`sync`]: the orchestrator tying the above together, per-file and
//!   across a whole session root, with crash-recovery checkpointing.
//! - [`search`] / [`stats`]: read-side services over the resulting schema.
//! - [`hook`]: the host lifecycle hook entry point (detached background sync).
//! - [`export`]: JSON snapshot/restore.
//! - [`config`] / [`logging`] / [`error`]: ambient configuration, structured
//!   logging, and the shared error taxonomy.

pub mod config;
pub mod db;
pub mod error;
pub mod event;
pub mod export;
pub mod extraction;
pub mod hook;
pub mod logging;
pub mod project_path;
pub mod search;
pub mod stats;
pub mod stream_parser;
pub mod sync;
pub mod timestamp;
