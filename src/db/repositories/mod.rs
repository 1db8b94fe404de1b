//! Per-entity persistence adapters.
//!
//! Each submodule is a thin capability interface over one table: parameters
//! are always bound (never string-interpolated), and multi-row writes are
//! expected to run inside a caller-managed transaction (the sync
//! orchestrator opens one transaction per session file).

pub mod entities;
pub mod extraction_state;
pub mod links;
pub mod messages;
pub mod sessions;
pub mod tool_uses;
