// src/exec/mod.rs

//! Process execution layer.
//!
//! This module launches the external conversion tool with
//! `tokio::process::Command` and exposes the result as a
//! [`PendingOperation`]: an asynchronous unit of work that settles exactly
//! once into success (with the collected stdout) or failure (with a typed
//! reason).
//!
//! - [`runner`] owns the spawn / stdout accumulation / timeout race.
//! - [`operation`] holds the settle-exactly-once state cell that pollers
//!   observe through the job registry.

pub mod operation;
pub mod runner;

pub use operation::{ExecError, OperationState, PendingOperation, SettleCell};
pub use runner::{effective_timeout_ms, run, RunSpec, DEFAULT_TIMEOUT_MS};
