// src/errors.rs

//! Crate-wide error aliases.
//!
//! Wiring-level code uses `anyhow`; the typed failure causes a poller sees
//! live in [`crate::exec::ExecError`].

pub use anyhow::{Error, Result};
