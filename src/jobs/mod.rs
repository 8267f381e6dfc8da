// src/jobs/mod.rs

//! Job registry: identifier -> pending operation.
//!
//! A registration call returns immediately after storing the operation; a
//! later, independent poll request looks the identifier up and reports
//! whatever state the operation has reached.

pub mod registry;

pub use registry::JobRegistry;
