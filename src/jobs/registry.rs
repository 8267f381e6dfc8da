// src/jobs/registry.rs

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;
use uuid::Uuid;

use crate::exec::PendingOperation;

/// Process-wide store mapping opaque job identifiers to pending operations.
///
/// Constructed once at startup and threaded explicitly through the request
/// handlers (no ambient global state). Entries are never evicted: completed
/// jobs stay resolvable for the life of the process, so the map grows
/// without bound. That matches the behaviour this service replaces and is
/// accepted here.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<String, PendingOperation>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an operation under a freshly generated identifier and return
    /// the identifier.
    ///
    /// Identifiers are random UUIDv4 strings, unique for the lifetime of
    /// the process. Safe to call concurrently from multiple in-flight
    /// requests.
    pub fn register(&self, op: PendingOperation) -> String {
        let id = Uuid::new_v4().to_string();
        let mut jobs = self.jobs.lock().unwrap();
        jobs.insert(id.clone(), op);
        debug!(job = %id, total = jobs.len(), "registered job");
        id
    }

    /// Look up a previously registered operation.
    ///
    /// Returns `None` for an unknown identifier; the caller maps that to a
    /// client error rather than a crash.
    pub fn lookup(&self, id: &str) -> Option<PendingOperation> {
        self.jobs.lock().unwrap().get(id).cloned()
    }

    /// Number of registered jobs (completed jobs included).
    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
