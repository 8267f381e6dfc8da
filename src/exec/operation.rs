// src/exec/operation.rs

use thiserror::Error;
use tokio::sync::watch;

/// Why a process run failed.
///
/// These are the only failure causes surfaced to a poller. The messages are
/// what the HTTP layer reports verbatim.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecError {
    /// The platform could not start the process (e.g. command not found).
    #[error("failed to spawn '{command}': {message}")]
    Spawn { command: String, message: String },

    /// The process ran longer than the configured limit and its process
    /// group was killed.
    #[error("process timed out after {secs} seconds")]
    Timeout { secs: f64 },

    /// The process completed but signalled failure via its exit code.
    #[error("process exited with non-zero code {code}")]
    NonZeroExit { code: i32 },
}

/// Settlement state of a [`PendingOperation`].
///
/// Transitions exactly once from `Pending` to one of the terminal states and
/// never regresses; [`SettleCell::settle`] enforces the guard.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationState {
    Pending,
    /// Exit code 0; carries the full stdout buffer, chunks concatenated in
    /// arrival order.
    Succeeded(String),
    Failed(ExecError),
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationState::Pending)
    }
}

/// Handle to an asynchronous unit of work started by [`crate::exec::run`].
///
/// Cheap to clone; every clone observes the same settlement. The registry
/// stores one of these per job so a later, independent request can observe
/// the outcome.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    rx: watch::Receiver<OperationState>,
}

impl PendingOperation {
    /// Non-blocking snapshot of the current state.
    pub fn state(&self) -> OperationState {
        self.rx.borrow().clone()
    }

    /// Suspend until the operation has settled, then return the terminal
    /// state. When this resolves, no further output will arrive and the
    /// state is final.
    pub async fn settled(&self) -> OperationState {
        let mut rx = self.rx.clone();
        loop {
            let current = rx.borrow_and_update().clone();
            if current.is_terminal() {
                return current;
            }
            if rx.changed().await.is_err() {
                // Writer gone; whatever is in the cell is what we get.
                return rx.borrow().clone();
            }
        }
    }
}

/// Single-writer settlement cell backing a [`PendingOperation`].
///
/// The timeout timer and the process-exit path are independent concurrent
/// sources, so `settle` refuses any transition out of a terminal state.
#[derive(Debug)]
pub struct SettleCell {
    tx: watch::Sender<OperationState>,
}

impl SettleCell {
    /// Create a fresh pending operation and the cell that settles it.
    pub fn new() -> (SettleCell, PendingOperation) {
        let (tx, rx) = watch::channel(OperationState::Pending);
        (SettleCell { tx }, PendingOperation { rx })
    }

    /// Settle the operation. Returns `true` if this call performed the
    /// transition, `false` if the operation had already settled (in which
    /// case `state` is discarded).
    pub fn settle(&self, state: OperationState) -> bool {
        let mut slot = Some(state);
        self.tx.send_if_modified(|current| {
            if current.is_terminal() {
                return false;
            }
            match slot.take() {
                Some(next) => {
                    *current = next;
                    true
                }
                None => false,
            }
        })
    }
}
