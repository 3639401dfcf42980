use crate::{PersistedJobRecord, RunId};

/// Side effects requested by [`crate::update`], in the order they must run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write the record to durable storage before the transition returns.
    Persist(PersistedJobRecord),
    /// Ask the background scheduler for an execution window.
    RequestWindow,
    /// Drop any pending execution window request.
    WithdrawWindow,
    /// Signal the run's cancellation token.
    CancelWorker { run_id: RunId },
    /// The caller holding the window should drive this run.
    BeginRun { run_id: RunId },
    /// Tell the user the import finished.
    NotifyCompleted { total: u64 },
    /// Final result to report to the execution window.
    RunSettled { run_id: RunId, success: bool },
}
