use crate::RunId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A caller asked for the job to run.
    RunRequested,
    /// The user asked to stop the job.
    CancelRequested,
    /// The scheduler granted an execution window.
    WindowOpened,
    /// Item worker progress for a run.
    Progress {
        run_id: RunId,
        downloaded: u64,
        total: u64,
        phase: String,
    },
    /// The scheduler revoked the window a run was executing in.
    WindowExpired { run_id: RunId },
    /// The item worker returned for a run.
    RunFinished { run_id: RunId, outcome: RunOutcome },
}

/// How the item worker call of a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Worker returned its final item count.
    Finished(u64),
    /// Worker failed; the message is kept verbatim.
    Failed(String),
    /// The run observed its cancellation token.
    Interrupted,
}
