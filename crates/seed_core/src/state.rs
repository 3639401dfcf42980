use crate::{Effect, JobStatus, PersistedJobRecord};

pub type RunId = u64;

/// Why the cancellation flag was last raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    User,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobState {
    status: JobStatus,
    record: PersistedJobRecord,
    cancel: Option<CancelReason>,
    live_run: Option<RunId>,
    last_downloaded: u64,
    last_total: u64,
    next_run_id: RunId,
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of a fresh process, seeded from what the previous one persisted.
    pub fn restore(record: PersistedJobRecord) -> Self {
        Self {
            status: record.reconstruct_status(),
            record,
            ..Self::default()
        }
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    /// Mirror of the last record handed out for persistence.
    pub fn record(&self) -> &PersistedJobRecord {
        &self.record
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        self.cancel
    }

    /// The run currently allowed to report progress, if any.
    pub fn live_run(&self) -> Option<RunId> {
        self.live_run
    }

    /// A window may start a run: something is queued, or a `Running` status
    /// survived a relaunch without any work behind it.
    pub fn is_runnable(&self) -> bool {
        self.live_run.is_none() && self.status.is_active()
    }

    pub(crate) fn is_live(&self, run_id: RunId) -> bool {
        self.live_run == Some(run_id)
    }

    pub(crate) fn set_status(&mut self, status: JobStatus) {
        self.status = status;
    }

    pub(crate) fn persist(&mut self, record: PersistedJobRecord) -> Effect {
        self.record = record.clone();
        Effect::Persist(record)
    }

    pub(crate) fn begin_run(&mut self) -> RunId {
        self.next_run_id += 1;
        let run_id = self.next_run_id;
        self.live_run = Some(run_id);
        self.cancel = None;
        self.last_downloaded = 0;
        self.last_total = 0;
        run_id
    }

    /// Raises the cancellation flag and detaches the live run so none of its
    /// later reports can touch the status.
    pub(crate) fn raise_cancel(&mut self, reason: CancelReason) -> Option<RunId> {
        self.cancel = Some(reason);
        self.live_run.take()
    }

    pub(crate) fn finish_run(&mut self) {
        self.live_run = None;
    }

    pub(crate) fn track_progress(&mut self, downloaded: u64, total: u64) {
        self.last_downloaded = downloaded;
        self.last_total = total;
    }

    pub(crate) fn last_progress(&self) -> (u64, u64) {
        (self.last_downloaded, self.last_total)
    }
}
