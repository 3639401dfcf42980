use crate::JobStatus;

/// Flat projection of [`JobStatus`] as it is kept in durable storage.
///
/// The default value is the idle shape: nothing queued, no progress, no error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PersistedJobRecord {
    pub queued: bool,
    pub downloaded: u64,
    pub total: u64,
    /// Present only while a run is conceptually in progress.
    pub phase: Option<String>,
    pub last_error: Option<String>,
}

impl PersistedJobRecord {
    pub fn queued() -> Self {
        Self {
            queued: true,
            ..Self::default()
        }
    }

    pub fn running(downloaded: u64, total: u64, phase: impl Into<String>) -> Self {
        Self {
            downloaded,
            total,
            phase: Some(phase.into()),
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            last_error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Record written right before a completed run is cleared.
    pub fn completed(total: u64) -> Self {
        Self {
            downloaded: total,
            total,
            ..Self::default()
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }

    /// Rebuilds the status a previous process left behind.
    ///
    /// Display state only: a reconstructed `Running` does not mean any work is
    /// still executing.
    pub fn reconstruct_status(&self) -> JobStatus {
        if self.queued {
            return JobStatus::Queued;
        }
        if let Some(phase) = &self.phase {
            return JobStatus::Running {
                downloaded: self.downloaded,
                total: self.total.max(self.downloaded),
                phase: phase.clone(),
            };
        }
        match self.last_error.as_deref() {
            Some(error) if !error.is_empty() => JobStatus::failed(error),
            _ => JobStatus::Idle,
        }
    }
}
