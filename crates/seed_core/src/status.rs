use std::fmt;

/// Phase label used while the worker is discovering how many items exist.
pub const PHASE_DISCOVERING: &str = "discovering";

/// Error recorded when the scheduler revokes the execution window mid-run.
pub const WINDOW_EXPIRED: &str = "execution window expired";

/// The single authoritative status of the seeding job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Queued,
    /// `total == 0` means the item count is not known yet.
    Running {
        downloaded: u64,
        total: u64,
        phase: String,
    },
    Completed {
        total: u64,
    },
    Failed {
        error: String,
    },
    Cancelled,
}

impl JobStatus {
    pub fn running(downloaded: u64, total: u64, phase: impl Into<String>) -> Self {
        JobStatus::Running {
            downloaded,
            total,
            phase: phase.into(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        JobStatus::Failed {
            error: error.into(),
        }
    }

    /// True while a run is requested or executing.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed { .. } | JobStatus::Failed { .. } | JobStatus::Cancelled
        )
    }

    /// Fraction of items processed, when a total is known.
    pub fn progress_fraction(&self) -> Option<f64> {
        match self {
            JobStatus::Running {
                downloaded, total, ..
            } if *total > 0 => Some((*downloaded as f64 / *total as f64).min(1.0)),
            JobStatus::Completed { .. } => Some(1.0),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Idle => write!(f, "idle"),
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running {
                downloaded,
                total: 0,
                phase,
            } => write!(f, "{phase} ({downloaded} so far)"),
            JobStatus::Running {
                downloaded,
                total,
                phase,
            } => write!(f, "{phase} ({downloaded}/{total})"),
            JobStatus::Completed { total } => write!(f, "completed ({total} items)"),
            JobStatus::Failed { error } => write!(f, "failed: {error}"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}
