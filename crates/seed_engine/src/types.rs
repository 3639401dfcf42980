use std::fmt;

/// One progress report from the item worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemProgress {
    pub downloaded: u64,
    /// Zero while the item count is still being discovered.
    pub total: u64,
    pub phase: String,
}

impl ItemProgress {
    pub fn new(downloaded: u64, total: u64, phase: impl Into<String>) -> Self {
        Self {
            downloaded,
            total,
            phase: phase.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct WorkerError {
    pub kind: FailureKind,
    pub message: String,
}

impl WorkerError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "cancelled")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Parse,
    Storage,
    Cancelled,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Parse => write!(f, "parse error"),
            FailureKind::Storage => write!(f, "storage error"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Other => write!(f, "error"),
        }
    }
}
