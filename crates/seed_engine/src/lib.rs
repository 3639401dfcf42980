//! Seeding engine: collaborator contracts and the job orchestrator.
mod notify;
mod orchestrator;
mod persist;
mod scheduler;
mod store;
mod types;
mod worker;

pub use notify::{LogNotificationSink, NotificationSink};
pub use orchestrator::{Collaborators, JobOrchestrator, OrchestratorConfig, WORKER_PANICKED};
pub use persist::{ensure_state_dir, AtomicFileWriter, PersistError, RonFileStore, STATE_FILENAME};
pub use scheduler::{
    BackgroundScheduler, ExecutionWindow, ExpireCallback, ForegroundWindow, LocalScheduler,
    ScheduleError, TimedWindow, WindowReceiver, WindowSettings,
};
pub use store::{
    load_record, save_record, KeyValueStore, MemoryStore, StoreError, StoreValue, KEY_DOWNLOADED,
    KEY_LAST_ERROR, KEY_PHASE, KEY_QUEUED, KEY_TOTAL,
};
pub use types::{FailureKind, ItemProgress, WorkerError};
pub use worker::{ItemWorker, ProgressSink};
