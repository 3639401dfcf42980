//! Seeding core: pure job state machine and its persisted projection.
mod effect;
mod msg;
mod record;
mod state;
mod status;
mod update;

pub use effect::Effect;
pub use msg::{Msg, RunOutcome};
pub use record::PersistedJobRecord;
pub use state::{CancelReason, JobState, RunId};
pub use status::{JobStatus, PHASE_DISCOVERING, WINDOW_EXPIRED};
pub use update::update;
