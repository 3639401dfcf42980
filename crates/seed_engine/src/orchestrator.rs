use std::mem;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use seed_core::{update, Effect, JobState, JobStatus, Msg, PersistedJobRecord, RunId, RunOutcome};
use seed_logging::{seed_debug, seed_error, seed_info, seed_warn};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    load_record, save_record, BackgroundScheduler, ExecutionWindow, FailureKind,
    ForegroundWindow, ItemProgress, ItemWorker, KeyValueStore, NotificationSink, ProgressSink,
};

/// Failure message used when the item worker panics.
pub const WORKER_PANICKED: &str = "item worker panicked";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Identifier the scheduler knows the job by.
    pub job_id: String,
    pub max_items: Option<u64>,
    pub notification_title: String,
    /// `{total}` is replaced with the number of items imported.
    pub notification_body: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            job_id: "food-catalog-seed".to_string(),
            max_items: None,
            notification_title: "Food catalog ready".to_string(),
            notification_body: "Imported {total} foods.".to_string(),
        }
    }
}

impl OrchestratorConfig {
    fn completion_body(&self, total: u64) -> String {
        self.notification_body.replace("{total}", &total.to_string())
    }
}

/// External services the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn KeyValueStore>,
    pub worker: Arc<dyn ItemWorker>,
    pub scheduler: Arc<dyn BackgroundScheduler>,
    pub notifier: Arc<dyn NotificationSink>,
}

struct Domain {
    state: JobState,
    run_token: Option<(RunId, CancellationToken)>,
}

#[derive(Default)]
struct Transition {
    begun: Option<(RunId, CancellationToken)>,
    settled: Option<bool>,
}

struct Inner {
    config: OrchestratorConfig,
    collaborators: Collaborators,
    domain: Mutex<Domain>,
    status_tx: watch::Sender<JobStatus>,
}

impl Inner {
    /// Applies one transition inside the single-writer domain.
    ///
    /// Persistence, cancellation and scheduler calls happen before the lock is
    /// released and the new status is published; notifications run after.
    /// Scheduler implementations must not call back into the orchestrator
    /// from `request_window` or `withdraw_window`.
    fn dispatch(&self, msg: Msg) -> Transition {
        let mut transition = Transition::default();
        let mut deferred = Vec::new();
        {
            let mut domain = self.domain.lock().unwrap_or_else(PoisonError::into_inner);
            let state = mem::take(&mut domain.state);
            let (next, effects) = update(state, msg);
            domain.state = next;

            for effect in effects {
                match effect {
                    Effect::Persist(record) => self.persist(&record),
                    Effect::CancelWorker { run_id } => {
                        if let Some((_, token)) = take_token(&mut domain.run_token, run_id) {
                            token.cancel();
                        }
                    }
                    Effect::BeginRun { run_id } => {
                        let token = CancellationToken::new();
                        domain.run_token = Some((run_id, token.clone()));
                        transition.begun = Some((run_id, token));
                    }
                    Effect::RunSettled { run_id, success } => {
                        take_token(&mut domain.run_token, run_id);
                        transition.settled = Some(success);
                    }
                    Effect::RequestWindow => self.request_window(),
                    Effect::WithdrawWindow => self
                        .collaborators
                        .scheduler
                        .withdraw_window(&self.config.job_id),
                    effect => deferred.push(effect),
                }
            }

            let status = domain.state.status().clone();
            self.status_tx.send_if_modified(|current| {
                if *current == status {
                    return false;
                }
                seed_debug!("Seeding job status: {} -> {}", current, status);
                *current = status;
                true
            });
        }

        for effect in deferred {
            self.run_effect(effect);
        }
        transition
    }

    fn persist(&self, record: &PersistedJobRecord) {
        if let Err(err) = save_record(self.collaborators.store.as_ref(), record) {
            seed_warn!("Failed to persist seeding job record: {}", err);
        }
    }

    fn run_effect(&self, effect: Effect) {
        match effect {
            Effect::NotifyCompleted { total } => {
                let body = self.config.completion_body(total);
                self.collaborators
                    .notifier
                    .post(&self.config.notification_title, &body);
            }
            other => seed_error!("Unexpected deferred effect {:?}", other),
        }
    }

    fn request_window(&self) {
        if let Err(err) = self
            .collaborators
            .scheduler
            .request_window(&self.config.job_id)
        {
            seed_warn!(
                "Failed to request execution window for {}: {}",
                self.config.job_id,
                err
            );
        }
    }
}

fn take_token(
    slot: &mut Option<(RunId, CancellationToken)>,
    run_id: RunId,
) -> Option<(RunId, CancellationToken)> {
    match slot {
        Some((id, _)) if *id == run_id => slot.take(),
        _ => None,
    }
}

/// Routes worker progress for one run back into the orchestrator.
struct RunProgressSink<'a> {
    inner: &'a Inner,
    run_id: RunId,
}

impl ProgressSink for RunProgressSink<'_> {
    fn emit(&self, progress: ItemProgress) {
        self.inner.dispatch(Msg::Progress {
            run_id: self.run_id,
            downloaded: progress.downloaded,
            total: progress.total,
            phase: progress.phase,
        });
    }
}

/// Owner of the singleton seeding job.
///
/// Cloning is cheap; every clone talks to the same job. All status changes
/// are serialized through one lock no matter which context calls in.
#[derive(Clone)]
pub struct JobOrchestrator {
    inner: Arc<Inner>,
}

impl JobOrchestrator {
    /// Builds the orchestrator, restoring status from the persisted record.
    ///
    /// Nothing is resumed: a restored `Running` status only shows the last
    /// known progress until a new run is requested.
    pub fn new(config: OrchestratorConfig, collaborators: Collaborators) -> Self {
        let record = load_record(collaborators.store.as_ref());
        let state = JobState::restore(record);
        seed_info!("Restored seeding job {}: {}", config.job_id, state.status());

        let (status_tx, _) = watch::channel(state.status().clone());
        Self {
            inner: Arc::new(Inner {
                config,
                collaborators,
                domain: Mutex::new(Domain {
                    state,
                    run_token: None,
                }),
                status_tx,
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    pub fn current_status(&self) -> JobStatus {
        self.inner.status_tx.borrow().clone()
    }

    /// Receiver that observes every published status change.
    pub fn subscribe(&self) -> watch::Receiver<JobStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Queues a run and asks the scheduler for a window. No-op while queued or
    /// while a run is executing.
    pub fn request_run(&self) {
        self.inner.dispatch(Msg::RunRequested);
    }

    /// Stops the job. The status reads `Cancelled` as soon as this returns.
    pub fn cancel(&self) {
        self.inner.dispatch(Msg::CancelRequested);
    }

    pub fn should_ensure_scheduled(&self) -> bool {
        self.current_status().is_active()
    }

    /// Re-arms the scheduler before the host suspends, if work is outstanding.
    pub fn ensure_scheduled(&self) {
        let domain = self
            .inner
            .domain
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if domain.state.status().is_active() {
            seed_debug!("Re-arming execution window for {}", self.inner.config.job_id);
            self.inner.request_window();
        }
    }

    /// Runs the job inside a window granted by the scheduler.
    ///
    /// Returns the success flag reported to the window. A window that arrives
    /// with nothing to run is completed successfully right away.
    pub async fn handle_execution_window(&self, mut window: Box<dyn ExecutionWindow>) -> bool {
        let Some((run_id, token)) = self.inner.dispatch(Msg::WindowOpened).begun else {
            seed_info!(
                "Execution window for {} not needed: {}",
                window.job_id(),
                self.current_status()
            );
            window.complete(true);
            return true;
        };

        let inner = Arc::downgrade(&self.inner);
        window.on_expire(Box::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.dispatch(Msg::WindowExpired { run_id });
            }
        }));

        let success = self.drive(run_id, token).await;
        window.complete(success);
        success
    }

    /// Debug entry point: queues the job and runs it in a window that never
    /// expires.
    pub async fn run_in_foreground(&self) -> bool {
        self.request_run();
        let window = ForegroundWindow::new(self.inner.config.job_id.clone());
        self.handle_execution_window(Box::new(window)).await
    }

    async fn drive(&self, run_id: RunId, token: CancellationToken) -> bool {
        seed_info!("Seeding run {} started", run_id);
        let outcome = if token.is_cancelled() {
            RunOutcome::Interrupted
        } else {
            let sink = RunProgressSink {
                inner: &self.inner,
                run_id,
            };
            let work = self.inner.collaborators.worker.process(
                self.inner.config.max_items,
                &sink,
                &token,
            );
            match AssertUnwindSafe(work).catch_unwind().await {
                _ if token.is_cancelled() => RunOutcome::Interrupted,
                Ok(Ok(count)) => RunOutcome::Finished(count),
                Ok(Err(err)) if err.kind == FailureKind::Cancelled => RunOutcome::Interrupted,
                Ok(Err(err)) => {
                    seed_warn!("Seeding run {} failed ({}): {}", run_id, err.kind, err);
                    RunOutcome::Failed(err.message)
                }
                Err(_) => {
                    seed_error!("Seeding run {} worker panicked", run_id);
                    RunOutcome::Failed(WORKER_PANICKED.to_string())
                }
            }
        };

        let success = self
            .inner
            .dispatch(Msg::RunFinished { run_id, outcome })
            .settled
            .unwrap_or(false);
        seed_info!(
            "Seeding run {} finished success={}: {}",
            run_id,
            success,
            self.current_status()
        );
        success
    }
}
