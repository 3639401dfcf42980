use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use seed_logging::{seed_debug, seed_info, seed_warn};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub type ExpireCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("background scheduler unavailable: {0}")]
    Unavailable(String),
}

/// Grants the job future execution windows, with no guarantee of delivery.
///
/// Both methods are called while the orchestrator holds its lock, so windows
/// must be delivered asynchronously, never from inside `request_window`.
pub trait BackgroundScheduler: Send + Sync {
    fn request_window(&self, job_id: &str) -> Result<(), ScheduleError>;
    fn withdraw_window(&self, job_id: &str);
}

/// A bounded opportunity to run background work, revocable at any time.
pub trait ExecutionWindow: Send {
    fn job_id(&self) -> &str;

    /// Registers the revocation callback. If the window already expired the
    /// callback runs immediately.
    fn on_expire(&mut self, callback: ExpireCallback);

    /// Reports the result so the scheduler can decide whether to retry.
    fn complete(self: Box<Self>, success: bool);
}

/// Window for a run started in the foreground; it never expires.
#[derive(Debug, Clone)]
pub struct ForegroundWindow {
    job_id: String,
}

impl ForegroundWindow {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
        }
    }
}

impl ExecutionWindow for ForegroundWindow {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    fn on_expire(&mut self, _callback: ExpireCallback) {}

    fn complete(self: Box<Self>, success: bool) {
        seed_debug!("Foreground window for {} done success={}", self.job_id, success);
    }
}

#[derive(Default)]
struct WindowState {
    expired: bool,
    completed: bool,
    callback: Option<ExpireCallback>,
}

/// Window that revokes itself once its time budget runs out.
pub struct TimedWindow {
    job_id: String,
    state: Arc<Mutex<WindowState>>,
    timer: JoinHandle<()>,
}

impl TimedWindow {
    /// Opens the window and arms its expiry timer on `runtime`.
    pub fn open(job_id: impl Into<String>, budget: Duration, runtime: &Handle) -> Self {
        let job_id = job_id.into();
        let state = Arc::new(Mutex::new(WindowState::default()));
        let timer_state = state.clone();
        let timer_job = job_id.clone();
        let timer = runtime.spawn(async move {
            tokio::time::sleep(budget).await;
            let callback = {
                let mut state = timer_state.lock().unwrap_or_else(PoisonError::into_inner);
                if state.completed {
                    return;
                }
                state.expired = true;
                state.callback.take()
            };
            seed_warn!("Execution window for {} expired after {:?}", timer_job, budget);
            if let Some(callback) = callback {
                callback();
            }
        });
        Self {
            job_id,
            state,
            timer,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .expired
    }
}

impl ExecutionWindow for TimedWindow {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    fn on_expire(&mut self, callback: ExpireCallback) {
        let fire_now = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.expired {
                Some(callback)
            } else {
                state.callback = Some(callback);
                None
            }
        };
        if let Some(callback) = fire_now {
            callback();
        }
    }

    fn complete(self: Box<Self>, success: bool) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.completed = true;
            state.callback = None;
        }
        self.timer.abort();
        seed_info!("Execution window for {} completed success={}", self.job_id, success);
    }
}

#[derive(Debug, Clone)]
pub struct WindowSettings {
    /// Delay between a request and the window being granted.
    pub start_delay: Duration,
    /// How long a granted window lasts before it is revoked.
    pub budget: Duration,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_millis(0),
            budget: Duration::from_secs(30),
        }
    }
}

pub type WindowReceiver = mpsc::UnboundedReceiver<Box<dyn ExecutionWindow>>;

/// In-process stand-in for an OS background scheduler.
///
/// Granted windows are delivered on the [`WindowReceiver`]; the host is
/// expected to hand each one to the orchestrator.
pub struct LocalScheduler {
    settings: WindowSettings,
    runtime: Handle,
    tx: mpsc::UnboundedSender<Box<dyn ExecutionWindow>>,
    pending: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl LocalScheduler {
    pub fn new(settings: WindowSettings, runtime: Handle) -> (Self, WindowReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            settings,
            runtime,
            tx,
            pending: Mutex::new(HashMap::new()),
        };
        (scheduler, rx)
    }
}

impl BackgroundScheduler for LocalScheduler {
    fn request_window(&self, job_id: &str) -> Result<(), ScheduleError> {
        if self.tx.is_closed() {
            return Err(ScheduleError::Unavailable(
                "window receiver dropped".to_string(),
            ));
        }

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending
            .get(job_id)
            .is_some_and(|request| !request.is_finished())
        {
            seed_debug!("Window request for {} already pending", job_id);
            return Ok(());
        }

        let tx = self.tx.clone();
        let settings = self.settings.clone();
        let runtime = self.runtime.clone();
        let window_job = job_id.to_string();
        let request = self.runtime.spawn(async move {
            tokio::time::sleep(settings.start_delay).await;
            let window = TimedWindow::open(window_job.clone(), settings.budget, &runtime);
            seed_info!("Granting execution window for {}", window_job);
            if tx.send(Box::new(window)).is_err() {
                seed_warn!("No receiver for execution window of {}", window_job);
            }
        });
        pending.insert(job_id.to_string(), request);
        Ok(())
    }

    fn withdraw_window(&self, job_id: &str) {
        let request = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(job_id);
        if let Some(request) = request {
            request.abort();
            seed_debug!("Withdrew window request for {}", job_id);
        }
    }
}
