//! Wires the orchestrator to local collaborators and serves its windows.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use seed_core::JobStatus;
use seed_engine::{
    Collaborators, JobOrchestrator, LocalScheduler, LogNotificationSink, RonFileStore,
    WindowReceiver,
};
use seed_logging::{seed_info, seed_warn};

use crate::config::AppConfig;
use crate::worker::CatalogWorker;

pub struct Host {
    orchestrator: JobOrchestrator,
    windows: WindowReceiver,
    config: AppConfig,
}

impl Host {
    /// Must be called from within a tokio runtime.
    pub fn build(config: AppConfig) -> anyhow::Result<Self> {
        let store = RonFileStore::open(&config.state_dir)
            .with_context(|| format!("failed to open state dir {:?}", config.state_dir))?;
        let (scheduler, windows) =
            LocalScheduler::new(config.windows(), tokio::runtime::Handle::current());
        let orchestrator = JobOrchestrator::new(
            config.orchestrator(),
            Collaborators {
                store: Arc::new(store),
                worker: Arc::new(CatalogWorker::new(config.catalog())),
                scheduler: Arc::new(scheduler),
                notifier: Arc::new(LogNotificationSink),
            },
        );
        Ok(Self {
            orchestrator,
            windows,
            config,
        })
    }

    pub fn status(&self) -> JobStatus {
        let status = self.orchestrator.current_status();
        print_status(&status);
        status
    }

    pub fn cancel(&self) -> JobStatus {
        self.orchestrator.cancel();
        self.status()
    }

    /// Debug run that bypasses the scheduler.
    pub async fn foreground(&self) -> JobStatus {
        let orchestrator = self.orchestrator.clone();
        let mut updates = orchestrator.subscribe();
        let run = tokio::spawn(async move { orchestrator.run_in_foreground().await });
        tokio::pin!(run);

        loop {
            tokio::select! {
                result = &mut run => {
                    if let Err(err) = result {
                        seed_warn!("Foreground run task failed: {}", err);
                    }
                    break;
                }
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let status = updates.borrow_and_update().clone();
                    print_status(&status);
                }
            }
        }
        self.status()
    }

    /// Requests a run and serves scheduler windows until the job settles or
    /// the user interrupts the process.
    pub async fn run(mut self) -> JobStatus {
        self.orchestrator.request_run();
        let mut ticker = tokio::time::interval(self.config.poll_interval());

        let status = loop {
            tokio::select! {
                Some(window) = self.windows.recv() => {
                    let orchestrator = self.orchestrator.clone();
                    tokio::spawn(async move {
                        orchestrator.handle_execution_window(window).await;
                    });
                }
                _ = ticker.tick() => {
                    let status = self.orchestrator.current_status();
                    print_status(&status);
                    if !status.is_active() {
                        break status;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    seed_info!("Interrupted; leaving job state for the next launch");
                    break self.orchestrator.current_status();
                }
            }
        };

        // The host is about to go away: make sure outstanding work has a window.
        self.orchestrator.ensure_scheduled();
        status
    }
}

fn print_status(status: &JobStatus) {
    let stamp = Utc::now().to_rfc3339();
    match status.progress_fraction() {
        Some(fraction) => println!("[{stamp}] {status} {:.0}%", fraction * 100.0),
        None => println!("[{stamp}] {status}"),
    }
}
