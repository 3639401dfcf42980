use crate::{
    CancelReason, Effect, JobState, JobStatus, Msg, PersistedJobRecord, RunId, RunOutcome,
    PHASE_DISCOVERING, WINDOW_EXPIRED,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: JobState, msg: Msg) -> (JobState, Vec<Effect>) {
    let effects = match msg {
        Msg::RunRequested => {
            if state.live_run().is_some() {
                return (state, Vec::new());
            }
            // Already queued: the flag is on disk, but the window request may
            // have died with a previous process.
            if *state.status() == JobStatus::Queued {
                return (state, vec![Effect::RequestWindow]);
            }
            state.set_status(JobStatus::Queued);
            vec![
                state.persist(PersistedJobRecord::queued()),
                Effect::RequestWindow,
            ]
        }
        Msg::CancelRequested => {
            if state.status().is_terminal() {
                return (state, Vec::new());
            }
            let mut effects = Vec::with_capacity(3);
            if let Some(run_id) = state.raise_cancel(CancelReason::User) {
                effects.push(Effect::CancelWorker { run_id });
            }
            state.set_status(JobStatus::Cancelled);
            effects.push(state.persist(PersistedJobRecord::default()));
            effects.push(Effect::WithdrawWindow);
            effects
        }
        Msg::WindowOpened => {
            if !state.is_runnable() {
                return (state, Vec::new());
            }
            let run_id = state.begin_run();
            state.set_status(JobStatus::running(0, 0, PHASE_DISCOVERING));
            vec![
                state.persist(PersistedJobRecord::running(0, 0, PHASE_DISCOVERING)),
                Effect::BeginRun { run_id },
            ]
        }
        Msg::Progress {
            run_id,
            downloaded,
            total,
            phase,
        } => {
            // Late reports from a cancelled, expired or superseded run.
            if !state.is_live(run_id) {
                return (state, Vec::new());
            }
            let total = if total == 0 { 0 } else { total.max(downloaded) };
            state.track_progress(downloaded, total);
            state.set_status(JobStatus::running(downloaded, total, phase.clone()));
            vec![state.persist(PersistedJobRecord::running(downloaded, total, phase))]
        }
        Msg::WindowExpired { run_id } => {
            if !state.is_live(run_id) {
                return (state, Vec::new());
            }
            state.raise_cancel(CancelReason::Expired);
            state.set_status(JobStatus::failed(WINDOW_EXPIRED));
            vec![
                state.persist(PersistedJobRecord::failed(WINDOW_EXPIRED)),
                Effect::CancelWorker { run_id },
            ]
        }
        Msg::RunFinished { run_id, outcome } => finish_run(&mut state, run_id, outcome),
    };

    (state, effects)
}

fn finish_run(state: &mut JobState, run_id: RunId, outcome: RunOutcome) -> Vec<Effect> {
    if !state.is_live(run_id) {
        // Cancel or expiry already settled the status for this run.
        return vec![Effect::RunSettled {
            run_id,
            success: false,
        }];
    }
    state.finish_run();

    match outcome {
        RunOutcome::Finished(count) => {
            let (downloaded, total) = state.last_progress();
            let total = total.max(downloaded).max(count);
            state.set_status(JobStatus::Completed { total });
            vec![
                state.persist(PersistedJobRecord::completed(total)),
                Effect::NotifyCompleted { total },
                state.persist(PersistedJobRecord::default()),
                Effect::RunSettled {
                    run_id,
                    success: true,
                },
            ]
        }
        RunOutcome::Failed(error) => {
            state.set_status(JobStatus::failed(error.clone()));
            vec![
                state.persist(PersistedJobRecord::failed(error)),
                Effect::RunSettled {
                    run_id,
                    success: false,
                },
            ]
        }
        RunOutcome::Interrupted => {
            state.raise_cancel(CancelReason::User);
            state.set_status(JobStatus::Cancelled);
            vec![
                state.persist(PersistedJobRecord::default()),
                Effect::RunSettled {
                    run_id,
                    success: false,
                },
            ]
        }
    }
}
