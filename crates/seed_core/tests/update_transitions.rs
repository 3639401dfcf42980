use seed_core::{
    update, CancelReason, Effect, JobState, JobStatus, Msg, PersistedJobRecord, RunId,
    RunOutcome, PHASE_DISCOVERING, WINDOW_EXPIRED,
};

fn init_logging() {
    seed_logging::initialize_for_tests();
}

fn progress(run_id: RunId, downloaded: u64, total: u64, phase: &str) -> Msg {
    Msg::Progress {
        run_id,
        downloaded,
        total,
        phase: phase.to_string(),
    }
}

/// Requests a run and opens a window, returning the live run id.
fn start_run(state: JobState) -> (JobState, RunId) {
    let (state, _) = update(state, Msg::RunRequested);
    let (state, effects) = update(state, Msg::WindowOpened);
    let run_id = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::BeginRun { run_id } => Some(*run_id),
            _ => None,
        })
        .expect("begin run effect");
    (state, run_id)
}

#[test]
fn run_request_queues_and_asks_for_window() {
    init_logging();
    let (state, effects) = update(JobState::new(), Msg::RunRequested);

    assert_eq!(*state.status(), JobStatus::Queued);
    assert_eq!(
        effects,
        vec![
            Effect::Persist(PersistedJobRecord::queued()),
            Effect::RequestWindow
        ]
    );
}

#[test]
fn repeated_run_request_only_rearms_window() {
    let (state, _) = update(JobState::new(), Msg::RunRequested);
    let (next, effects) = update(state.clone(), Msg::RunRequested);

    assert_eq!(state, next);
    assert_eq!(effects, vec![Effect::RequestWindow]);
}

#[test]
fn restored_queued_record_rearms_window_without_persisting() {
    let state = JobState::restore(PersistedJobRecord::queued());
    assert_eq!(*state.status(), JobStatus::Queued);

    let (next, effects) = update(state.clone(), Msg::RunRequested);
    assert_eq!(state, next);
    assert_eq!(effects, vec![Effect::RequestWindow]);
}

#[test]
fn run_request_while_running_is_noop() {
    let (state, run_id) = start_run(JobState::new());
    let (state, _) = update(state, progress(run_id, 5, 10, "downloading"));
    let (next, effects) = update(state.clone(), Msg::RunRequested);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn window_opening_starts_discovery_and_clears_queued() {
    let (state, _) = update(JobState::new(), Msg::RunRequested);
    let (state, effects) = update(state, Msg::WindowOpened);

    assert_eq!(*state.status(), JobStatus::running(0, 0, PHASE_DISCOVERING));
    assert_eq!(
        effects[0],
        Effect::Persist(PersistedJobRecord::running(0, 0, PHASE_DISCOVERING))
    );
    assert!(!state.record().queued);
    assert!(matches!(effects[1], Effect::BeginRun { .. }));
    assert_eq!(state.cancel_reason(), None);
}

#[test]
fn window_without_request_does_nothing() {
    let (next, effects) = update(JobState::new(), Msg::WindowOpened);
    assert_eq!(*next.status(), JobStatus::Idle);
    assert!(effects.is_empty());
}

#[test]
fn second_window_during_live_run_does_nothing() {
    let (state, _) = start_run(JobState::new());
    let (next, effects) = update(state.clone(), Msg::WindowOpened);
    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn progress_updates_status_and_record() {
    let (state, run_id) = start_run(JobState::new());
    let (state, effects) = update(state, progress(run_id, 10, 100, "downloading"));

    assert_eq!(*state.status(), JobStatus::running(10, 100, "downloading"));
    assert_eq!(
        effects,
        vec![Effect::Persist(PersistedJobRecord::running(
            10,
            100,
            "downloading"
        ))]
    );
}

#[test]
fn progress_never_shows_downloaded_above_known_total() {
    let (state, run_id) = start_run(JobState::new());
    let (state, _) = update(state, progress(run_id, 12, 10, "downloading"));
    assert_eq!(*state.status(), JobStatus::running(12, 12, "downloading"));

    // Unknown total stays unknown.
    let (state, _) = update(state, progress(run_id, 3, 0, PHASE_DISCOVERING));
    assert_eq!(*state.status(), JobStatus::running(3, 0, PHASE_DISCOVERING));
}

#[test]
fn successful_run_completes_notifies_and_clears() {
    let (state, run_id) = start_run(JobState::new());
    let (state, _) = update(state, progress(run_id, 10, 100, "downloading"));
    let (state, _) = update(state, progress(run_id, 100, 100, "downloading"));
    let (state, effects) = update(
        state,
        Msg::RunFinished {
            run_id,
            outcome: RunOutcome::Finished(100),
        },
    );

    assert_eq!(*state.status(), JobStatus::Completed { total: 100 });
    assert_eq!(
        effects,
        vec![
            Effect::Persist(PersistedJobRecord::completed(100)),
            Effect::NotifyCompleted { total: 100 },
            Effect::Persist(PersistedJobRecord::default()),
            Effect::RunSettled {
                run_id,
                success: true
            },
        ]
    );
    assert!(state.record().is_idle());
    assert_eq!(state.live_run(), None);
}

#[test]
fn completion_total_uses_largest_known_count() {
    let (state, run_id) = start_run(JobState::new());
    let (state, _) = update(state, progress(run_id, 30, 0, "downloading"));
    let (state, _) = update(
        state,
        Msg::RunFinished {
            run_id,
            outcome: RunOutcome::Finished(0),
        },
    );
    assert_eq!(*state.status(), JobStatus::Completed { total: 30 });
}

#[test]
fn cancel_wins_over_late_progress() {
    let (state, run_id) = start_run(JobState::new());
    let (state, _) = update(state, progress(run_id, 10, 100, "downloading"));
    let (state, effects) = update(state, Msg::CancelRequested);

    assert_eq!(*state.status(), JobStatus::Cancelled);
    assert_eq!(state.cancel_reason(), Some(CancelReason::User));
    assert_eq!(
        effects,
        vec![
            Effect::CancelWorker { run_id },
            Effect::Persist(PersistedJobRecord::default()),
            Effect::WithdrawWindow,
        ]
    );

    let (state, effects) = update(state, progress(run_id, 20, 100, "downloading"));
    assert_eq!(*state.status(), JobStatus::Cancelled);
    assert!(effects.is_empty());

    let (state, effects) = update(
        state,
        Msg::RunFinished {
            run_id,
            outcome: RunOutcome::Finished(100),
        },
    );
    assert_eq!(*state.status(), JobStatus::Cancelled);
    assert_eq!(
        effects,
        vec![Effect::RunSettled {
            run_id,
            success: false
        }]
    );
}

#[test]
fn cancel_while_queued_clears_record_and_withdraws() {
    let (state, _) = update(JobState::new(), Msg::RunRequested);
    let (state, effects) = update(state, Msg::CancelRequested);

    assert_eq!(*state.status(), JobStatus::Cancelled);
    assert!(state.record().is_idle());
    assert_eq!(
        effects,
        vec![
            Effect::Persist(PersistedJobRecord::default()),
            Effect::WithdrawWindow
        ]
    );

    // A window delivered after the cancel must not start anything.
    let (state, effects) = update(state, Msg::WindowOpened);
    assert_eq!(*state.status(), JobStatus::Cancelled);
    assert!(effects.is_empty());
}

#[test]
fn cancel_after_terminal_state_is_noop() {
    let (state, run_id) = start_run(JobState::new());
    let (state, _) = update(
        state,
        Msg::RunFinished {
            run_id,
            outcome: RunOutcome::Finished(7),
        },
    );
    let (next, effects) = update(state.clone(), Msg::CancelRequested);
    assert_eq!(state, next);
    assert!(effects.is_empty());

    let (cancelled, effects) = update(JobState::new(), Msg::CancelRequested);
    let (next, again) = update(cancelled.clone(), Msg::CancelRequested);
    assert_eq!(cancelled, next);
    assert!(again.is_empty());
    assert!(!effects.is_empty());
}

#[test]
fn cancel_from_idle_marks_cancelled() {
    let (state, effects) = update(JobState::new(), Msg::CancelRequested);

    assert_eq!(*state.status(), JobStatus::Cancelled);
    assert_eq!(state.cancel_reason(), Some(CancelReason::User));
    assert_eq!(
        effects,
        vec![
            Effect::Persist(PersistedJobRecord::default()),
            Effect::WithdrawWindow
        ]
    );
}

#[test]
fn expiry_fails_run_distinct_from_cancel() {
    let (state, run_id) = start_run(JobState::new());
    let (state, _) = update(state, progress(run_id, 10, 100, "downloading"));
    let (state, effects) = update(state, Msg::WindowExpired { run_id });

    assert_eq!(*state.status(), JobStatus::failed(WINDOW_EXPIRED));
    assert_eq!(state.cancel_reason(), Some(CancelReason::Expired));
    assert_eq!(
        effects,
        vec![
            Effect::Persist(PersistedJobRecord::failed(WINDOW_EXPIRED)),
            Effect::CancelWorker { run_id },
        ]
    );

    // The interrupted worker returning afterwards keeps the expiry error.
    let (state, _) = update(
        state,
        Msg::RunFinished {
            run_id,
            outcome: RunOutcome::Interrupted,
        },
    );
    assert_eq!(*state.status(), JobStatus::failed(WINDOW_EXPIRED));
    assert_eq!(
        state.record().reconstruct_status(),
        JobStatus::failed(WINDOW_EXPIRED)
    );
}

#[test]
fn expiry_after_completion_is_ignored() {
    let (state, run_id) = start_run(JobState::new());
    let (state, _) = update(
        state,
        Msg::RunFinished {
            run_id,
            outcome: RunOutcome::Finished(1),
        },
    );
    let (next, effects) = update(state.clone(), Msg::WindowExpired { run_id });
    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn worker_failure_keeps_message_verbatim() {
    let (state, run_id) = start_run(JobState::new());
    let (state, effects) = update(
        state,
        Msg::RunFinished {
            run_id,
            outcome: RunOutcome::Failed("catalog page 3: unexpected EOF".to_string()),
        },
    );

    assert_eq!(
        *state.status(),
        JobStatus::failed("catalog page 3: unexpected EOF")
    );
    assert_eq!(
        effects[0],
        Effect::Persist(PersistedJobRecord::failed(
            "catalog page 3: unexpected EOF"
        ))
    );
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::NotifyCompleted { .. })));
}

#[test]
fn interrupted_live_run_settles_as_cancelled() {
    let (state, run_id) = start_run(JobState::new());
    let (state, effects) = update(
        state,
        Msg::RunFinished {
            run_id,
            outcome: RunOutcome::Interrupted,
        },
    );
    assert_eq!(*state.status(), JobStatus::Cancelled);
    assert!(state.record().is_idle());
    assert!(effects.contains(&Effect::RunSettled {
        run_id,
        success: false
    }));
}

#[test]
fn restored_running_status_restarts_from_discovery() {
    let state = JobState::restore(PersistedJobRecord::running(40, 100, "downloading"));
    let (state, effects) = update(state, Msg::RunRequested);
    assert_eq!(*state.status(), JobStatus::Queued);
    assert!(effects.contains(&Effect::RequestWindow));

    let (state, _) = update(state, Msg::WindowOpened);
    assert_eq!(*state.status(), JobStatus::running(0, 0, PHASE_DISCOVERING));
}

#[test]
fn new_run_after_cancel_ignores_old_run_reports() {
    let (state, old_run) = start_run(JobState::new());
    let (state, _) = update(state, Msg::CancelRequested);
    let (state, new_run) = start_run(state);
    assert_ne!(old_run, new_run);

    let (state, effects) = update(state, progress(old_run, 99, 100, "downloading"));
    assert!(effects.is_empty());
    assert_eq!(*state.status(), JobStatus::running(0, 0, PHASE_DISCOVERING));

    let (state, _) = update(state, progress(new_run, 1, 100, "downloading"));
    assert_eq!(*state.status(), JobStatus::running(1, 100, "downloading"));
}
