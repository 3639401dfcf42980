use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use seed_engine::{
    BackgroundScheduler, ExecutionWindow, LocalScheduler, TimedWindow, WindowSettings,
};

fn settings(start_delay_ms: u64, budget_ms: u64) -> WindowSettings {
    WindowSettings {
        start_delay: Duration::from_millis(start_delay_ms),
        budget: Duration::from_millis(budget_ms),
    }
}

#[tokio::test]
async fn local_scheduler_delivers_window() {
    let (scheduler, mut windows) =
        LocalScheduler::new(settings(5, 1_000), tokio::runtime::Handle::current());
    scheduler.request_window("food-catalog-seed").unwrap();

    let window = tokio::time::timeout(Duration::from_secs(2), windows.recv())
        .await
        .expect("window in time")
        .expect("window");
    assert_eq!(window.job_id(), "food-catalog-seed");
    window.complete(true);
}

#[tokio::test]
async fn duplicate_requests_are_coalesced() {
    let (scheduler, mut windows) =
        LocalScheduler::new(settings(20, 1_000), tokio::runtime::Handle::current());
    scheduler.request_window("food-catalog-seed").unwrap();
    scheduler.request_window("food-catalog-seed").unwrap();

    let first = tokio::time::timeout(Duration::from_secs(2), windows.recv())
        .await
        .expect("window in time");
    assert!(first.is_some());
    let second = tokio::time::timeout(Duration::from_millis(100), windows.recv()).await;
    assert!(second.is_err());
}

#[tokio::test]
async fn withdrawn_request_is_never_delivered() {
    let (scheduler, mut windows) =
        LocalScheduler::new(settings(50, 1_000), tokio::runtime::Handle::current());
    scheduler.request_window("food-catalog-seed").unwrap();
    scheduler.withdraw_window("food-catalog-seed");

    let delivered = tokio::time::timeout(Duration::from_millis(200), windows.recv()).await;
    assert!(delivered.is_err());
}

#[tokio::test]
async fn dropped_receiver_makes_scheduler_unavailable() {
    let (scheduler, windows) =
        LocalScheduler::new(settings(0, 1_000), tokio::runtime::Handle::current());
    drop(windows);
    assert!(scheduler.request_window("food-catalog-seed").is_err());
}

#[tokio::test]
async fn timed_window_expires_after_budget() {
    let fired = Arc::new(AtomicUsize::new(0));
    let mut window = TimedWindow::open(
        "food-catalog-seed",
        Duration::from_millis(20),
        &tokio::runtime::Handle::current(),
    );
    let counter = fired.clone();
    window.on_expire(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(window.is_expired());
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn late_registration_on_expired_window_fires_immediately() {
    let mut window = TimedWindow::open(
        "food-catalog-seed",
        Duration::from_millis(10),
        &tokio::runtime::Handle::current(),
    );
    tokio::time::sleep(Duration::from_millis(100)).await;

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    window.on_expire(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn completed_window_never_expires() {
    let fired = Arc::new(AtomicUsize::new(0));
    let mut window = Box::new(TimedWindow::open(
        "food-catalog-seed",
        Duration::from_millis(30),
        &tokio::runtime::Handle::current(),
    ));
    let counter = fired.clone();
    window.on_expire(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    window.complete(true);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}
