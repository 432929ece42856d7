use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clawtop::core::dashboard::{
    BlockingDispatcher, EntryState, InlineDispatcher, MetricPayload, MetricSource,
    RefreshScheduler,
};
use clawtop::DashError;

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

#[test]
fn test_independent_intervals_over_simulated_time() {
    let a_calls = Arc::new(AtomicU32::new(0));
    let b_calls = Arc::new(AtomicU32::new(0));
    let a_counter = Arc::clone(&a_calls);
    let b_counter = Arc::clone(&b_calls);

    let sources = vec![
        MetricSource::from_fn("a", secs(2), move || {
            let n = a_counter.fetch_add(1, Ordering::SeqCst);
            Ok(MetricPayload::Gauge(n as f64))
        }),
        MetricSource::from_fn("b", secs(10), move || {
            b_counter.fetch_add(1, Ordering::SeqCst);
            Err(DashError::source_fetch("gateway unreachable"))
        }),
    ];
    let mut scheduler = RefreshScheduler::register(sources, Arc::new(InlineDispatcher)).unwrap();

    let t0 = Instant::now();
    for second in 0..=21 {
        scheduler.tick(t0 + secs(second));
    }

    // a: 0, 2, ..., 20; b: 0, 10, 20
    assert_eq!(a_calls.load(Ordering::SeqCst), 11);
    assert_eq!(b_calls.load(Ordering::SeqCst), 3);

    let cache = scheduler.cache();
    let a = cache.get("a").unwrap();
    assert_eq!(a.state(), EntryState::Fresh);
    assert_eq!(a.successes, 11);
    assert_eq!(a.payload(), Some(&MetricPayload::Gauge(10.0)));
    // Successes carry the instant the fetch returned, not the simulated tick.
    let stamped = a.last_value.as_ref().unwrap().timestamp();
    assert!(stamped >= t0 && stamped < t0 + secs(20));
    assert_eq!(a.last_attempt_time, Some(stamped));

    let b = cache.get("b").unwrap();
    assert_eq!(b.state(), EntryState::Unavailable);
    assert_eq!(b.consecutive_failures, 3);
    assert!(b.last_value.is_none());
    assert!(b.last_error.as_deref().unwrap().contains("gateway unreachable"));
}

#[test]
fn test_failure_then_recovery() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let sources = vec![MetricSource::from_fn("c", secs(2), move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(DashError::source_fetch("first read failed"))
        } else {
            Ok(MetricPayload::Gauge(42.0))
        }
    })];
    let mut scheduler = RefreshScheduler::register(sources, Arc::new(InlineDispatcher)).unwrap();

    let t0 = Instant::now();
    scheduler.tick(t0);
    let entry = scheduler.cache().get("c").unwrap();
    assert_eq!(entry.state(), EntryState::Unavailable);
    assert_eq!(entry.consecutive_failures, 1);

    // Not due yet
    assert!(scheduler.tick(t0 + secs(1)).is_idle());

    scheduler.tick(t0 + secs(2));
    let entry = scheduler.cache().get("c").unwrap();
    assert_eq!(entry.state(), EntryState::Fresh);
    assert_eq!(entry.consecutive_failures, 0);
    assert!(entry.last_error.is_none());
    assert_eq!(entry.payload(), Some(&MetricPayload::Gauge(42.0)));
}

#[test]
fn test_stale_value_survives_later_failures() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let sources = vec![MetricSource::from_fn("flaky", secs(1), move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(MetricPayload::Gauge(7.0))
        } else {
            Err(DashError::timeout("flaky", secs(5)))
        }
    })];
    let mut scheduler = RefreshScheduler::register(sources, Arc::new(InlineDispatcher)).unwrap();

    let t0 = Instant::now();
    for second in 0..3 {
        scheduler.tick(t0 + secs(second));
    }

    let entry = scheduler.cache().get("flaky").unwrap();
    assert_eq!(entry.state(), EntryState::Stale { failures: 2 });
    assert_eq!(entry.payload(), Some(&MetricPayload::Gauge(7.0)));
    assert_eq!(entry.last_attempt_time, Some(t0 + secs(2)));
}

#[test]
fn test_slow_source_does_not_block_others_or_readers() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    let fast_calls = Arc::new(AtomicU32::new(0));
    let fast_counter = Arc::clone(&fast_calls);
    let sources = vec![
        MetricSource::from_fn("slow", Duration::from_millis(100), || {
            thread::sleep(Duration::from_secs(3));
            Ok(MetricPayload::Gauge(1.0))
        }),
        MetricSource::from_fn("fast", Duration::from_millis(100), move || {
            fast_counter.fetch_add(1, Ordering::SeqCst);
            Ok(MetricPayload::Gauge(2.0))
        }),
    ];
    let dispatcher = BlockingDispatcher::new(runtime.handle().clone());
    let mut scheduler = RefreshScheduler::register(sources, Arc::new(dispatcher)).unwrap();

    let started = Instant::now();
    let report = scheduler.tick(Instant::now());
    assert_eq!(report.dispatched.len(), 2);
    assert!(started.elapsed() < Duration::from_millis(500));

    // Readers never wait on the fetch in progress.
    let started = Instant::now();
    let entries = scheduler.cache().get_all();
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(entries[0].state(), EntryState::Pending);

    // The fast source keeps refreshing while the slow one is stuck.
    let deadline = Instant::now() + Duration::from_secs(2);
    while fast_calls.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(120));
        let report = scheduler.tick(Instant::now());
        assert!(report.skipped_in_flight.iter().any(|id| id == "slow"));
    }
    assert!(fast_calls.load(Ordering::SeqCst) >= 3);
    assert!(scheduler.is_in_flight("slow"));
    assert_eq!(scheduler.cache().get("slow").unwrap().state(), EntryState::Pending);
    assert_eq!(scheduler.cache().get("fast").unwrap().state(), EntryState::Fresh);

    runtime.shutdown_background();
}
