use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use crate::{
    MaxConcurrentTasks, ThrottledError,
    common::Gate,
    state::{PendingTaskSet, TaskHandle, ThrottleState},
};

struct FakeHandle(Arc<AtomicBool>);

impl TaskHandle for FakeHandle {
    fn is_finished(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn set(capacity: usize) -> PendingTaskSet<FakeHandle> {
    PendingTaskSet::new(MaxConcurrentTasks::try_from(capacity).unwrap())
}

fn admit(set: &mut PendingTaskSet<FakeHandle>) -> Result<Arc<AtomicBool>, ThrottledError> {
    let finished = Arc::new(AtomicBool::new(false));
    let handle = FakeHandle(Arc::clone(&finished));
    set.admit(|| Ok(handle))?;
    Ok(finished)
}

#[test]
fn gate_is_open_before_first_execution() {
    let state = ThrottleState::default();

    assert_eq!(
        state.gate(Instant::now(), Duration::from_secs(60)),
        Gate::Open
    );
    assert!(state.last_execution().is_none());
}

#[test]
fn gate_is_closed_for_the_rest_of_the_window() {
    let mut state = ThrottleState::default();
    let start = Instant::now();
    state.record_execution(start);

    let period = Duration::from_millis(500);

    assert_eq!(
        state.gate(start + Duration::from_millis(200), period),
        Gate::Closed(Duration::from_millis(300))
    );
    assert_eq!(state.gate(start, period), Gate::Closed(period));
}

#[test]
fn gate_opens_exactly_at_period() {
    let mut state = ThrottleState::default();
    let start = Instant::now();
    state.record_execution(start);

    let period = Duration::from_millis(500);

    assert_eq!(state.gate(start + period, period), Gate::Open);
    assert_eq!(
        state.gate(start + period + Duration::from_millis(1), period),
        Gate::Open
    );
}

#[test]
fn gate_never_yields_negative_wait_for_stale_now() {
    let mut state = ThrottleState::default();
    let start = Instant::now();
    state.record_execution(start + Duration::from_millis(10));

    // `now` captured before the recorded execution.
    let period = Duration::from_millis(50);
    assert_eq!(state.gate(start, period), Gate::Closed(period));
}

#[test]
fn zero_period_gate_is_always_open() {
    let mut state = ThrottleState::default();
    let start = Instant::now();
    state.record_execution(start);

    assert_eq!(state.gate(start, Duration::ZERO), Gate::Open);
}

#[test]
fn record_execution_is_monotonic() {
    let mut state = ThrottleState::default();
    let start = Instant::now();
    let later = start + Duration::from_millis(100);

    state.record_execution(later);
    state.record_execution(start);
    assert_eq!(state.last_execution(), Some(later));

    let latest = later + Duration::from_millis(1);
    state.record_execution(latest);
    assert_eq!(state.last_execution(), Some(latest));
}

#[test]
fn admit_rejects_when_full() {
    let mut set = set(2);

    admit(&mut set).unwrap();
    admit(&mut set).unwrap();

    let err = admit(&mut set).unwrap_err();
    assert!(matches!(err, ThrottledError::PoolExhausted { capacity: 2 }));
    assert_eq!(set.len(), 2);
}

#[test]
fn admit_does_not_spawn_when_full() {
    let mut set = set(1);
    admit(&mut set).unwrap();

    let mut spawned = false;
    let result = set.admit(|| {
        spawned = true;
        Ok(FakeHandle(Arc::new(AtomicBool::new(false))))
    });

    assert!(result.is_err());
    assert!(!spawned);
}

#[test]
fn admit_prunes_finished_tasks_first() {
    let mut set = set(2);

    let first = admit(&mut set).unwrap();
    admit(&mut set).unwrap();
    assert!(admit(&mut set).is_err());

    first.store(true, Ordering::SeqCst);

    admit(&mut set).unwrap();
    assert_eq!(set.len(), 2);
}

#[test]
fn prune_removes_only_finished_tasks() {
    let mut set = set(3);

    let a = admit(&mut set).unwrap();
    let _b = admit(&mut set).unwrap();
    let c = admit(&mut set).unwrap();

    a.store(true, Ordering::SeqCst);
    c.store(true, Ordering::SeqCst);

    set.prune();
    assert_eq!(set.len(), 1);
}

#[test]
fn failed_spawn_registers_nothing() {
    let mut set = set(2);

    let err = set
        .admit(|| Err(ThrottledError::Spawn(std::io::Error::other("no threads"))))
        .unwrap_err();

    assert!(matches!(err, ThrottledError::Spawn(_)));
    assert_eq!(set.len(), 0);
}
