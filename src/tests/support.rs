use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

/// Start times of every execution of a test action.
#[derive(Clone, Default)]
pub(super) struct Executions(Arc<Mutex<Vec<Instant>>>);

impl Executions {
    pub(super) fn record(&self) {
        self.0.lock().unwrap().push(Instant::now());
    }

    pub(super) fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub(super) fn starts(&self) -> Vec<Instant> {
        self.0.lock().unwrap().clone()
    }

    pub(super) fn assert_spaced_by(&self, period: Duration) {
        let starts = self.starts();

        for pair in starts.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(
                gap >= period,
                "executions started {gap:?} apart, expected at least {period:?}"
            );
        }
    }
}

/// Poll `pending` until it reports zero, failing the test after `timeout`.
pub(super) fn wait_until_idle(pending: impl Fn() -> usize, timeout: Duration) {
    let deadline = Instant::now() + timeout;

    while pending() > 0 {
        assert!(
            Instant::now() < deadline,
            "tasks still pending after {timeout:?}"
        );
        std::thread::sleep(Duration::from_millis(5));
    }
}
