use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Sleep in ticks of this size while the deadline is still far away.
const TICK: Duration = Duration::from_millis(1);

/// Below this much remaining time, spin instead of sleeping.
const SPIN_WINDOW: Duration = Duration::from_millis(2);

/// Cooperative cancellation flag shared between a run and whoever started it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Block until `deadline` or cancellation. Returns true when cancelled.
pub fn wait_until(deadline: Instant, cancel: &CancelToken) -> bool {
    loop {
        if cancel.is_cancelled() {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        if deadline - now > SPIN_WINDOW {
            thread::sleep(TICK);
        } else {
            thread::yield_now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn after(ms: u64) -> Instant {
        Instant::now() + Duration::from_millis(ms)
    }

    #[test]
    fn waits_full_duration() {
        let cancel = CancelToken::new();
        let start = Instant::now();
        assert!(!wait_until(after(15), &cancel));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn cancelled_token_returns_immediately() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let start = Instant::now();
        assert!(wait_until(after(10_000), &cancel));
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn cancel_from_other_thread() {
        let cancel = CancelToken::new();
        let remote = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });
        let start = Instant::now();
        assert!(wait_until(after(10_000), &cancel));
        assert!(start.elapsed() < Duration::from_secs(2));
        handle.join().unwrap();
    }
}
