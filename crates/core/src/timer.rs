use std::fmt;
use std::time::{Duration, Instant};

use crate::sleep::{wait_until, CancelToken};

/// Number of labeled timers (labels 0-9).
pub const TIMER_COUNT: usize = 10;

/// NTSC frame rate of the target hardware.
pub const FRAME_RATE: f64 = 59.7275;

/// Millisecond boundary at which `frame` is reached.
pub fn frame_to_ms(frame: u32) -> u64 {
    (f64::from(frame) * 1000.0 / FRAME_RATE) as u64
}

/// Whole frames contained in `ms` milliseconds.
pub fn ms_to_frames(ms: u64) -> i64 {
    (ms as f64 * FRAME_RATE / 1000.0) as i64
}

/// Label of one of the ten named timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(u8);

impl Label {
    pub const ZERO: Self = Self(0);

    pub fn new(n: u8) -> Option<Self> {
        (usize::from(n) < TIMER_COUNT).then_some(Self(n))
    }

    /// Parse the single-digit form used by `-s=`/`-l=` options.
    pub fn parse_digit(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => c.to_digit(10).and_then(|d| Self::new(d as u8)),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bank of elapsed-time clocks: ten labeled ones plus an anonymous one used
/// for plain delays. Timing only; whether a label may be used is decided at
/// compile time.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    labeled: [Option<Instant>; TIMER_COUNT],
    anonymous: Option<Instant>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset `label` to zero and mark it started. Returns the restart instant.
    pub fn restart(&mut self, label: Label) -> Instant {
        let now = Instant::now();
        self.labeled[label.index()] = Some(now);
        now
    }

    pub fn is_started(&self, label: Label) -> bool {
        self.labeled[label.index()].is_some()
    }

    /// Elapsed time since the last restart; zero for a timer never started.
    pub fn elapsed(&self, label: Label) -> Duration {
        self.labeled[label.index()].map_or(Duration::ZERO, |t| t.elapsed())
    }

    pub fn elapsed_ms(&self, label: Label) -> u64 {
        self.elapsed(label).as_millis() as u64
    }

    /// Reset the anonymous timer to zero.
    pub fn restart_anonymous(&mut self) -> Instant {
        let now = Instant::now();
        self.anonymous = Some(now);
        now
    }

    /// Wait `duration_ms` on the anonymous timer. With `restart_first` the
    /// wait counts from now, otherwise from the anonymous timer's last
    /// restart (from now if it was never restarted). Returns true when
    /// cancelled.
    pub fn wait(&mut self, duration_ms: u64, cancel: &CancelToken, restart_first: bool) -> bool {
        let origin = match self.anonymous {
            Some(t) if !restart_first => t,
            _ => self.restart_anonymous(),
        };
        wait_until(origin + Duration::from_millis(duration_ms), cancel)
    }

    /// Block until `label` has been running for `boundary_ms`, without
    /// restarting it. A timer that was never started counts from now.
    pub fn wait_on(&self, label: Label, boundary_ms: u64, cancel: &CancelToken) -> bool {
        let origin = self.labeled[label.index()].unwrap_or_else(Instant::now);
        wait_until(origin + Duration::from_millis(boundary_ms), cancel)
    }
}
