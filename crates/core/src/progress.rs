use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::compiler::HitPlanEntry;
use crate::timer::{ms_to_frames, Label, TIMER_COUNT};

/// Value of every index field while no run is active.
pub const IDLE: i32 = -1;

/// Live run state for observers. Each field is an independent atomic; a
/// reader may see fields from slightly different moments.
#[derive(Debug)]
pub struct Progress {
    epoch: Instant,
    command_index: AtomicI32,
    line: AtomicI32,
    loop_index: AtomicI32,
    hit_index: AtomicI32,
    // nanos since `epoch` + 1 of each label's last restart, 0 = not started
    timer_marks: [AtomicU64; TIMER_COUNT],
}

/// Point-in-time copy of [`Progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub command_index: i32,
    /// 0-based source line of the current command.
    pub line: i32,
    pub loop_index: i32,
    pub hit_index: i32,
    pub remaining_frames: Option<i64>,
}

impl ProgressSnapshot {
    pub fn is_idle(&self) -> bool {
        self.command_index == IDLE && self.line == IDLE && self.hit_index == IDLE
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            command_index: AtomicI32::new(IDLE),
            line: AtomicI32::new(IDLE),
            loop_index: AtomicI32::new(IDLE),
            hit_index: AtomicI32::new(IDLE),
            timer_marks: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    pub fn command_index(&self) -> i32 {
        self.command_index.load(Ordering::Relaxed)
    }

    pub fn line(&self) -> i32 {
        self.line.load(Ordering::Relaxed)
    }

    pub fn loop_index(&self) -> i32 {
        self.loop_index.load(Ordering::Relaxed)
    }

    pub fn hit_index(&self) -> i32 {
        self.hit_index.load(Ordering::Relaxed)
    }

    pub(crate) fn set_command(&self, index: usize, line: usize) {
        self.command_index.store(index as i32, Ordering::Relaxed);
        self.line.store(line as i32, Ordering::Relaxed);
    }

    pub(crate) fn set_loop_index(&self, index: i32) {
        self.loop_index.store(index, Ordering::Relaxed);
    }

    /// Activate the hit cursor at 0 unless a hit is already underway.
    pub(crate) fn activate_hits(&self) {
        let _ = self
            .hit_index
            .compare_exchange(IDLE, 0, Ordering::Relaxed, Ordering::Relaxed);
    }

    pub(crate) fn next_hit(&self) {
        self.hit_index.fetch_add(1, Ordering::Relaxed);
    }

    /// Command index and hit cursor back to idle (end of one pass).
    pub(crate) fn end_pass(&self) {
        self.command_index.store(IDLE, Ordering::Relaxed);
        self.line.store(IDLE, Ordering::Relaxed);
        self.hit_index.store(IDLE, Ordering::Relaxed);
    }

    /// Everything back to idle, including published timers.
    pub(crate) fn reset(&self) {
        self.end_pass();
        self.loop_index.store(IDLE, Ordering::Relaxed);
        for mark in &self.timer_marks {
            mark.store(0, Ordering::Relaxed);
        }
    }

    pub(crate) fn mark_timer(&self, label: Label, at: Instant) {
        let nanos = at.saturating_duration_since(self.epoch).as_nanos() as u64;
        self.timer_marks[label.index()].store(nanos + 1, Ordering::Relaxed);
    }

    pub fn timer_started(&self, label: Label) -> bool {
        self.timer_marks[label.index()].load(Ordering::Relaxed) != 0
    }

    /// Elapsed time of `label` as last published by the run.
    pub fn timer_elapsed(&self, label: Label) -> Duration {
        match self.timer_marks[label.index()].load(Ordering::Relaxed) {
            0 => Duration::ZERO,
            mark => {
                let started = self.epoch + Duration::from_nanos(mark - 1);
                started.elapsed()
            }
        }
    }

    /// Frames left until the hit at the cursor, `None` outside the plan.
    pub fn remaining_frames(&self, plan: &[HitPlanEntry]) -> Option<i64> {
        let index = usize::try_from(self.hit_index()).ok()?;
        let entry = plan.get(index)?;
        let elapsed = self.timer_elapsed(entry.label).as_millis() as u64;
        Some(i64::from(entry.frame) - ms_to_frames(elapsed))
    }

    pub fn snapshot(&self, plan: &[HitPlanEntry]) -> ProgressSnapshot {
        ProgressSnapshot {
            command_index: self.command_index(),
            line: self.line(),
            loop_index: self.loop_index(),
            hit_index: self.hit_index(),
            remaining_frames: self.remaining_frames(plan),
        }
    }

    pub fn any_timer_started(&self) -> bool {
        self.timer_marks.iter().any(|m| m.load(Ordering::Relaxed) != 0)
    }
}
