//! Per-run and per-compile state handed to every command.

use crate::compiler::HitPlanEntry;
use crate::progress::Progress;
use crate::sleep::CancelToken;
use crate::store::ContextStore;
use crate::timer::{Label, TimerRegistry, TIMER_COUNT};

/// State of one run. Created when a run starts, dropped when it ends.
pub struct ExecutionContext<'a> {
    timers: TimerRegistry,
    progress: &'a Progress,
    store: ContextStore,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(progress: &'a Progress) -> Self {
        Self { timers: TimerRegistry::new(), progress, store: ContextStore::new() }
    }

    /// Restart `label` and activate the hit cursor if no hit has begun.
    pub fn start_timer(&mut self, label: Label) {
        self.restart_timer(label);
        self.progress.activate_hits();
    }

    /// Restart `label` without touching the hit cursor.
    pub fn restart_timer(&mut self, label: Label) {
        let at = self.timers.restart(label);
        self.progress.mark_timer(label, at);
    }

    /// Plain cancelable delay on the anonymous timer. Returns true when cancelled.
    pub fn wait(&mut self, duration_ms: u32, cancel: &CancelToken) -> bool {
        self.wait_from(duration_ms, cancel, true)
    }

    /// Reset the anonymous timer so a later `wait_from(.., false)` counts
    /// from here.
    pub fn restart_wait_timer(&mut self) {
        self.timers.restart_anonymous();
    }

    /// Wait on the anonymous timer, counting from now with `restart_first`
    /// or from its last restart without. Returns true when cancelled.
    pub fn wait_from(&mut self, duration_ms: u32, cancel: &CancelToken, restart_first: bool) -> bool {
        self.timers.wait(u64::from(duration_ms), cancel, restart_first)
    }

    /// Block until `label` has run for `boundary_ms`. Returns true when cancelled.
    pub fn wait_on(&self, label: Label, boundary_ms: u64, cancel: &CancelToken) -> bool {
        self.timers.wait_on(label, boundary_ms, cancel)
    }

    pub fn next_hit(&self) {
        self.progress.next_hit();
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ContextStore {
        &mut self.store
    }
}

/// State threaded through one compilation.
#[derive(Debug, Default)]
pub struct ParseContext {
    line: usize,
    started: [bool; TIMER_COUNT],
    hit_plan: Vec<HitPlanEntry>,
    store: ContextStore,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1-based number of the line being parsed.
    pub fn line_number(&self) -> usize {
        self.line + 1
    }

    pub(crate) fn set_line(&mut self, index: usize) {
        self.line = index;
    }

    pub fn timer_started(&self, label: Label) -> bool {
        self.started[label.index()]
    }

    pub fn set_timer_started(&mut self, label: Label) {
        self.started[label.index()] = true;
    }

    /// Claim `label` for a new Start; fails if some earlier line already did.
    pub fn claim_timer(&mut self, label: Label) -> Result<(), String> {
        if self.timer_started(label) {
            return Err(format!("timer {} is already started", label));
        }
        self.set_timer_started(label);
        Ok(())
    }

    pub fn add_hit_plan(&mut self, label: Label, frame: u32) {
        self.hit_plan.push(HitPlanEntry { label, frame });
    }

    pub fn hit_plan(&self) -> &[HitPlanEntry] {
        &self.hit_plan
    }

    pub(crate) fn into_hit_plan(self) -> Vec<HitPlanEntry> {
        self.hit_plan
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ContextStore {
        &mut self.store
    }
}
