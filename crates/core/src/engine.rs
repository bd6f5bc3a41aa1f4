use std::io;
use std::sync::Arc;

use crate::compiler::CompiledScript;
use crate::context::ExecutionContext;
use crate::progress::{Progress, ProgressSnapshot, IDLE};
use crate::sink::OutputSink;
use crate::sleep::CancelToken;

/// How a run ended when the sink did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Interrupted,
}

/// Puts progress back to idle however the run ends.
struct IdleGuard<'a>(&'a Progress);

impl Drop for IdleGuard<'_> {
    fn drop(&mut self) {
        self.0.reset();
    }
}

/// Runs a compiled script against a sink and publishes its progress.
/// One executor must not run twice at the same time; the `&mut` sink
/// enforces that per sink, the host enforces it per executor.
#[derive(Debug, Clone)]
pub struct Executor {
    script: Arc<CompiledScript>,
    progress: Arc<Progress>,
}

impl Executor {
    pub fn new(script: Arc<CompiledScript>) -> Self {
        Self::with_progress(script, Arc::new(Progress::new()))
    }

    /// Publish progress into an existing `Progress` shared with an observer.
    pub fn with_progress(script: Arc<CompiledScript>, progress: Arc<Progress>) -> Self {
        Self { script, progress }
    }

    pub fn script(&self) -> &Arc<CompiledScript> {
        &self.script
    }

    pub fn progress(&self) -> &Arc<Progress> {
        &self.progress
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.progress.snapshot(self.script.hit_plan())
    }

    /// Execute every command once, in order.
    pub fn run_once(&self, sink: &mut dyn OutputSink, cancel: &CancelToken) -> io::Result<RunOutcome> {
        self.progress.reset();
        let _idle = IdleGuard(&self.progress);
        let mut ctx = ExecutionContext::new(&self.progress);

        self.run_pass(sink, cancel, &mut ctx)?;
        Ok(outcome(cancel))
    }

    /// Repeat the script `times` times, or until cancelled when `times < 0`.
    pub fn run_loop(&self, sink: &mut dyn OutputSink, cancel: &CancelToken, times: i32) -> io::Result<RunOutcome> {
        self.progress.reset();
        let _idle = IdleGuard(&self.progress);
        let mut ctx = ExecutionContext::new(&self.progress);

        let mut iteration = 0;
        while times < 0 || iteration < times {
            if cancel.is_cancelled() {
                break;
            }
            self.progress.set_loop_index(if times < 0 { IDLE } else { iteration });
            self.run_pass(sink, cancel, &mut ctx)?;
            iteration = iteration.saturating_add(1);
        }
        Ok(outcome(cancel))
    }

    fn run_pass(
        &self,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
        ctx: &mut ExecutionContext<'_>,
    ) -> io::Result<()> {
        for step in self.script.steps() {
            if cancel.is_cancelled() {
                break;
            }
            self.progress.set_command(step.index, step.line);
            step.command.execute(sink, cancel, ctx)?;
        }
        self.progress.end_pass();
        Ok(())
    }
}

fn outcome(cancel: &CancelToken) -> RunOutcome {
    if cancel.is_cancelled() {
        RunOutcome::Interrupted
    } else {
        RunOutcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::buttons::ButtonState;
    use crate::command::{Command, MacroCommand};
    use crate::compiler::compile_str;
    use crate::context::ParseContext;
    use crate::parsers::CommandParser;
    use crate::registry::Registry;
    use crate::sink::stub::RecordingSink;

    /// Counts invocations, records what it saw, and may cancel
    /// the run after a number of calls.
    #[derive(Debug, Default)]
    struct Tally {
        calls: AtomicUsize,
        cancel_after: Option<usize>,
        cancel: Mutex<Option<CancelToken>>,
        progress: Mutex<Option<Arc<Progress>>>,
        seen_loops: Mutex<Vec<i32>>,
        seen_lines: Mutex<Vec<i32>>,
        seen_store: Mutex<Vec<i64>>,
    }

    #[derive(Debug)]
    struct TallyCommand(Arc<Tally>);

    impl MacroCommand for TallyCommand {
        fn execute(
            &self,
            _sink: &mut dyn OutputSink,
            _cancel: &CancelToken,
            ctx: &mut ExecutionContext<'_>,
        ) -> io::Result<()> {
            let tally = &self.0;
            let n = tally.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(progress) = tally.progress.lock().unwrap().as_ref() {
                tally.seen_loops.lock().unwrap().push(progress.loop_index());
                tally.seen_lines.lock().unwrap().push(progress.line());
            }
            let count = ctx.store().int("tally").unwrap_or(0) + 1;
            ctx.store_mut().set_int("tally", count);
            tally.seen_store.lock().unwrap().push(count);
            if tally.cancel_after == Some(n) {
                if let Some(token) = tally.cancel.lock().unwrap().as_ref() {
                    token.cancel();
                }
            }
            Ok(())
        }
    }

    struct TallyParser(Arc<Tally>);

    impl CommandParser for TallyParser {
        fn parse(&self, _args: &[&str], _ctx: &mut ParseContext) -> Result<Command, String> {
            Ok(Command::Extension(Box::new(TallyCommand(Arc::clone(&self.0)))))
        }
    }

    fn executor(src: &str, tally: &Arc<Tally>) -> Executor {
        let mut registry = Registry::new();
        registry.register_parser("Tally", Box::new(TallyParser(Arc::clone(tally)))).unwrap();
        let script = compile_str(src, &registry).unwrap();
        let exec = Executor::new(Arc::new(script));
        *tally.progress.lock().unwrap() = Some(Arc::clone(exec.progress()));
        exec
    }

    fn tally_with_cancel(after: usize, token: &CancelToken) -> Arc<Tally> {
        Arc::new(Tally {
            cancel_after: Some(after),
            cancel: Mutex::new(Some(token.clone())),
            ..Tally::default()
        })
    }

    #[test]
    fn run_once_executes_every_command() {
        let tally = Arc::new(Tally::default());
        let exec = executor("Tally\n# gap\nTally\nWait 1\nTally", &tally);
        assert!(exec.snapshot().is_idle());

        let mut sink = RecordingSink::new();
        let outcome = exec.run_once(&mut sink, &CancelToken::new()).unwrap();

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(tally.calls.load(Ordering::SeqCst), 3);
        assert_eq!(*tally.seen_lines.lock().unwrap(), vec![0, 2, 4]);
        assert_eq!(*tally.seen_loops.lock().unwrap(), vec![-1, -1, -1]);
        assert!(exec.snapshot().is_idle());
    }

    #[test]
    fn cancel_mid_run_stops_early() {
        let cancel = CancelToken::new();
        let tally = tally_with_cancel(2, &cancel);
        let exec = executor("Tally\nTally\nTally\nTally", &tally);

        let outcome = exec.run_once(&mut RecordingSink::new(), &cancel).unwrap();

        assert_eq!(outcome, RunOutcome::Interrupted);
        assert_eq!(tally.calls.load(Ordering::SeqCst), 2);
        assert!(exec.snapshot().is_idle());
    }

    #[test]
    fn run_loop_counts_iterations() {
        let tally = Arc::new(Tally::default());
        let exec = executor("Tally\nTally", &tally);

        let outcome = exec.run_loop(&mut RecordingSink::new(), &CancelToken::new(), 3).unwrap();

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(tally.calls.load(Ordering::SeqCst), 6);
        assert_eq!(*tally.seen_loops.lock().unwrap(), vec![0, 0, 1, 1, 2, 2]);
        // the store lives for the whole invocation
        assert_eq!(*tally.seen_store.lock().unwrap(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(exec.progress().loop_index(), IDLE);
    }

    #[test]
    fn run_loop_zero_times_does_nothing() {
        let tally = Arc::new(Tally::default());
        let exec = executor("Tally", &tally);
        let outcome = exec.run_loop(&mut RecordingSink::new(), &CancelToken::new(), 0).unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(tally.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unbounded_loop_ends_only_on_cancel() {
        let cancel = CancelToken::new();
        let tally = tally_with_cancel(25, &cancel);
        let exec = executor("Tally\nTally\nTally", &tally);

        let outcome = exec.run_loop(&mut RecordingSink::new(), &cancel, -1).unwrap();

        assert_eq!(outcome, RunOutcome::Interrupted);
        assert_eq!(tally.calls.load(Ordering::SeqCst), 25);
        assert!(tally.seen_loops.lock().unwrap().iter().all(|&l| l == IDLE));
        assert!(exec.snapshot().is_idle());
    }

    #[test]
    fn store_is_fresh_per_invocation() {
        let tally = Arc::new(Tally::default());
        let exec = executor("Tally", &tally);
        let mut sink = RecordingSink::new();
        exec.run_once(&mut sink, &CancelToken::new()).unwrap();
        exec.run_once(&mut sink, &CancelToken::new()).unwrap();
        assert_eq!(*tally.seen_store.lock().unwrap(), vec![1, 1]);
    }

    #[test]
    fn always_cancelled_leaves_idle_state() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let tally = Arc::new(Tally::default());
        let exec = executor("Start -s=0\nPress A -s=1\nHit B 30 -l=1\nTally", &tally);
        let mut sink = RecordingSink::new();

        assert_eq!(exec.run_once(&mut sink, &cancel).unwrap(), RunOutcome::Interrupted);
        assert_eq!(exec.run_loop(&mut sink, &cancel, -1).unwrap(), RunOutcome::Interrupted);

        assert_eq!(tally.calls.load(Ordering::SeqCst), 0);
        assert!(sink.records().is_empty());
        assert!(exec.snapshot().is_idle());
        assert!(!exec.progress().any_timer_started());
    }

    #[test]
    fn hit_plan_progress_during_run() {
        let tally = Arc::new(Tally::default());
        // tally runs between the Start and the Hit, when the cursor is at 0
        let exec = executor("Start -s=0\nTally\nHit A 12 -d=1", &tally);
        let mut sink = RecordingSink::new();

        let observer = Arc::clone(exec.progress());
        let plan = exec.script().hit_plan().to_vec();
        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..100 {
                if let Some(frames) = observer.remaining_frames(&plan) {
                    seen.push(frames);
                }
                std::thread::sleep(Duration::from_millis(2));
            }
            seen
        });

        exec.run_once(&mut sink, &CancelToken::new()).unwrap();
        let seen = handle.join().unwrap();

        assert!(seen.iter().all(|&f| f <= 12));
        assert_eq!(sink.states(), vec![ButtonState::A, ButtonState::ALL_RELEASED]);
        assert!(exec.snapshot().is_idle());
    }

    struct FailingSink;

    impl OutputSink for FailingSink {
        fn write(&mut self, _bytes: &[u8]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
        }
    }

    #[test]
    fn sink_errors_propagate_and_reset() {
        let tally = Arc::new(Tally::default());
        let exec = executor("Press A -d=1\nTally", &tally);
        let err = exec.run_once(&mut FailingSink, &CancelToken::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(tally.calls.load(Ordering::SeqCst), 0);
        assert!(exec.snapshot().is_idle());
    }
}
