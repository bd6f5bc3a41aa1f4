use std::path::Path;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::compiler::compile;
use crate::engine::{Executor, RunOutcome};
use crate::logger;
use crate::progress::Progress;
use crate::registry::Registry;
use crate::sink::OutputSink;
use crate::sleep::CancelToken;
use crate::types::*;

/// The run in flight. Its thread hands the sink back when it ends.
struct ActiveRun {
    cancel: CancelToken,
    handle: JoinHandle<Box<dyn OutputSink>>,
}

/// Owns the output sink and at most one active run. Driven by [`Command`]s
/// from the TUI, publishes into the shared [`Session`] and [`Progress`].
pub struct Runner {
    registry: Registry,
    session: Arc<Mutex<Session>>,
    progress: Arc<Progress>,
    sink: Option<Box<dyn OutputSink>>,
    active: Option<ActiveRun>,
}

impl Runner {
    pub fn new(
        registry: Registry,
        sink: Box<dyn OutputSink>,
        session: Arc<Mutex<Session>>,
        progress: Arc<Progress>,
    ) -> Self {
        Self { registry, session, progress, sink: Some(sink), active: None }
    }

    pub fn session(&self) -> &Arc<Mutex<Session>> {
        &self.session
    }

    pub fn progress(&self) -> &Arc<Progress> {
        &self.progress
    }

    /// Read and compile the macro at `path`.
    pub fn compile_file(&mut self, path: &Path) -> Result<()> {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                self.session.lock().unwrap().error = Some(format!("cannot read {}: {}", path.display(), e));
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        self.compile_source(Some(path), &source)
    }

    /// Compile `source` and make it the current macro. Refused while a run
    /// is active.
    pub fn compile_source(&mut self, path: Option<&Path>, source: &str) -> Result<()> {
        self.reap();
        if self.active.is_some() {
            bail!("stop the running macro before recompiling");
        }

        let lines: Vec<String> = source.lines().map(str::to_string).collect();
        let result = compile(&lines, &self.registry);

        let mut session = self.session.lock().unwrap();
        if let Some(path) = path {
            session.macro_path = Some(path.to_path_buf());
        }
        session.source = lines;
        match result {
            Ok(script) => {
                logger::info_p("macro", &format!("compiled {} command(s)", script.len()));
                session.script = Some(Arc::new(script));
                session.error = None;
                Ok(())
            }
            Err(e) => {
                session.script = None;
                session.error = Some(e.to_string());
                Err(e).context("compile failed")
            }
        }
    }

    /// Start a run of the current macro, replacing any active one.
    /// `loop_times` is `None` for a single pass.
    fn start(&mut self, loop_times: Option<i32>) {
        self.stop_active();

        let Some(script) = self.session.lock().unwrap().script.clone() else {
            logger::warn_p("macro", "nothing compiled");
            return;
        };
        let Some(mut sink) = self.sink.take() else {
            logger::error("output sink unavailable");
            return;
        };

        {
            let mut session = self.session.lock().unwrap();
            session.state = RunnerState::Running;
            session.loop_times = loop_times;
            session.error = None;
        }
        match loop_times {
            Some(n) if n < 0 => logger::info_p("macro", "looping until stopped"),
            Some(n) => logger::info_p("macro", &format!("looping {} time(s)", n)),
            None => logger::info_p("macro", "run started"),
        }

        let cancel = CancelToken::new();
        let token = cancel.clone();
        let executor = Executor::with_progress(script, Arc::clone(&self.progress));
        let session = Arc::clone(&self.session);

        let handle = thread::spawn(move || {
            let result = match loop_times {
                Some(n) => executor.run_loop(sink.as_mut(), &token, n),
                None => executor.run_once(sink.as_mut(), &token),
            };
            let mut session = session.lock().unwrap();
            match result {
                Ok(RunOutcome::Completed) => logger::info_p("macro", "macro finished"),
                Ok(RunOutcome::Interrupted) => logger::info_p("macro", "interrupted"),
                Err(e) => {
                    logger::error_p("macro", &format!("output error: {}", e));
                    session.error = Some(e.to_string());
                }
            }
            session.state = RunnerState::Idle;
            session.loop_times = None;
            sink
        });

        self.active = Some(ActiveRun { cancel, handle });
    }

    /// Cancel the active run, if any, and wait for it to give the sink back.
    fn stop_active(&mut self) {
        let Some(run) = self.active.take() else { return };
        if !run.handle.is_finished() {
            self.session.lock().unwrap().state = RunnerState::Stopping;
            run.cancel.cancel();
        }
        match run.handle.join() {
            Ok(sink) => self.sink = Some(sink),
            Err(_) => logger::error("run thread panicked, output sink lost"),
        }
        let mut session = self.session.lock().unwrap();
        session.state = RunnerState::Idle;
        session.loop_times = None;
    }

    /// Collect a run that ended on its own.
    fn reap(&mut self) {
        if self.active.as_ref().is_some_and(|run| run.handle.is_finished()) {
            self.stop_active();
        }
    }

    /// Apply one command. Returns false on Quit.
    pub fn handle(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Compile(path) => {
                if let Err(e) = self.compile_file(&path) {
                    logger::error_p("macro", &format!("{:#}", e));
                }
            }
            Command::RunOnce => self.start(None),
            Command::RunLoop(times) => self.start(Some(times)),
            Command::Cancel => {
                if self.active.is_some() {
                    logger::info_p("macro", "stopping...");
                }
                self.stop_active();
            }
            Command::Quit => {
                logger::info("shutting down");
                self.stop_active();
                if let Some(mut sink) = self.sink.take() {
                    if let Err(e) = sink.close() {
                        logger::error(&format!("failed to close output: {:#}", e));
                    }
                }
                return false;
            }
        }
        true
    }

    /// Main loop. Runs on a background thread until Quit or until every
    /// sender is gone.
    pub fn run(mut self, cmd_rx: mpsc::Receiver<Command>) {
        loop {
            match cmd_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(cmd) => {
                    if !self.handle(cmd) {
                        return;
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => self.reap(),
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    self.handle(Command::Quit);
                    return;
                }
            }
        }
    }
}
