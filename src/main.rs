use std::io;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    execute,
    event::{EnableMouseCapture, DisableMouseCapture},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use orca_core::extensions::ResetParser;
use orca_core::progress::Progress;
use orca_core::runner::Runner;
use orca_core::settings::Settings;
use orca_core::sink::{create_sink, OutputSink};
use orca_core::types::{Command, Session};
use orca_core::{compile_str, logger, CancelToken, Executor, Registry, RunOutcome};

#[derive(Parser)]
#[command(version, about = "Frame-timed controller macro runner")]
struct Cli {
    /// Record frames instead of writing to the device
    #[arg(long, global = true)]
    stub: bool,

    /// Device node of the controller emulator
    #[arg(long, global = true, value_name = "PATH")]
    device: Option<PathBuf>,

    /// Loop count for `run` and the `l` key; negative loops until stopped
    #[arg(long = "loop", global = true, value_name = "N", allow_hyphen_values = true)]
    loop_times: Option<i32>,

    /// Macro to open in the TUI
    #[arg(long = "macro", value_name = "FILE")]
    macro_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a macro and report errors
    Check { file: PathBuf },
    /// Run a macro without the TUI
    Run { file: PathBuf },
}

fn registry() -> Result<Registry> {
    let mut registry = Registry::new();
    registry.register::<ResetParser>()?;
    Ok(registry)
}

fn read_macro(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn check(path: &Path) -> Result<()> {
    let script = compile_str(&read_macro(path)?, &registry()?)
        .with_context(|| format!("{} does not compile", path.display()))?;
    println!(
        "{}: {} command(s), {} planned hit(s)",
        path.display(),
        script.len(),
        script.hit_plan().len()
    );
    Ok(())
}

/// Run `executor` on `sink` until it completes or `cancel` fires, then close
/// the sink whatever the outcome.
fn drive(
    executor: &Executor,
    sink: &mut dyn OutputSink,
    cancel: &CancelToken,
    loop_count: Option<i32>,
) -> Result<RunOutcome> {
    let outcome = match loop_count {
        Some(times) => executor.run_loop(sink, cancel, times),
        None => executor.run_once(sink, cancel),
    };
    let closed = sink.close();

    let outcome = outcome.context("output failed")?;
    closed?;
    Ok(outcome)
}

fn run_headless(path: &Path, settings: &Settings, work_dir: &Path) -> Result<()> {
    logger::set_echo(true);
    let script = compile_str(&read_macro(path)?, &registry()?)
        .with_context(|| format!("{} does not compile", path.display()))?;
    let mut sink = create_sink(settings.device.as_deref(), settings.stub, &work_dir.join("logs"))?;

    let cancel = CancelToken::new();
    let token = cancel.clone();
    ctrlc::set_handler(move || token.cancel()).context("failed to install Ctrl-C handler")?;

    let executor = Executor::new(Arc::new(script));
    logger::info_p("macro", &format!("running {} (Ctrl-C to stop)", path.display()));
    match drive(&executor, sink.as_mut(), &cancel, settings.loop_count())? {
        RunOutcome::Completed => logger::info_p("macro", "macro finished"),
        RunOutcome::Interrupted => logger::info_p("macro", "interrupted"),
    }
    Ok(())
}

fn run_tui(settings: Settings, settings_path: PathBuf, work_dir: &Path) -> Result<()> {
    let sink = create_sink(settings.device.as_deref(), settings.stub, &work_dir.join("logs"))?;

    // Shared state
    let session = Arc::new(Mutex::new(Session::new(settings.macro_path.clone())));
    let progress = Arc::new(Progress::new());

    // Channels
    let (log_tx, log_rx) = mpsc::channel::<String>();
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();

    logger::set_tui_sender(log_tx);
    logger::info("orca started");

    let mut runner = Runner::new(registry()?, sink, Arc::clone(&session), Arc::clone(&progress));
    if let Some(path) = &settings.macro_path {
        if let Err(e) = runner.compile_file(path) {
            logger::error_p("macro", &format!("{:#}", e));
        }
    }
    let runner_thread = thread::spawn(move || runner.run(cmd_rx));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = orca_tui::App::new(session, progress, settings, settings_path, log_rx, cmd_tx);
    let result = orca_tui::event::run(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    // Dropping the app closes the command channel if quit was never sent
    drop(app);
    if runner_thread.join().is_err() {
        eprintln!("runner thread panicked");
    }

    result
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let work_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    logger::init(&work_dir.join("logs"))?;
    logger::register_prefix("macro", logger::COLOR_BLUE);
    logger::register_prefix("reset", logger::COLOR_GREEN);

    let settings_path = work_dir.join("settings.json");
    let mut settings = Settings::load(&settings_path);
    settings.stub |= cli.stub;
    if cli.device.is_some() {
        settings.device = cli.device;
    }
    if let Some(times) = cli.loop_times {
        settings.loop_enabled = true;
        settings.loop_times = times;
    }
    if cli.macro_file.is_some() {
        settings.macro_path = cli.macro_file;
    }

    match cli.command {
        Some(Commands::Check { file }) => check(&file),
        Some(Commands::Run { file }) => run_headless(&file, &settings, &work_dir),
        None => run_tui(settings, settings_path, &work_dir),
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::thread;
    use std::time::Duration;

    use orca_core::ButtonState;

    use super::*;

    #[derive(Default)]
    struct Held {
        frames: Vec<Vec<u8>>,
        closed: bool,
    }

    impl OutputSink for Held {
        fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.frames.push(bytes.to_vec());
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    #[test]
    fn cancelled_unbounded_run_closes_sink() {
        let script = compile_str("Press A -d=20\nWait 5", &registry().unwrap()).unwrap();
        let executor = Executor::new(Arc::new(script));
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(60));
            token.cancel();
        });

        let mut sink = Held::default();
        let outcome = drive(&executor, &mut sink, &cancel, Some(-1)).unwrap();
        stopper.join().unwrap();

        assert_eq!(outcome, RunOutcome::Interrupted);
        assert!(sink.closed);
        assert_eq!(sink.frames.last(), Some(&ButtonState::ALL_RELEASED.frame().to_vec()));
    }

    #[test]
    fn completed_run_closes_sink() {
        let script = compile_str("Wait 1", &registry().unwrap()).unwrap();
        let executor = Executor::new(Arc::new(script));
        let mut sink = Held::default();
        let outcome = drive(&executor, &mut sink, &CancelToken::new(), None).unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
        assert!(sink.closed);
    }
}
