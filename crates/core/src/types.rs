use std::path::PathBuf;
use std::sync::Arc;

use crate::compiler::CompiledScript;

/// Lifecycle of the runner's single active run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running,
    Stopping,
}

/// Macro state shared between the runner and the TUI
pub struct Session {
    pub state: RunnerState,
    pub macro_path: Option<PathBuf>,
    /// Source lines of the last compiled macro, for display
    pub source: Vec<String>,
    pub script: Option<Arc<CompiledScript>>,
    pub error: Option<String>,
    /// Loop count of the current run, `None` for a single pass
    pub loop_times: Option<i32>,
}

impl Session {
    pub fn new(macro_path: Option<PathBuf>) -> Self {
        Self {
            state: RunnerState::Idle,
            macro_path,
            source: Vec::new(),
            script: None,
            error: None,
            loop_times: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state != RunnerState::Idle
    }
}

/// Command from TUI to runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Compile(PathBuf),
    RunOnce,
    RunLoop(i32),
    Cancel,
    Quit,
}
