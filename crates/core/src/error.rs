use thiserror::Error;

/// Why a macro failed to compile. Compilation stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("line {line}: invalid command name `{name}`")]
    UnknownCommand { line: usize, name: String },

    #[error("line {line}: {command}: {message}")]
    Command { line: usize, command: String, message: String },

    #[error("no valid commands")]
    Empty,
}

impl CompileError {
    /// 1-based line of the offending instruction, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            CompileError::UnknownCommand { line, .. } | CompileError::Command { line, .. } => Some(*line),
            CompileError::Empty => None,
        }
    }
}

/// Why an extension could not be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("`{0}` is a reserved command name")]
    Reserved(String),

    #[error("command `{0}` is already registered")]
    Duplicate(String),

    #[error("`{0}` is not a usable command name")]
    InvalidName(String),
}
