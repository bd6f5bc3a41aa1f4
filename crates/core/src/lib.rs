pub mod buttons;
pub mod command;
pub mod compiler;
pub mod context;
pub mod engine;
pub mod error;
pub mod extensions;
pub mod logger;
pub mod parsers;
pub mod progress;
pub mod registry;
pub mod runner;
pub mod settings;
pub mod sink;
pub mod sleep;
pub mod store;
pub mod timer;
pub mod types;

pub use buttons::ButtonState;
pub use compiler::{compile, compile_str, CompiledScript, HitPlanEntry};
pub use engine::{Executor, RunOutcome};
pub use error::{CompileError, RegistryError};
pub use registry::Registry;
pub use sleep::CancelToken;
