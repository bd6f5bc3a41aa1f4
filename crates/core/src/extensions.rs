//! Bundled extension commands.

use std::io;

use crate::buttons::ButtonState;
use crate::command::{press_for, Command, MacroCommand};
use crate::context::{ExecutionContext, ParseContext};
use crate::logger;
use crate::parsers::{CommandParser, NamedParser};
use crate::sink::OutputSink;
use crate::sleep::CancelToken;

/// Integer store key holding the Reset RNG seed for the current run.
pub const SEED_KEY: &str = "Reset seed";

/// (buttons, hold ms, pause after ms) of the soft-reset sequence.
const SOFT_RESET: [(ButtonState, u32, u32); 5] = [
    (ButtonState::Z, 200, 2000),
    (ButtonState::LEFT, 200, 1000),
    (ButtonState::A, 200, 1000),
    (ButtonState::A, 200, 1000),
    (ButtonState::TL, 4000, 0),
];

/// Next value of the 32-bit LCG driving the Reset seed.
pub fn next_seed(seed: u32) -> u32 {
    seed.wrapping_mul(0x41C6_4E6D).wrapping_add(0x6073)
}

/// `Reset`: advance the seed and soft-reset the console.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResetParser;

impl CommandParser for ResetParser {
    fn parse(&self, args: &[&str], _ctx: &mut ParseContext) -> Result<Command, String> {
        if !args.is_empty() {
            return Err("invalid number of arguments".into());
        }
        Ok(Command::Extension(Box::new(ResetCommand)))
    }
}

impl NamedParser for ResetParser {
    const NAME: &'static str = "Reset";
}

#[derive(Debug)]
pub struct ResetCommand;

impl MacroCommand for ResetCommand {
    fn execute(
        &self,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
        ctx: &mut ExecutionContext<'_>,
    ) -> io::Result<()> {
        let previous = ctx.store().int(SEED_KEY).unwrap_or(0) as u32;
        let seed = next_seed(previous);
        ctx.store_mut().set_int(SEED_KEY, i64::from(seed));
        logger::info_p("reset", &format!("seed {:04X}", seed >> 16));

        for (state, hold_ms, pause_ms) in SOFT_RESET {
            if cancel.is_cancelled() {
                return Ok(());
            }
            if press_for(sink, state, hold_ms, cancel, ctx)? {
                return Ok(());
            }
            if ctx.wait(pause_ms, cancel) {
                return Ok(());
            }
        }
        Ok(())
    }
}
