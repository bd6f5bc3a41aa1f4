use std::fmt;
use std::io;

use crate::buttons::ButtonState;
use crate::context::ExecutionContext;
use crate::sink::OutputSink;
use crate::sleep::CancelToken;
use crate::timer::{frame_to_ms, Label};

/// Runtime half of an extension command.
pub trait MacroCommand: fmt::Debug + Send + Sync {
    /// Run the command. Cancellation is not an error: return `Ok` as soon as
    /// the token is observed. Sink errors are returned unchanged.
    fn execute(
        &self,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
        ctx: &mut ExecutionContext<'_>,
    ) -> io::Result<()>;
}

/// A compiled, validated instruction.
#[derive(Debug)]
pub enum Command {
    Press(Press),
    Wait(Wait),
    Start(Start),
    Hit(Hit),
    Extension(Box<dyn MacroCommand>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Press {
    pub groups: Vec<ButtonState>,
    pub duration_ms: u32,
    pub interval_ms: u32,
    pub start: Option<Label>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    pub duration_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Start {
    pub label: Option<Label>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub button: ButtonState,
    /// Target frame, correction already applied.
    pub frame: u32,
    pub label: Label,
    pub duration_ms: u32,
    pub start: Option<Label>,
}

/// Hold `state` for `hold_ms`, then release. A cancelled hold still releases.
/// Returns true when cancelled.
pub fn press_for(
    sink: &mut dyn OutputSink,
    state: ButtonState,
    hold_ms: u32,
    cancel: &CancelToken,
    ctx: &mut ExecutionContext<'_>,
) -> io::Result<bool> {
    sink.set_buttons(state)?;
    let cancelled = ctx.wait(hold_ms, cancel);
    sink.set_buttons(ButtonState::ALL_RELEASED)?;
    Ok(cancelled)
}

impl Command {
    /// Keyword this command was compiled from, for logs.
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Press(_) => "Press",
            Command::Wait(_) => "Wait",
            Command::Start(_) => "Start",
            Command::Hit(_) => "Hit",
            Command::Extension(_) => "extension",
        }
    }

    pub fn execute(
        &self,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
        ctx: &mut ExecutionContext<'_>,
    ) -> io::Result<()> {
        match self {
            Command::Press(press) => press.execute(sink, cancel, ctx),
            Command::Wait(wait) => {
                ctx.wait(wait.duration_ms, cancel);
                Ok(())
            }
            Command::Start(start) => {
                if let Some(label) = start.label {
                    ctx.restart_timer(label);
                }
                ctx.next_hit();
                Ok(())
            }
            Command::Hit(hit) => hit.execute(sink, cancel, ctx),
            Command::Extension(ext) => ext.execute(sink, cancel, ctx),
        }
    }
}

impl Press {
    fn execute(
        &self,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
        ctx: &mut ExecutionContext<'_>,
    ) -> io::Result<()> {
        if let Some(label) = self.start {
            ctx.start_timer(label);
        }
        for &group in &self.groups {
            if cancel.is_cancelled() {
                return Ok(());
            }
            if press_for(sink, group, self.duration_ms, cancel, ctx)? {
                return Ok(());
            }
            if ctx.wait(self.interval_ms, cancel) {
                return Ok(());
            }
        }
        Ok(())
    }
}

impl Hit {
    /// Millisecond boundary on `label` at which the press fires.
    pub fn boundary_ms(&self) -> u64 {
        frame_to_ms(self.frame)
    }

    fn execute(
        &self,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
        ctx: &mut ExecutionContext<'_>,
    ) -> io::Result<()> {
        if ctx.wait_on(self.label, self.boundary_ms(), cancel) {
            return Ok(());
        }
        ctx.next_hit();
        if let Some(label) = self.start {
            ctx.start_timer(label);
        }
        press_for(sink, self.button, self.duration_ms, cancel, ctx)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::progress::Progress;
    use crate::sink::stub::RecordingSink;

    fn label(n: u8) -> Label {
        Label::new(n).unwrap()
    }

    #[test]
    fn press_groups_in_order() {
        let progress = Progress::new();
        let mut ctx = ExecutionContext::new(&progress);
        let mut sink = RecordingSink::new();
        let cmd = Command::Press(Press {
            groups: vec![ButtonState::A, ButtonState::A | ButtonState::B],
            duration_ms: 5,
            interval_ms: 5,
            start: None,
        });
        cmd.execute(&mut sink, &CancelToken::new(), &mut ctx).unwrap();
        assert_eq!(
            sink.states(),
            vec![
                ButtonState::A,
                ButtonState::ALL_RELEASED,
                ButtonState::A | ButtonState::B,
                ButtonState::ALL_RELEASED,
            ]
        );
    }

    #[test]
    fn press_start_label_activates_hits() {
        let progress = Progress::new();
        let mut ctx = ExecutionContext::new(&progress);
        let mut sink = RecordingSink::new();
        let cmd = Command::Press(Press {
            groups: vec![ButtonState::X],
            duration_ms: 0,
            interval_ms: 0,
            start: Some(label(3)),
        });
        cmd.execute(&mut sink, &CancelToken::new(), &mut ctx).unwrap();
        assert_eq!(progress.hit_index(), 0);
        assert!(ctx.timers().is_started(label(3)));
    }

    #[test]
    fn cancelled_press_releases_and_stops() {
        let progress = Progress::new();
        let mut ctx = ExecutionContext::new(&progress);
        let mut sink = RecordingSink::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let cmd = Command::Press(Press {
            groups: vec![ButtonState::A, ButtonState::B],
            duration_ms: 10_000,
            interval_ms: 0,
            start: None,
        });
        cmd.execute(&mut sink, &cancel, &mut ctx).unwrap();
        assert!(sink.states().is_empty());
    }

    #[test]
    fn start_advances_cursor() {
        let progress = Progress::new();
        let mut ctx = ExecutionContext::new(&progress);
        let mut sink = RecordingSink::new();
        Command::Start(Start { label: Some(label(0)) })
            .execute(&mut sink, &CancelToken::new(), &mut ctx)
            .unwrap();
        assert_eq!(progress.hit_index(), 0);
        assert!(progress.timer_started(label(0)));
        Command::Start(Start { label: None })
            .execute(&mut sink, &CancelToken::new(), &mut ctx)
            .unwrap();
        assert_eq!(progress.hit_index(), 1);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn hit_waits_for_boundary() {
        let progress = Progress::new();
        let mut ctx = ExecutionContext::new(&progress);
        let mut sink = RecordingSink::new();
        let cancel = CancelToken::new();

        Command::Start(Start { label: Some(label(0)) }).execute(&mut sink, &cancel, &mut ctx).unwrap();
        let began = Instant::now();
        // 3 frames is just over 50 ms
        let hit = Hit {
            button: ButtonState::Z,
            frame: 3,
            label: label(0),
            duration_ms: 1,
            start: Some(label(1)),
        };
        Command::Hit(hit).execute(&mut sink, &cancel, &mut ctx).unwrap();

        let pressed_at = sink.records()[0].at;
        assert!(pressed_at.duration_since(began) >= Duration::from_millis(45));
        assert_eq!(sink.states(), vec![ButtonState::Z, ButtonState::ALL_RELEASED]);
        assert_eq!(progress.hit_index(), 1);
        assert!(ctx.timers().is_started(label(1)));
    }

    #[test]
    fn cancelled_hit_writes_nothing() {
        let progress = Progress::new();
        let mut ctx = ExecutionContext::new(&progress);
        ctx.start_timer(label(0));
        let mut sink = RecordingSink::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let hit = Hit { button: ButtonState::A, frame: 6000, label: label(0), duration_ms: 200, start: None };
        Command::Hit(hit).execute(&mut sink, &cancel, &mut ctx).unwrap();
        assert!(sink.records().is_empty());
        assert_eq!(progress.hit_index(), 0);
    }
}
