//! Parsers for the built-in `Press`, `Wait`, `Start` and `Hit` commands.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::buttons::ButtonState;
use crate::command::{Command, Hit, Press, Start, Wait};
use crate::context::ParseContext;
use crate::timer::Label;

/// Compile-time half of a command kind: turn the tokens after the keyword
/// into a command, or explain what is wrong with them.
pub trait CommandParser: Send + Sync {
    fn parse(&self, args: &[&str], ctx: &mut ParseContext) -> Result<Command, String>;
}

/// A parser that can be built without arguments and declares its keyword.
pub trait NamedParser: CommandParser + Default + 'static {
    const NAME: &'static str;
}

const DEFAULT_DURATION_MS: u32 = 200;

fn option_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-([a-z])=(.+)$").unwrap())
}

/// Collect `-X=value` options, each X from `allowed` at most once.
fn parse_options<'a>(args: &[&'a str], allowed: &[char]) -> Result<HashMap<char, &'a str>, String> {
    let mut options = HashMap::new();
    for arg in args {
        let caps = option_re()
            .captures(arg)
            .ok_or_else(|| "invalid option specifier".to_string())?;
        let key = caps[1].chars().next().unwrap_or_default();
        if !allowed.contains(&key) {
            return Err("invalid option specifier".into());
        }
        let value = caps.get(2).map_or("", |m| m.as_str());
        if options.insert(key, value).is_some() {
            return Err("duplicate option".into());
        }
    }
    Ok(options)
}

/// Non-negative value that fits a signed 32-bit integer.
fn non_negative(value: &str, what: &str) -> Result<u32, String> {
    match value.parse::<i32>() {
        Ok(n) if n >= 0 => Ok(n as u32),
        _ => Err(format!("{} must be a non-negative 32-bit integer", what)),
    }
}

fn digit_label(value: &str, option: char) -> Result<Label, String> {
    Label::parse_digit(value).ok_or_else(|| format!("-{} must be a single digit", option))
}

fn duration_option(options: &HashMap<char, &str>, key: char, default: u32) -> Result<u32, String> {
    match options.get(&key) {
        Some(v) => non_negative(v, &format!("-{}", key)),
        None => Ok(default),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PressParser;

impl CommandParser for PressParser {
    fn parse(&self, args: &[&str], ctx: &mut ParseContext) -> Result<Command, String> {
        if args.is_empty() || args.len() > 4 {
            return Err("invalid number of arguments".into());
        }

        let groups = args[0]
            .split(',')
            .map(ButtonState::from_chord)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| format!("unknown button in `{}`", args[0]))?;

        let options = parse_options(&args[1..], &['d', 'i', 's'])?;
        let duration_ms = duration_option(&options, 'd', DEFAULT_DURATION_MS)?;
        let interval_ms = duration_option(&options, 'i', 0)?;
        let start = match options.get(&'s') {
            Some(v) => {
                let label = digit_label(v, 's')?;
                ctx.claim_timer(label)?;
                Some(label)
            }
            None => None,
        };

        Ok(Command::Press(Press { groups, duration_ms, interval_ms, start }))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WaitParser;

impl CommandParser for WaitParser {
    fn parse(&self, args: &[&str], _ctx: &mut ParseContext) -> Result<Command, String> {
        let [duration] = args else {
            return Err("invalid number of arguments".into());
        };
        let duration_ms = non_negative(duration, "wait time [ms]")?;
        Ok(Command::Wait(Wait { duration_ms }))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StartParser;

impl CommandParser for StartParser {
    fn parse(&self, args: &[&str], ctx: &mut ParseContext) -> Result<Command, String> {
        let label = match args {
            [] => None,
            [option] => {
                let value = option
                    .strip_prefix("-s=")
                    .ok_or_else(|| "invalid option specifier".to_string())?;
                let label = digit_label(value, 's')?;
                ctx.claim_timer(label)?;
                Some(label)
            }
            _ => return Err("invalid number of arguments".into()),
        };
        Ok(Command::Start(Start { label }))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HitParser;

impl CommandParser for HitParser {
    fn parse(&self, args: &[&str], ctx: &mut ParseContext) -> Result<Command, String> {
        if args.len() < 2 || args.len() > 6 {
            return Err("invalid number of arguments".into());
        }

        let button = ButtonState::from_symbol(args[0])
            .ok_or_else(|| format!("unknown button `{}`", args[0]))?;
        let frame = non_negative(args[1], "frame")?;

        let options = parse_options(&args[2..], &['l', 'd', 's', 'c'])?;
        let duration_ms = duration_option(&options, 'd', DEFAULT_DURATION_MS)?;

        let label = match options.get(&'l') {
            Some(v) => digit_label(v, 'l')?,
            None => Label::ZERO,
        };
        if !ctx.timer_started(label) {
            return Err(format!("timer {} not started: Hit must come after the timer's start", label));
        }

        let frame = match options.get(&'c') {
            Some(v) => {
                let correction = v
                    .parse::<i32>()
                    .map_err(|_| "-c must be a 32-bit integer".to_string())?;
                (i64::from(frame) + i64::from(correction)).max(0) as u32
            }
            None => frame,
        };

        let start = match options.get(&'s') {
            Some(v) => {
                let start = digit_label(v, 's')?;
                ctx.claim_timer(start)?;
                Some(start)
            }
            None => None,
        };

        ctx.add_hit_plan(label, frame);
        Ok(Command::Hit(Hit { button, frame, label, duration_ms, start }))
    }
}
