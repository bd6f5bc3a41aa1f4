use crate::command::Command;
use crate::context::ParseContext;
use crate::error::CompileError;
use crate::registry::Registry;
use crate::timer::Label;

/// A Hit scheduled at compile time: `frame` frames after `label` started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitPlanEntry {
    pub label: Label,
    pub frame: u32,
}

/// One accepted instruction.
#[derive(Debug)]
pub struct Step {
    /// Dense 0-based position among accepted commands.
    pub index: usize,
    /// 0-based line in the macro source.
    pub line: usize,
    pub command: Command,
}

/// Output of [`compile`]: the commands in source order plus the hit plan.
#[derive(Debug)]
pub struct CompiledScript {
    steps: Vec<Step>,
    hit_plan: Vec<HitPlanEntry>,
}

impl CompiledScript {
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn hit_plan(&self) -> &[HitPlanEntry] {
        &self.hit_plan
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Split one macro line into keyword and arguments. `None` for blank and
/// comment lines.
pub fn tokenize(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let normalized = trimmed.replace(", ", ",");
    Some(normalized.split_whitespace().map(str::to_string).collect())
}

/// Compile macro source lines against `registry`.
pub fn compile<S: AsRef<str>>(lines: &[S], registry: &Registry) -> Result<CompiledScript, CompileError> {
    let mut ctx = ParseContext::new();
    let mut steps = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(tokens) = tokenize(line.as_ref()) else { continue };
        ctx.set_line(i);

        let (name, args) = match tokens.split_first() {
            Some((name, args)) => (name.as_str(), args),
            None => continue,
        };
        let parser = registry.get(name).ok_or_else(|| CompileError::UnknownCommand {
            line: i + 1,
            name: name.to_string(),
        })?;

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let command = parser.parse(&args, &mut ctx).map_err(|message| CompileError::Command {
            line: i + 1,
            command: name.to_string(),
            message,
        })?;

        steps.push(Step { index: steps.len(), line: i, command });
    }

    if steps.is_empty() {
        return Err(CompileError::Empty);
    }

    Ok(CompiledScript { steps, hit_plan: ctx.into_hit_plan() })
}

/// Compile a whole macro text. Accepts `\n` and `\r\n` line endings.
pub fn compile_str(source: &str, registry: &Registry) -> Result<CompiledScript, CompileError> {
    let lines: Vec<&str> = source.lines().collect();
    compile(&lines, registry)
}
