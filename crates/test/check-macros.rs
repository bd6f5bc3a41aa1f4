//! Compiles every macro under `scripts/` (or `$ORCA_SCRIPTS`).
//!
//! `ok_*` macros must compile and run to completion on the recording sink;
//! a `# mode: compile` header skips the run. `bad_*` macros must fail to
//! compile with the fragment named by their `# expect:` header.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, ensure, Context, Result};
use libtest_mimic::{Arguments, Failed, Trial};

use orca_core::extensions::ResetParser;
use orca_core::sink::stub::RecordingSink;
use orca_core::{compile_str, ButtonState, CancelToken, Executor, Registry, RunOutcome};

fn registry() -> Result<Registry> {
    let mut registry = Registry::new();
    registry.register::<ResetParser>()?;
    Ok(registry)
}

/// Value of a `# key: value` header line.
fn header<'a>(source: &'a str, key: &str) -> Option<&'a str> {
    source.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix('#')?.trim_start();
        rest.strip_prefix(key)?.strip_prefix(':').map(str::trim)
    })
}

fn check_ok(path: &Path) -> Result<()> {
    let source = std::fs::read_to_string(path)?;
    let script = compile_str(&source, &registry()?).map_err(|e| anyhow!("{}", e))?;
    if header(&source, "mode") == Some("compile") {
        return Ok(());
    }

    let executor = Executor::new(Arc::new(script));
    let mut sink = RecordingSink::new();
    let outcome = executor.run_once(&mut sink, &CancelToken::new())?;

    ensure!(outcome == RunOutcome::Completed, "run ended as {:?}", outcome);
    ensure!(executor.snapshot().is_idle(), "progress not idle after run");
    if let Some(last) = sink.states().last() {
        ensure!(*last == ButtonState::ALL_RELEASED, "buttons left held: {}", last);
    }
    Ok(())
}

fn check_bad(path: &Path) -> Result<()> {
    let source = std::fs::read_to_string(path)?;
    let expected = header(&source, "expect").context("missing `# expect:` header")?;
    match compile_str(&source, &registry()?) {
        Ok(_) => bail!("compiled, expected failure containing `{}`", expected),
        Err(e) if e.to_string().contains(expected) => Ok(()),
        Err(e) => bail!("wrong error `{}`, expected `{}`", e, expected),
    }
}

fn collect(dir: &Path) -> Result<Vec<Trial>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("cannot list {}", dir.display()))?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();

    let mut trials = Vec::new();
    for path in files {
        let name = path.file_stem().unwrap_or_default().to_string_lossy().to_string();
        let check: fn(&Path) -> Result<()> = if name.starts_with("ok_") {
            check_ok
        } else if name.starts_with("bad_") {
            check_bad
        } else {
            continue;
        };
        trials.push(Trial::test(name, move || check(&path).map_err(|e| Failed::from(format!("{:#}", e)))));
    }
    Ok(trials)
}

fn main() -> Result<()> {
    let args = Arguments::from_args();
    let dir = std::env::var_os("ORCA_SCRIPTS")
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("scripts"));
    let trials = collect(&dir)?;
    libtest_mimic::run(&args, trials).exit();
}
