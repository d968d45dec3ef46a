//! # Process-backed Collaborators
//!
//! Real implementations of the installer collaborator traits, each a thin
//! wrapper over an external binary:
//!
//! - [`PipPackageManager`] - `python -m pip`
//! - [`GitVcs`] - `git`
//! - [`JuliaupProvisioner`] - `juliaup` + `julia`
//!
//! Every invocation goes through [`run`], which captures output and turns a
//! non-zero exit into a [`StepError`] carrying the tail of stderr.

mod git;
mod julia;
mod pip;

pub use git::GitVcs;
pub use julia::JuliaupProvisioner;
pub use pip::PipPackageManager;

use crate::install::StepError;
use std::process::{Command, Stdio};

/// Lines of stderr kept in an error message.
const STDERR_TAIL_LINES: usize = 20;

/// Run a command to completion, returning its stdout.
pub fn run(step: &str, command: &mut Command) -> Result<String, StepError> {
    command.stdin(Stdio::null());
    tracing::debug!(step, command = ?command, "Running");

    let output = command
        .output()
        .map_err(|e| StepError::new(step, format!("cannot start {:?}: {}", command, e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(StepError::new(
        step,
        format!("{} ({})", output.status, tail(&stderr, STDERR_TAIL_LINES)),
    ))
}

/// Last non-empty line of command output.
pub fn last_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).rev().find(|l| !l.is_empty())
}

fn tail(text: &str, lines: usize) -> String {
    let kept: Vec<&str> = text.trim_end().lines().rev().take(lines).collect();
    kept.into_iter().rev().collect::<Vec<_>>().join("\n")
}

/// `[A-Za-z0-9_]`, dot-separated, not starting with a digit.
pub(crate) fn is_dotted_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            part.chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
