//! Component B: VCS Executor (spec §4.B). Grounded on the teacher's
//! `Cmd` builder (`src/cmd.rs`, now removed) but returning a structured
//! `VcsError` instead of a pre-formatted `anyhow` string, so the
//! Formatter (`format.rs`) can pattern-match `stderr` for hints without
//! re-parsing a flattened message.

use std::path::Path;
use std::process::Command;

use tracing::{debug, trace};

use crate::error::VcsError;

/// Sole operation: run `argv` with `dir` as the injected process CWD (no
/// process-wide state) and return stdout or a structured error.
pub trait VcsExecutor: Send + Sync {
    fn run(&self, dir: &Path, argv: &[&str]) -> Result<String, VcsError>;
}

pub struct RealExecutor;

impl RealExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl VcsExecutor for RealExecutor {
    fn run(&self, dir: &Path, argv: &[&str]) -> Result<String, VcsError> {
        let op = op_label(argv);
        trace!(op = %op, args = ?argv, dir = %dir.display(), "vcs_executor:run start");

        let mut cmd = Command::new("git");
        cmd.current_dir(dir).args(argv);

        let output = cmd.output().map_err(|e| {
            VcsError::new(op, format!("failed to spawn git: {e}"), None)
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(op = %op, exit_code = ?output.status.code(), stderr = %stderr, "vcs_executor:run failure");
            return Err(VcsError::new(op, stderr, output.status.code()));
        }

        trace!(op = %op, "vcs_executor:run success");
        String::from_utf8(output.stdout)
            .map(|s| s.trim().to_string())
            .map_err(|e| VcsError::new(op, format!("non-utf8 stdout: {e}"), output.status.code()))
    }
}

/// `["worktree", "remove", ...]` -> `"worktree remove"`. Subcommands that
/// are a single token (`status`, `fetch`) yield just that token. Matches
/// the op labels spec §4.C's examples use verbatim (`"worktree remove"`).
fn op_label(argv: &[&str]) -> String {
    match argv {
        [first, second, ..]
            if !second.starts_with('-')
                && matches!(
                    *first,
                    "worktree" | "branch" | "stash" | "submodule" | "remote" | "rev-parse"
                        | "for-each-ref"
                ) =>
        {
            format!("{first} {second}")
        }
        [first, ..] => (*first).to_string(),
        [] => String::new(),
    }
}
