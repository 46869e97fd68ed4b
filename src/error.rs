//! Structured error kinds shared across the core. Runners and the
//! Classifier return these directly; Orchestrators wrap them with
//! `anyhow::Context` for propagation; Formatters are the only layer that
//! renders them to text (see `format.rs`).

use std::path::PathBuf;
use thiserror::Error;

/// Error returned by the VCS Executor (`vcs_executor.rs`) and propagated
/// unchanged through the VCS Runner. Carries enough structure for the
/// Formatter to generate hints from `stderr` without re-parsing a single
/// flattened string.
#[derive(Debug, Error, Clone)]
#[error("{op} failed (exit {exit_code:?}): {stderr}")]
pub struct VcsError {
    pub op: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl VcsError {
    pub fn new(op: impl Into<String>, stderr: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            op: op.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }
}

/// Configuration load/parse failures. Exit code 1 (spec §7 "Config").
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("could not resolve path: {0}")]
    UnresolvablePath(String),
}

/// The closed set of reasons the Classifier refuses to let a worktree be
/// removed. Carried as data (spec §9 "No exception-style control flow"),
/// not raised as an exception internally, but surfaced as an error at the
/// single-target `remove` boundary (spec §7 "Skip").
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SkipReason {
    #[error("detached HEAD")]
    DetachedHead,
    #[error("current directory")]
    CurrentDirectory,
    #[error("locked")]
    Locked,
    #[error("submodule has uncommitted changes")]
    SubmoduleDirty,
    #[error("has uncommitted changes")]
    WorkingTreeDirty,
    #[error("not merged")]
    NotMerged,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("skipped: {reason}")]
pub struct SkipError {
    pub reason: SkipReason,
}

/// The closed set of reasons a worktree was classified as cleanable
/// (spec §3 `CleanCandidate`, §4.C `IsBranchMerged`/glossary "upstream
/// gone"). Not an error — tagged data the Classifier attaches to a
/// removable candidate so the Formatter can explain *why* it qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum CleanReason {
    Merged,
    UpstreamGone,
}

impl std::fmt::Display for CleanReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CleanReason::Merged => write!(f, "merged"),
            CleanReason::UpstreamGone => write!(f, "upstream gone"),
        }
    }
}

/// Stash Transport rollback failure (spec §4.E, §7 "Transport failure").
/// `source` is kept as plain data rather than a `#[source]` chain link:
/// `anyhow::Error` doesn't implement `std::error::Error` itself, so it
/// can't satisfy thiserror's `#[source]` bound.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub source: Option<anyhow::Error>,
}

impl TransportError {
    pub fn new(message: impl Into<String>, source: anyhow::Error) -> Self {
        Self {
            message: message.into(),
            source: Some(source),
        }
    }
}

/// Usage-level failure: missing argument, unknown flag, incompatible flag
/// combination. Maps to exit code 2.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UsageError(pub String);

/// One of the four process exit codes defined in spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Failure = 1,
    Usage = 2,
    Partial = 3,
}

/// Inspect a top-level `anyhow::Error` chain and pick the exit code that
/// spec §7's taxonomy demands. Bulk commands (`Clean`/`Remove`/`Sync`)
/// compute `Partial` themselves from their per-target results before this
/// is ever consulted; this classification only applies to single-shot
/// failures that abort the whole process.
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    if err.downcast_ref::<UsageError>().is_some() {
        return ExitCode::Usage;
    }
    ExitCode::Failure
}
