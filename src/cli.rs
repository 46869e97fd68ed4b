//! CLI surface (spec §6). Grounded on the teacher's `cli.rs` structure:
//! a top-level `Cli` with one `#[command(subcommand)]` variant per
//! command and a per-command flag struct deriving `clap::Args`.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(name = "bosk", about = "Unify git worktree and branch lifecycle management")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Reduce stdout to machine-parsable paths/branch names.
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Include per-step detail and hints.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a template settings file.
    Init(InitArgs),
    /// Create worktree + branch.
    Add(AddArgs),
    /// Enumerate worktrees.
    List(ListArgs),
    /// Delete worktree + branch.
    Remove(RemoveArgs),
    /// Bulk delete merged/stale worktrees.
    Clean(CleanArgs),
    /// Push symlinks/submodules from a source worktree.
    Sync(SyncArgs),
    /// Print shell completion script to stdout (not shown in --help).
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    pub shell: Shell,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub name: String,
    #[arg(long)]
    pub sync: bool,
    #[arg(long)]
    pub carry: bool,
    #[arg(long = "file")]
    pub file_patterns: Vec<String>,
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub lock: bool,
    #[arg(long)]
    pub lock_reason: Option<String>,
    #[arg(long)]
    pub init_submodules: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    pub names: Vec<String>,
    #[arg(short = 'f')]
    pub force: bool,
    #[arg(long = "ff")]
    pub force_locked: bool,
    #[arg(long)]
    pub check: bool,
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    #[arg(long)]
    pub target: Option<String>,
    #[arg(long)]
    pub check: bool,
    #[arg(long)]
    pub yes: bool,
    #[arg(short = 'f')]
    pub force: bool,
    #[arg(long = "ff")]
    pub force_locked: bool,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    pub branches: Vec<String>,
    #[arg(long)]
    pub all: bool,
    #[arg(long)]
    pub check: bool,
    #[arg(long)]
    pub source: Option<String>,
}
