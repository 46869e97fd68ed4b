//! Component H: Command Orchestrators (spec §4.H). Each submodule
//! composes components A-G into one user-facing action. Grounded on the
//! teacher's `workflow/create.rs` (Add), `workflow/remove.rs` (Remove
//! safety-check skeleton), and `config.rs::init` (Init's template
//! writer), generalized to spec's exact contracts.

pub mod add;
pub mod clean;
pub mod init;
pub mod list;
pub mod remove;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::context::Context;
use crate::filesystem::Filesystem;
use crate::vcs_runner::GitRunner;

/// Everything an orchestrator needs, bundled once at the CLI boundary
/// and threaded through every command — keeps individual command
/// functions free of ad-hoc parameter lists for shared collaborators.
pub struct OrchestratorContext {
    pub runner: GitRunner,
    pub fs: Arc<dyn Filesystem>,
    pub repo_dir: PathBuf,
    pub config: Config,
    pub cancellation: Context,
}
