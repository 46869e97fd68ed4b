//! `Sync` orchestrator (spec §4.H "Sync"). Pushes symlinks/submodules
//! from a source worktree out to one or more targets.

use anyhow::{Result, anyhow};
use tracing::info;

use crate::models::SubmoduleInitResult;
use crate::symlink_materializer::{self, MaterializeOptions};

use super::OrchestratorContext;

pub struct SyncOptions {
    pub check: bool,
    pub all: bool,
    pub source_branch: Option<String>,
    pub source_path: std::path::PathBuf,
    pub symlink_patterns: Vec<String>,
    pub init_submodules: bool,
    pub cwd: std::path::PathBuf,
}

pub struct SyncTargetResult {
    pub branch: String,
    pub symlinks: Vec<crate::models::SymlinkResult>,
    pub submodules: SubmoduleInitResult,
    pub skipped: Option<String>,
}

pub fn sync(ctx: &OrchestratorContext, targets: &[String], options: SyncOptions) -> Result<Vec<SyncTargetResult>> {
    ctx.cancellation.check()?;

    let worktrees = ctx.runner.worktree_list(&ctx.cancellation, &ctx.repo_dir)?;

    let resolved_targets: Vec<crate::models::Worktree> = if options.all {
        // Every non-main, non-bare worktree except the source (spec §4.H
        // Sync Target resolution) — skip index 0 (the main worktree) the
        // same way `clean.rs` does before filtering.
        worktrees
            .into_iter()
            .enumerate()
            .filter(|(idx, w)| {
                *idx != 0 && !w.bare && w.branch.as_deref() != options.source_branch.as_deref()
            })
            .map(|(_, w)| w)
            .collect()
    } else if targets.is_empty() {
        let containing = worktrees
            .iter()
            .find(|w| !w.bare && options.cwd.starts_with(&w.path))
            .cloned()
            .ok_or_else(|| anyhow!("current directory is not inside any worktree"))?;
        if Some(containing.branch_name()) == options.source_branch.as_deref() {
            return Err(anyhow!("cannot sync the source worktree into itself"));
        }
        vec![containing]
    } else {
        let mut resolved = Vec::new();
        for branch in targets {
            if Some(branch.as_str()) == options.source_branch.as_deref() {
                return Err(anyhow!("cannot sync the source worktree into itself"));
            }
            resolved.push(
                ctx.runner
                    .worktree_find_by_branch(&ctx.cancellation, &ctx.repo_dir, branch)?,
            );
        }
        resolved
    };

    info!(count = resolved_targets.len(), "sync:start");

    let mut results = Vec::new();
    for target in resolved_targets {
        let symlinks = symlink_materializer::materialize(
            ctx.fs.as_ref(),
            &options.source_path,
            &target.path,
            &options.symlink_patterns,
            &MaterializeOptions {
                force: false,
                dry_run: options.check,
            },
        )?;
        let symlinks_touched = symlinks.iter().any(|s| !s.skipped);

        let submodules = if options.init_submodules && !options.check {
            match ctx.runner.submodule_update(&ctx.cancellation, &target.path) {
                Ok(count) => SubmoduleInitResult {
                    attempted: true,
                    count,
                    skipped: false,
                    reason: String::new(),
                },
                Err(e) => SubmoduleInitResult {
                    attempted: true,
                    count: 0,
                    skipped: true,
                    reason: e.to_string(),
                },
            }
        } else {
            SubmoduleInitResult::not_attempted()
        };

        let skipped = if !symlinks_touched && submodules.count == 0 {
            Some("up to date".to_string())
        } else {
            None
        };

        results.push(SyncTargetResult {
            branch: target.branch_name().to_string(),
            symlinks,
            submodules,
            skipped,
        });
    }

    Ok(results)
}
