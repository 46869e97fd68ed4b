//! `Remove` orchestrator (spec §4.H "Remove"). Grounded on the teacher's
//! `workflow/remove.rs` safety-check skeleton (resolve -> safety checks
//! -> force check -> delegate to primitives), rebuilt around the
//! Classifier (component D) instead of a single boolean `force` flag.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use tracing::info;

use crate::classifier::{self, CheckOptions};
use crate::error::SkipError;
use crate::filesystem::Filesystem;
use crate::models::{ForceLevel, RemovedWorktree};
use crate::vcs_runner::SubmoduleStatus;

use super::OrchestratorContext;

pub struct RemoveOptions {
    pub force_level: ForceLevel,
    pub check: bool,
    pub cwd: PathBuf,
}

/// Runs the Classifier, then — unless `check` — executes spec §4.H's
/// five-step removal. Returns `SkipError` (not a generic failure) when
/// the Classifier refuses, so single-target `remove` can surface it as
/// an error while bulk `clean` treats the same value as a per-candidate
/// status (spec §7 "Skip").
pub fn remove(
    ctx: &OrchestratorContext,
    branch: &str,
    options: RemoveOptions,
) -> Result<RemovedWorktree> {
    ctx.cancellation.check()?;
    info!(branch, check = options.check, "remove:start");

    let worktree = ctx
        .runner
        .worktree_find_by_branch(&ctx.cancellation, &ctx.repo_dir, branch)
        .map_err(|e| anyhow!("no worktree found for branch '{branch}': {e}"))?;

    let check_result = classifier::check(
        &ctx.cancellation,
        &ctx.runner,
        &ctx.repo_dir,
        &worktree,
        &CheckOptions {
            force_level: options.force_level,
            target_branch: None,
            cwd: &options.cwd,
            merge_status: None,
        },
    );

    if !check_result.can_remove {
        let reason = check_result.skip_reason.expect("skip reason on refusal");
        return Err(SkipError { reason }.into());
    }

    if options.check {
        let cleaned_dirs = predict_cleanup(
            ctx.fs.as_ref(),
            &worktree.path,
            &ctx.config.worktree_dest_base_dir,
        );
        return Ok(RemovedWorktree {
            branch: branch.to_string(),
            worktree_path: worktree.path,
            cleaned_dirs,
            pruned: worktree.prunable,
            check: true,
            can_remove: true,
            skip_reason: None,
            changed_files: Vec::new(),
            git_output: String::new(),
            err: None,
        });
    }

    if worktree.prunable {
        ctx.runner.worktree_prune(&ctx.cancellation, &ctx.repo_dir)?;
        ctx.runner
            .branch_delete(&ctx.cancellation, &ctx.repo_dir, branch, true)?;
        return Ok(RemovedWorktree {
            branch: branch.to_string(),
            worktree_path: worktree.path,
            cleaned_dirs: Vec::new(),
            pruned: true,
            check: false,
            can_remove: true,
            skip_reason: None,
            changed_files: Vec::new(),
            git_output: String::new(),
            err: None,
        });
    }

    // Auto-raise to Unclean when clean-but-initialised submodules are
    // present: the primitive refuses to remove a worktree containing
    // submodules without a force flag. Safe because the Classifier
    // already ensured no submodule is dirty (spec §4.H step 2, §9 open
    // question: verified here against the same substring the Classifier
    // itself checks, not against undocumented VCS internals).
    let effective_force = match ctx
        .runner
        .check_submodule_clean_status(&ctx.cancellation, &worktree.path)
    {
        Ok(SubmoduleStatus::Clean) if options.force_level < ForceLevel::Unclean => {
            ForceLevel::Unclean
        }
        _ => options.force_level,
    };

    ctx.runner.worktree_remove(
        &ctx.cancellation,
        &ctx.repo_dir,
        &worktree.path,
        effective_force,
    )?;

    let cleaned_dirs = cleanup_empty_parents(
        ctx.fs.as_ref(),
        &worktree.path,
        &ctx.config.worktree_dest_base_dir,
    );

    ctx.runner.branch_delete(
        &ctx.cancellation,
        &ctx.repo_dir,
        branch,
        options.force_level > ForceLevel::None,
    )?;

    info!(branch, cleaned = cleaned_dirs.len(), "remove:completed");

    Ok(RemovedWorktree {
        branch: branch.to_string(),
        worktree_path: worktree.path,
        cleaned_dirs,
        pruned: false,
        check: false,
        can_remove: true,
        skip_reason: None,
        changed_files: Vec::new(),
        git_output: String::new(),
        err: None,
    })
}

/// Walks upward from the removed worktree's parent, deleting each
/// directory that is now empty, stopping at the first non-empty
/// directory or at `dest_base` itself (spec §4.H step 4, scenario S5).
fn cleanup_empty_parents(fs: &dyn Filesystem, removed_path: &Path, dest_base: &Path) -> Vec<PathBuf> {
    let mut cleaned = Vec::new();
    let mut current = removed_path.parent().map(Path::to_path_buf);

    while let Some(dir) = current {
        if dir == dest_base || !dir.starts_with(dest_base) {
            break;
        }
        match fs.read_dir(&dir) {
            Ok(entries) if entries.is_empty() => {}
            _ => break,
        }
        if fs.remove(&dir).is_err() {
            break;
        }
        cleaned.push(dir.clone());
        current = dir.parent().map(Path::to_path_buf);
    }
    cleaned
}

/// Check-mode variant: identical walk, but subtracts the hypothetical
/// removal from each parent's directory listing instead of mutating disk.
fn predict_cleanup(fs: &dyn Filesystem, removed_path: &Path, dest_base: &Path) -> Vec<PathBuf> {
    let mut predicted = Vec::new();
    let mut current = removed_path.parent().map(Path::to_path_buf);
    let mut already_removed = removed_path.to_path_buf();

    while let Some(dir) = current {
        if dir == dest_base || !dir.starts_with(dest_base) {
            break;
        }
        let entries: Vec<PathBuf> = match fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => break,
        };
        let remaining = entries.iter().filter(|p| **p != already_removed).count();
        if remaining > 0 {
            break;
        }
        predicted.push(dir.clone());
        already_removed = dir.clone();
        current = dir.parent().map(Path::to_path_buf);
    }
    predicted
}
