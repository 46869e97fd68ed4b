//! `Clean` orchestrator (spec §4.H "Clean"). The fan-out shape is
//! grounded on `examples/prateek-w/src/commands/list/collect.rs`'s
//! `rayon::scope(|s| { s.spawn(...) })` pattern for independent parallel
//! git reads, generalized from that file's fixed set of `OnceCell` slots
//! to an arbitrary-N `Mutex<Vec<(usize, T)>>` buffer sorted by original
//! index at join — the "Arena for parallel results" the Design Notes
//! describe (spec §9, §5).

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use tracing::info;

use crate::classifier::{self, CheckOptions};
use crate::error::SkipReason;
use crate::models::{CleanCandidate, ForceLevel, RemovedWorktree, Worktree};

use super::OrchestratorContext;
use super::remove::{self, RemoveOptions};

pub struct CleanOptions {
    pub check: bool,
    pub force_level: ForceLevel,
    pub target: Option<String>,
    pub cwd: PathBuf,
}

pub struct CleanResult {
    pub candidates: Vec<CleanCandidate>,
    pub removed: Vec<RemovedWorktree>,
    pub pruned_any: bool,
}

pub fn clean(ctx: &OrchestratorContext, options: CleanOptions) -> Result<CleanResult> {
    ctx.cancellation.check()?;

    let worktrees = ctx.runner.worktree_list(&ctx.cancellation, &ctx.repo_dir)?;
    if worktrees.is_empty() {
        return Ok(CleanResult {
            candidates: Vec::new(),
            removed: Vec::new(),
            pruned_any: false,
        });
    }

    // Resolve target: explicit, or the first non-bare worktree's branch.
    let target = options.target.clone().or_else(|| {
        worktrees
            .iter()
            .find(|w| !w.bare)
            .and_then(|w| w.branch.clone())
    });

    let merge_status = target
        .as_deref()
        .map(|t| {
            ctx.runner
                .classify_branch_merge_status(&ctx.cancellation, &ctx.repo_dir, t)
        })
        .transpose()?;

    // Skip index 0 (the main worktree) and bare entries.
    let rest: Vec<(usize, &Worktree)> = worktrees
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, w)| !w.bare)
        .collect();

    info!(count = rest.len(), target = ?target, "clean:classifying");

    let classified: Mutex<Vec<(usize, CleanCandidate)>> = Mutex::new(Vec::new());
    let target_ref = target.as_deref();
    let merge_status_ref = merge_status.as_ref();
    rayon::scope(|s| {
        for &(idx, worktree) in &rest {
            if ctx.cancellation.is_cancelled() {
                break;
            }
            s.spawn(|_| {
                if ctx.cancellation.is_cancelled() {
                    return;
                }
                let result = classifier::check(
                    &ctx.cancellation,
                    &ctx.runner,
                    &ctx.repo_dir,
                    worktree,
                    &CheckOptions {
                        force_level: options.force_level,
                        target_branch: target_ref,
                        cwd: &options.cwd,
                        merge_status: merge_status_ref,
                    },
                );
                let changed_files = if result.can_remove || result.skip_reason == Some(SkipReason::WorkingTreeDirty) {
                    ctx.runner
                        .changed_files_with_status(&ctx.cancellation, &worktree.path)
                        .unwrap_or_default()
                } else {
                    Vec::new()
                };
                let candidate = CleanCandidate {
                    branch: worktree.branch_name().to_string(),
                    worktree_path: worktree.path.clone(),
                    prunable: worktree.prunable,
                    skipped: !result.can_remove,
                    skip_reason: result.skip_reason,
                    clean_reason: result.clean_reason,
                    changed_files,
                };
                classified.lock().unwrap().push((idx, candidate));
            });
        }
    });

    let mut classified = classified.into_inner().unwrap();
    classified.sort_by_key(|(idx, _)| *idx);
    let candidates: Vec<CleanCandidate> = classified.into_iter().map(|(_, c)| c).collect();

    if options.check {
        return Ok(CleanResult {
            candidates,
            removed: Vec::new(),
            pruned_any: false,
        });
    }

    let to_remove: Vec<(usize, &CleanCandidate)> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.skipped)
        .collect();

    let removed_buf: Mutex<Vec<(usize, RemovedWorktree)>> = Mutex::new(Vec::new());
    rayon::scope(|s| {
        for &(idx, candidate) in &to_remove {
            if ctx.cancellation.is_cancelled() {
                break;
            }
            s.spawn(|_| {
                if ctx.cancellation.is_cancelled() {
                    return;
                }
                let result = remove::remove(
                    ctx,
                    &candidate.branch,
                    RemoveOptions {
                        force_level: options.force_level,
                        check: false,
                        cwd: options.cwd.clone(),
                    },
                );
                let removed = match result {
                    Ok(r) => r,
                    Err(e) => RemovedWorktree {
                        branch: candidate.branch.clone(),
                        worktree_path: candidate.worktree_path.clone(),
                        cleaned_dirs: Vec::new(),
                        pruned: false,
                        check: false,
                        can_remove: false,
                        skip_reason: None,
                        changed_files: Vec::new(),
                        git_output: String::new(),
                        err: Some(e.to_string()),
                    },
                };
                removed_buf.lock().unwrap().push((idx, removed));
            });
        }
    });

    let mut removed_buf = removed_buf.into_inner().unwrap();
    removed_buf.sort_by_key(|(idx, _)| *idx);
    let removed: Vec<RemovedWorktree> = removed_buf.into_iter().map(|(_, r)| r).collect();
    let pruned_any = removed.iter().any(|r| r.pruned);

    info!(removed = removed.len(), "clean:completed");

    Ok(CleanResult {
        candidates,
        removed,
        pruned_any,
    })
}
