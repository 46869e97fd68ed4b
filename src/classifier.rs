//! Component D: Classifier (spec §4.D). Decides whether a worktree may
//! be removed. No shared mutable state and no `self` — every call is
//! self-contained so `commands/clean.rs` can run it under `rayon::scope`
//! fan-out with only an ordered join at the end (spec §5).

use std::path::Path;

use crate::context::Context;
use crate::error::{CleanReason, SkipReason};
use crate::models::{ForceLevel, MergeStatus, Worktree};
use crate::vcs_runner::{GitRunner, SubmoduleStatus};

#[derive(Debug, Clone)]
pub struct CheckOptions<'a> {
    pub force_level: ForceLevel,
    pub target_branch: Option<&'a str>,
    pub cwd: &'a Path,
    pub merge_status: Option<&'a MergeStatus>,
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub can_remove: bool,
    pub skip_reason: Option<SkipReason>,
    pub clean_reason: Option<CleanReason>,
}

impl CheckResult {
    fn skip(reason: SkipReason) -> Self {
        Self {
            can_remove: false,
            skip_reason: Some(reason),
            clean_reason: None,
        }
    }
}

/// Path-component-aware "is `cwd` inside `wt_path`" check (spec invariant
/// 9): rejects `/a/bc` being considered inside `/a/b` the way a naive
/// string-prefix check would wrongly accept.
pub fn is_path_within(cwd: &Path, wt_path: &Path) -> bool {
    cwd.components().count() >= wt_path.components().count()
        && cwd
            .components()
            .zip(wt_path.components())
            .all(|(a, b)| a == b)
}

/// Ordered tests, first match wins, per spec §4.D's exact algorithm.
/// `ctx` is threaded through to every Runner call so cancellation is
/// checked before each primitive this classification issues (spec §5),
/// not just once at the orchestrator entry point.
pub fn check(
    ctx: &Context,
    runner: &GitRunner,
    repo_dir: &Path,
    worktree: &Worktree,
    options: &CheckOptions,
) -> CheckResult {
    // 2. Prunable: permitted unless a target was given and the branch is
    // not merged (and force hasn't escalated past Unclean).
    if worktree.prunable {
        if let Some(target) = options.target_branch {
            let merged = options
                .merge_status
                .map(|m| {
                    runner
                        .is_branch_merged(ctx, repo_dir, worktree.branch_name(), m)
                        .unwrap_or(false)
                })
                .unwrap_or(false);
            if !merged && options.force_level < ForceLevel::Unclean {
                return CheckResult::skip(SkipReason::NotMerged);
            }
            return CheckResult {
                can_remove: true,
                skip_reason: None,
                clean_reason: Some(clean_reason_for(ctx, runner, repo_dir, worktree, target)),
            };
        }
        return CheckResult {
            can_remove: true,
            skip_reason: None,
            clean_reason: None,
        };
    }

    // 3. Detached HEAD — never bypassable.
    if worktree.detached || worktree.branch.as_deref().unwrap_or("").is_empty() {
        return CheckResult::skip(SkipReason::DetachedHead);
    }

    // 4. Current directory — never bypassable.
    if is_path_within(options.cwd, &worktree.path) {
        return CheckResult::skip(SkipReason::CurrentDirectory);
    }

    // 5. Locked, unless force has reached Locked.
    if worktree.locked && options.force_level < ForceLevel::Locked {
        return CheckResult::skip(SkipReason::Locked);
    }

    // 6. Dirty submodule / dirty working tree, unless force has reached
    // Unclean.
    if options.force_level < ForceLevel::Unclean {
        match runner.check_submodule_clean_status(ctx, &worktree.path) {
            Ok(SubmoduleStatus::Dirty) => return CheckResult::skip(SkipReason::SubmoduleDirty),
            _ => {}
        }
        if runner.has_changes(ctx, &worktree.path).unwrap_or(false) {
            return CheckResult::skip(SkipReason::WorkingTreeDirty);
        }
    }

    // 7. Not merged against target, unless force has reached Unclean.
    if let Some(target) = options.target_branch
        && options.force_level < ForceLevel::Unclean
    {
        let merged = options
            .merge_status
            .map(|m| {
                runner
                    .is_branch_merged(ctx, repo_dir, worktree.branch_name(), m)
                    .unwrap_or(false)
            })
            .unwrap_or(false);
        if !merged {
            return CheckResult::skip(SkipReason::NotMerged);
        }
    }

    // 8. Removable.
    let clean_reason = options
        .target_branch
        .map(|target| clean_reason_for(ctx, runner, repo_dir, worktree, target));
    CheckResult {
        can_remove: true,
        skip_reason: None,
        clean_reason,
    }
}

fn clean_reason_for(
    ctx: &Context,
    runner: &GitRunner,
    repo_dir: &Path,
    worktree: &Worktree,
    target: &str,
) -> CleanReason {
    let merge_status = runner
        .classify_branch_merge_status(ctx, repo_dir, target)
        .unwrap_or_default();
    if merge_status.is_merged(worktree.branch_name()) {
        CleanReason::Merged
    } else {
        CleanReason::UpstreamGone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn path_within_rejects_sibling_with_shared_prefix() {
        assert!(!is_path_within(
            Path::new("/a/repo-worktree/x"),
            Path::new("/a/repo")
        ));
    }

    #[test]
    fn path_within_accepts_nested_child() {
        assert!(is_path_within(Path::new("/a/repo/x"), Path::new("/a/repo")));
    }

    #[test]
    fn path_within_accepts_exact_match() {
        assert!(is_path_within(Path::new("/a/repo"), Path::new("/a/repo")));
    }

    fn sample_worktree(path: &str, branch: &str) -> Worktree {
        Worktree {
            path: PathBuf::from(path),
            branch: Some(branch.to_string()),
            head: "abc123".to_string(),
            bare: false,
            detached: false,
            locked: false,
            lock_reason: None,
            prunable: false,
        }
    }

    #[test]
    fn detached_head_never_bypassable() {
        use crate::vcs_executor::RealExecutor;
        use std::sync::Arc;

        let mut wt = sample_worktree("/a/repo-wt/x", "x");
        wt.detached = true;
        let runner = GitRunner::new(Arc::new(RealExecutor::new()));
        let ctx = Context::new();
        for force in [ForceLevel::None, ForceLevel::Unclean, ForceLevel::Locked] {
            let result = check(
                &ctx,
                &runner,
                Path::new("/a/repo"),
                &wt,
                &CheckOptions {
                    force_level: force,
                    target_branch: None,
                    cwd: Path::new("/somewhere/else"),
                    merge_status: None,
                },
            );
            assert_eq!(result.skip_reason, Some(SkipReason::DetachedHead));
        }
    }

    #[test]
    fn current_directory_never_bypassable() {
        use crate::vcs_executor::RealExecutor;
        use std::sync::Arc;

        let wt = sample_worktree("/a/repo-wt/x", "x");
        let runner = GitRunner::new(Arc::new(RealExecutor::new()));
        let ctx = Context::new();
        for force in [ForceLevel::None, ForceLevel::Unclean, ForceLevel::Locked] {
            let result = check(
                &ctx,
                &runner,
                Path::new("/a/repo"),
                &wt,
                &CheckOptions {
                    force_level: force,
                    target_branch: None,
                    cwd: Path::new("/a/repo-wt/x/nested"),
                    merge_status: None,
                },
            );
            assert_eq!(result.skip_reason, Some(SkipReason::CurrentDirectory));
        }
    }

    #[test]
    fn cancelled_context_stops_before_reaching_the_executor() {
        use crate::testing::MockExecutor;
        use std::sync::Arc;

        let wt = sample_worktree("/a/repo-wt/x", "x");
        let executor = Arc::new(MockExecutor::new(Vec::new()));
        let runner = GitRunner::new(executor.clone());
        let ctx = Context::new();
        ctx.cancel();

        // Steps 6-8 are the ones that would issue primitives (submodule
        // status, working-tree status). None of them should reach the
        // executor once `ctx` is cancelled.
        let _ = check(
            &ctx,
            &runner,
            Path::new("/a/repo"),
            &wt,
            &CheckOptions {
                force_level: ForceLevel::None,
                target_branch: None,
                cwd: Path::new("/somewhere/else"),
                merge_status: None,
            },
        );
        assert!(
            executor.calls().is_empty(),
            "cancelled context must prevent every subsequent primitive invocation"
        );
    }
}
