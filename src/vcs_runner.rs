//! Component C: VCS Runner (spec §4.C). Typed wrappers over `git`
//! subcommands, layered atop the VCS Executor (`vcs_executor.rs`).
//! Porcelain parsing is grounded on the teacher's
//! `git.rs::parse_worktree_list_porcelain` and `git.rs::get_gone_branches`
//! (both removed from the tree, their shape carried forward here and
//! extended to populate every `Worktree` field spec §3 requires, not just
//! path+branch).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::context::Context;
use crate::error::VcsError;
use crate::models::{FileStatus, ForceLevel, MergeStatus, StashHandle, Worktree};
use crate::vcs_executor::VcsExecutor;

pub struct GitRunner {
    executor: Arc<dyn VcsExecutor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmoduleStatus {
    Absent,
    Clean,
    Dirty,
}

#[derive(Debug, Clone)]
pub struct RemoteBranchMatch {
    pub remote: String,
}

impl GitRunner {
    pub fn new(executor: Arc<dyn VcsExecutor>) -> Self {
        Self { executor }
    }

    /// Checks `ctx` for cancellation before every primitive invocation
    /// (spec §5 "Cancellation is cooperative... checked before each
    /// primitive invocation").
    fn run(&self, ctx: &Context, dir: &Path, argv: &[&str]) -> Result<String, VcsError> {
        ctx.check_vcs()?;
        self.executor.run(dir, argv)
    }

    /// `WorktreeAdd(path, branch, options...)`. `create_branch` adds
    /// `-b`; when absent and the branch exists only on a remote, callers
    /// MUST have already `Fetch`ed so the branch can be attached directly
    /// with upstream tracking (spec §4.C).
    #[allow(clippy::too_many_arguments)]
    pub fn worktree_add(
        &self,
        ctx: &Context,
        repo_dir: &Path,
        path: &Path,
        branch: &str,
        create_branch: bool,
        base: Option<&str>,
        lock: bool,
        lock_reason: Option<&str>,
    ) -> Result<(), VcsError> {
        let path_str = path.to_string_lossy().to_string();
        let mut argv: Vec<&str> = vec!["worktree", "add"];
        if lock {
            argv.push("--lock");
            if let Some(reason) = lock_reason {
                argv.push("--reason");
                argv.push(reason);
            }
        }
        if create_branch {
            argv.push("-b");
            argv.push(branch);
            argv.push(&path_str);
            if let Some(base) = base {
                argv.push(base);
            }
        } else {
            argv.push(&path_str);
            argv.push(branch);
        }
        self.run(ctx, repo_dir, &argv)?;
        Ok(())
    }

    /// Force levels form a total order `None < Unclean < Locked`.
    /// `Unclean` passes one `-f`; `Locked` passes two. Never call with
    /// `Locked` unless the caller explicitly requested it.
    pub fn worktree_remove(
        &self,
        ctx: &Context,
        repo_dir: &Path,
        path: &Path,
        force: ForceLevel,
    ) -> Result<(), VcsError> {
        let path_str = path.to_string_lossy().to_string();
        let mut argv: Vec<&str> = vec!["worktree", "remove"];
        for _ in 0..force.flag_count() {
            argv.push("-f");
        }
        argv.push(&path_str);
        self.run(ctx, repo_dir, &argv)?;
        Ok(())
    }

    /// Parses porcelain v1 output, preserving source order. The first
    /// non-bare record is the main worktree.
    pub fn worktree_list(&self, ctx: &Context, repo_dir: &Path) -> Result<Vec<Worktree>, VcsError> {
        let out = self.run(ctx, repo_dir, &["worktree", "list", "--porcelain"])?;
        Ok(parse_worktree_list_porcelain(&out))
    }

    /// Idempotent.
    pub fn worktree_prune(&self, ctx: &Context, repo_dir: &Path) -> Result<(), VcsError> {
        self.run(ctx, repo_dir, &["worktree", "prune"])?;
        Ok(())
    }

    pub fn worktree_find_by_branch(
        &self,
        ctx: &Context,
        repo_dir: &Path,
        branch: &str,
    ) -> Result<Worktree, VcsError> {
        let worktrees = self.worktree_list(ctx, repo_dir)?;
        worktrees
            .into_iter()
            .find(|w| w.branch.as_deref() == Some(branch))
            .ok_or_else(|| {
                VcsError::new(
                    "worktree find",
                    format!("branch '{branch}' is not checked out in any worktree"),
                    None,
                )
            })
    }

    pub fn branch_delete(
        &self,
        ctx: &Context,
        repo_dir: &Path,
        branch: &str,
        force: bool,
    ) -> Result<(), VcsError> {
        let flag = if force { "-D" } else { "-d" };
        self.run(ctx, repo_dir, &["branch", flag, branch])?;
        Ok(())
    }

    pub fn local_branch_exists(&self, ctx: &Context, repo_dir: &Path, branch: &str) -> bool {
        let refname = format!("refs/heads/{branch}");
        self.run(ctx, repo_dir, &["rev-parse", "--verify", "--quiet", &refname])
            .is_ok()
    }

    /// Iterates `remote`, probing `refs/remotes/<remote>/<branch>`. More
    /// than one match is an `ambiguous` error listing them; zero matches
    /// returns `Ok(None)`.
    pub fn find_remote_for_branch(
        &self,
        ctx: &Context,
        repo_dir: &Path,
        branch: &str,
    ) -> Result<Option<RemoteBranchMatch>, VcsError> {
        let remotes_out = self.run(ctx, repo_dir, &["remote"])?;
        let mut hits = Vec::new();
        for remote in remotes_out.lines().map(str::trim).filter(|s| !s.is_empty()) {
            let refname = format!("refs/remotes/{remote}/{branch}");
            if self
                .run(ctx, repo_dir, &["rev-parse", "--verify", "--quiet", &refname])
                .is_ok()
            {
                hits.push(remote.to_string());
            }
        }
        match hits.len() {
            0 => Ok(None),
            1 => Ok(Some(RemoteBranchMatch {
                remote: hits.remove(0),
            })),
            _ => Err(VcsError::new(
                "find remote for branch",
                format!(
                    "branch '{branch}' found on more than one remote: {}",
                    hits.join(", ")
                ),
                None,
            )),
        }
    }

    pub fn fetch(&self, ctx: &Context, repo_dir: &Path, remote: &str, branch: &str) -> Result<(), VcsError> {
        self.run(ctx, repo_dir, &["fetch", remote, branch])?;
        Ok(())
    }

    /// Single `branch --merged <target> --format=%(refname:short)` call
    /// (spec §4.C `ClassifyBranchMergeStatus`): a branch reachable from
    /// `target` is merged, full stop. Git's `--merged` already includes
    /// branches that point at the exact same commit as `target`, so no
    /// second `--points-at` query is needed.
    pub fn classify_branch_merge_status(
        &self,
        ctx: &Context,
        repo_dir: &Path,
        target: &str,
    ) -> Result<MergeStatus, VcsError> {
        let merged_out = self.run(
            ctx,
            repo_dir,
            &["branch", "--merged", target, "--format=%(refname:short)"],
        )?;
        let merged: HashSet<String> = merged_out
            .lines()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Ok(MergeStatus { merged })
    }

    /// Detects the `[gone]` marker `branch -vv` emits for a branch whose
    /// upstream tracking ref was deleted server-side (squash/rebase
    /// merge evidence, per glossary "upstream gone").
    pub fn is_branch_upstream_gone(
        &self,
        ctx: &Context,
        repo_dir: &Path,
        branch: &str,
    ) -> Result<bool, VcsError> {
        let out = self.run(
            ctx,
            repo_dir,
            &["for-each-ref", "--format=%(refname:short)|%(upstream:track)", "refs/heads"],
        )?;
        for line in out.lines() {
            if let Some((name, track)) = line.split_once('|')
                && name == branch
            {
                return Ok(track.contains("[gone]"));
            }
        }
        Ok(false)
    }

    pub fn is_branch_merged(
        &self,
        ctx: &Context,
        repo_dir: &Path,
        branch: &str,
        merge_status: &MergeStatus,
    ) -> Result<bool, VcsError> {
        if merge_status.is_merged(branch) {
            return Ok(true);
        }
        self.is_branch_upstream_gone(ctx, repo_dir, branch)
    }

    pub fn has_changes(&self, ctx: &Context, dir: &Path) -> Result<bool, VcsError> {
        let out = self.run(ctx, dir, &["status", "--porcelain"])?;
        Ok(!out.trim().is_empty())
    }

    pub fn changed_files_with_status(&self, ctx: &Context, dir: &Path) -> Result<Vec<FileStatus>, VcsError> {
        let out = self.run(ctx, dir, &["status", "--porcelain", "-uall"])?;
        Ok(out
            .lines()
            .filter(|l| !l.is_empty())
            .map(parse_status_line)
            .collect())
    }

    /// ` ` = clean, `+`/`U`/`M` = dirty, `-` = uninitialized (ignored).
    pub fn check_submodule_clean_status(
        &self,
        ctx: &Context,
        dir: &Path,
    ) -> Result<SubmoduleStatus, VcsError> {
        let out = self.run(ctx, dir, &["submodule", "status"])?;
        if out.trim().is_empty() {
            return Ok(SubmoduleStatus::Absent);
        }
        let mut any_dirty = false;
        for line in out.lines() {
            match line.chars().next() {
                Some('+') | Some('U') | Some('M') => any_dirty = true,
                Some('-') => {}
                _ => {}
            }
        }
        Ok(if any_dirty {
            SubmoduleStatus::Dirty
        } else {
            SubmoduleStatus::Clean
        })
    }

    pub fn submodule_update(&self, ctx: &Context, dir: &Path) -> Result<usize, VcsError> {
        let before = self.run(ctx, dir, &["submodule", "status"])?;
        let before_uninit = before.lines().filter(|l| l.starts_with('-')).count();
        self.run(ctx, dir, &["submodule", "update", "--init", "--recursive"])?;
        let after = self.run(ctx, dir, &["submodule", "status"])?;
        let after_uninit = after.lines().filter(|l| l.starts_with('-')).count();
        Ok(before_uninit.saturating_sub(after_uninit))
    }

    /// `stash push -u -m <msg> [-- pathspec...]`; returns the resulting
    /// stash commit hash. Empty handle if there was nothing to stash.
    pub fn stash_push(
        &self,
        ctx: &Context,
        dir: &Path,
        message: &str,
        pathspecs: &[String],
    ) -> Result<StashHandle, VcsError> {
        let before = self.has_changes(ctx, dir)?;
        if !before {
            return Ok(StashHandle(String::new()));
        }
        let mut argv: Vec<&str> = vec!["stash", "push", "-u", "-m", message];
        if !pathspecs.is_empty() {
            argv.push("--");
            for p in pathspecs {
                argv.push(p);
            }
        }
        self.run(ctx, dir, &argv)?;
        let hash = self.run(ctx, dir, &["rev-parse", "stash@{0}"])?;
        Ok(StashHandle(hash))
    }

    pub fn stash_apply_by_hash(
        &self,
        ctx: &Context,
        dir: &Path,
        handle: &StashHandle,
    ) -> Result<(), VcsError> {
        self.run(ctx, dir, &["stash", "apply", &handle.0])?;
        Ok(())
    }

    fn stash_ref_index(&self, ctx: &Context, dir: &Path, handle: &StashHandle) -> Result<usize, VcsError> {
        let list = self.run(ctx, dir, &["stash", "list", "--format=%H"])?;
        list.lines()
            .position(|h| h == handle.0)
            .ok_or_else(|| VcsError::new("stash find", format!("stash {} not found", handle.0), None))
    }

    pub fn stash_pop_by_hash(
        &self,
        ctx: &Context,
        dir: &Path,
        handle: &StashHandle,
    ) -> Result<(), VcsError> {
        let idx = self.stash_ref_index(ctx, dir, handle)?;
        self.run(ctx, dir, &["stash", "pop", &format!("stash@{{{idx}}}")])?;
        Ok(())
    }

    pub fn stash_drop_by_hash(
        &self,
        ctx: &Context,
        dir: &Path,
        handle: &StashHandle,
    ) -> Result<(), VcsError> {
        let idx = self.stash_ref_index(ctx, dir, handle)?;
        self.run(ctx, dir, &["stash", "drop", &format!("stash@{{{idx}}}")])?;
        Ok(())
    }

    pub fn is_git_repo(&self, ctx: &Context, dir: &Path) -> bool {
        self.run(ctx, dir, &["rev-parse", "--is-inside-work-tree"]).is_ok()
    }

    pub fn get_repo_root(&self, ctx: &Context, dir: &Path) -> Result<PathBuf, VcsError> {
        let out = self.run(ctx, dir, &["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(out))
    }

    pub fn get_current_branch(&self, ctx: &Context, dir: &Path) -> Result<String, VcsError> {
        self.run(ctx, dir, &["rev-parse", "--abbrev-ref", "HEAD"])
    }
}

/// Two-character status code + path; rename entries (`R  old -> new`)
/// report only the new name.
fn parse_status_line(line: &str) -> FileStatus {
    let status = line.get(0..2).unwrap_or("  ").to_string();
    let rest = line.get(3..).unwrap_or("").trim();
    let path = match rest.split_once(" -> ") {
        Some((_, new)) => new.to_string(),
        None => rest.to_string(),
    };
    FileStatus { status, path }
}

fn parse_worktree_list_porcelain(output: &str) -> Vec<Worktree> {
    let mut worktrees = Vec::new();
    let mut path: Option<PathBuf> = None;
    let mut head = String::new();
    let mut branch: Option<String> = None;
    let mut bare = false;
    let mut detached = false;
    let mut locked = false;
    let mut lock_reason: Option<String> = None;
    let mut prunable = false;

    let flush = |worktrees: &mut Vec<Worktree>,
                 path: &mut Option<PathBuf>,
                 head: &mut String,
                 branch: &mut Option<String>,
                 bare: &mut bool,
                 detached: &mut bool,
                 locked: &mut bool,
                 lock_reason: &mut Option<String>,
                 prunable: &mut bool| {
        if let Some(p) = path.take() {
            worktrees.push(Worktree {
                path: p,
                branch: branch.take(),
                head: std::mem::take(head),
                bare: *bare,
                detached: *detached,
                locked: *locked,
                lock_reason: lock_reason.take(),
                prunable: *prunable,
            });
        }
        *bare = false;
        *detached = false;
        *locked = false;
        *prunable = false;
    };

    for line in output.lines() {
        if line.is_empty() {
            flush(
                &mut worktrees,
                &mut path,
                &mut head,
                &mut branch,
                &mut bare,
                &mut detached,
                &mut locked,
                &mut lock_reason,
                &mut prunable,
            );
            continue;
        }
        if let Some(p) = line.strip_prefix("worktree ") {
            flush(
                &mut worktrees,
                &mut path,
                &mut head,
                &mut branch,
                &mut bare,
                &mut detached,
                &mut locked,
                &mut lock_reason,
                &mut prunable,
            );
            path = Some(PathBuf::from(p));
        } else if let Some(h) = line.strip_prefix("HEAD ") {
            head = h.to_string();
        } else if let Some(b) = line.strip_prefix("branch ") {
            branch = Some(b.trim_start_matches("refs/heads/").to_string());
        } else if line == "bare" {
            bare = true;
        } else if line == "detached" {
            detached = true;
        } else if line == "locked" {
            locked = true;
            lock_reason = Some(String::new());
        } else if let Some(reason) = line.strip_prefix("locked ") {
            locked = true;
            lock_reason = Some(reason.to_string());
        } else if line == "prunable" || line.starts_with("prunable ") {
            prunable = true;
        }
    }
    flush(
        &mut worktrees,
        &mut path,
        &mut head,
        &mut branch,
        &mut bare,
        &mut detached,
        &mut locked,
        &mut lock_reason,
        &mut prunable,
    );
    worktrees
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_worktree_list() {
        let out = "worktree /repo\nHEAD abc123\nbranch refs/heads/main\n\nworktree /repo-wt/feat\nHEAD def456\nbranch refs/heads/feat\n";
        let worktrees = parse_worktree_list_porcelain(out);
        assert_eq!(worktrees.len(), 2);
        assert_eq!(worktrees[0].path, PathBuf::from("/repo"));
        assert_eq!(worktrees[0].branch.as_deref(), Some("main"));
        assert!(!worktrees[0].bare);
        assert_eq!(worktrees[1].branch.as_deref(), Some("feat"));
    }

    #[test]
    fn parses_bare_detached_locked_prunable() {
        let out = "worktree /repo/.bare\nbare\n\nworktree /repo-wt/x\nHEAD abc\ndetached\n\nworktree /repo-wt/y\nHEAD def\nbranch refs/heads/y\nlocked needs review\n\nworktree /repo-wt/z\nHEAD ghi\nbranch refs/heads/z\nprunable gitdir file points to non-existent location\n";
        let worktrees = parse_worktree_list_porcelain(out);
        assert!(worktrees[0].bare);
        assert!(worktrees[1].detached);
        assert!(worktrees[2].locked);
        assert_eq!(worktrees[2].lock_reason.as_deref(), Some("needs review"));
        assert!(worktrees[3].prunable);
    }

    #[test]
    fn parses_rename_status_line() {
        let fs = parse_status_line("R  old.txt -> new.txt");
        assert_eq!(fs.status, "R ");
        assert_eq!(fs.path, "new.txt");
    }

    #[test]
    fn cancelled_context_short_circuits_before_executor_call() {
        use crate::testing::MockExecutor;
        use std::sync::Arc;

        let executor = Arc::new(MockExecutor::new(Vec::new()));
        let runner = GitRunner::new(executor.clone());
        let ctx = Context::new();
        ctx.cancel();

        let result = runner.local_branch_exists(&ctx, Path::new("/repo"), "feat");
        assert!(!result);
        assert!(executor.calls().is_empty(), "cancelled context must prevent the executor call");
    }
}
