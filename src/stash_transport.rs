//! Component E: Stash Transport (spec §4.E). Grounded on the teacher's
//! `workflow/create.rs::create_with_changes` (push -> create target ->
//! apply -> cleanup-or-rollback shape), reworked to be hash-addressed
//! (never a numeric stash index — spec §4.E, §4.C) and to support both
//! carry (move, source cleaned) and sync (copy, both keep changes) per
//! the glossary's "Carry vs Sync" definitions.

use std::path::Path;

use crate::context::Context;
use crate::error::TransportError;
use crate::filesystem::Filesystem;
use crate::models::{ForceLevel, StashHandle};
use crate::vcs_runner::GitRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Carry,
    Sync,
}

#[derive(Debug, Clone)]
pub struct TransportOutcome {
    pub changes_moved: bool,
    pub mode: TransportMode,
}

/// Expand `file_patterns` against `source_dir` via the Filesystem
/// Facade's glob, deduplicating while preserving first-seen order (spec
/// §4.E step 2).
pub fn expand_pathspecs(
    fs: &dyn Filesystem,
    source_dir: &Path,
    file_patterns: &[String],
) -> anyhow::Result<Vec<String>> {
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::new();
    for pattern in file_patterns {
        for m in fs.glob(source_dir, pattern)? {
            let s = m.to_string_lossy().to_string();
            if seen.insert(s.clone()) {
                result.push(s);
            }
        }
    }
    Ok(result)
}

/// Runs steps 1, 3 of spec §4.E (the caller is responsible for step 4,
/// "create the new worktree", between `push` and `finish`, since that is
/// the orchestrator's job, not the transport's).
pub fn push(
    ctx: &Context,
    runner: &GitRunner,
    source_dir: &Path,
    message: &str,
    pathspecs: &[String],
) -> anyhow::Result<Option<StashHandle>> {
    if !runner.has_changes(ctx, source_dir)? {
        return Ok(None);
    }
    let handle = runner.stash_push(ctx, source_dir, message, pathspecs)?;
    if handle.is_empty() {
        return Ok(None);
    }
    Ok(Some(handle))
}

/// Step 4 failure path: the new worktree failed to create after the
/// push succeeded. Restore the source by popping the stash back.
pub fn restore_after_create_failure(
    ctx: &Context,
    runner: &GitRunner,
    source_dir: &Path,
    handle: &StashHandle,
) -> anyhow::Result<()> {
    runner.stash_pop_by_hash(ctx, source_dir, handle)?;
    Ok(())
}

/// Steps 5-7: apply in the target, then either drop (carry) or pop
/// (sync) in the source. On apply failure, the caller must
/// `WorktreeRemove(target, Unclean)` then pop the source stash before
/// surfacing the error (spec §4.E failure table) — that worktree removal
/// crosses into orchestrator territory (component H), so `finish`
/// returns a typed error the orchestrator recognizes and reacts to,
/// rather than performing the worktree removal itself.
pub fn finish(
    ctx: &Context,
    runner: &GitRunner,
    source_dir: &Path,
    target_dir: &Path,
    handle: &StashHandle,
    mode: TransportMode,
) -> Result<TransportOutcome, TransportError> {
    if let Err(e) = runner.stash_apply_by_hash(ctx, target_dir, handle) {
        return Err(TransportError::new(
            format!(
                "failed to apply stashed changes in '{}'",
                target_dir.display()
            ),
            e.into(),
        ));
    }

    let drop_or_pop_result = match mode {
        TransportMode::Carry => runner.stash_drop_by_hash(ctx, source_dir, handle),
        TransportMode::Sync => runner.stash_pop_by_hash(ctx, source_dir, handle),
    };

    if let Err(e) = drop_or_pop_result {
        return Err(TransportError::new(
            format!(
                "changes were applied to '{}' but the source stash could not be {} ({})",
                target_dir.display(),
                if mode == TransportMode::Carry { "dropped" } else { "popped" },
                e
            ),
            e.into(),
        ));
    }

    Ok(TransportOutcome {
        changes_moved: true,
        mode,
    })
}

/// Convenience used by the apply-failure branch of `finish`'s caller:
/// asks the orchestrator to remove the half-created target before
/// restoring the source stash. Exposed here (rather than inlined in
/// `commands/add.rs`) so the exact force level (`Unclean`, per spec
/// §4.E) stays colocated with the rest of the transport's failure
/// policy.
pub const APPLY_FAILURE_REMOVE_FORCE: ForceLevel = ForceLevel::Unclean;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VcsError;
    use crate::testing::MockExecutor;
    use std::sync::Arc;

    fn ok(s: &str) -> Result<String, VcsError> {
        Ok(s.to_string())
    }

    fn err(argv: &str) -> Result<String, VcsError> {
        Err(VcsError::new(argv, "git exited non-zero", None))
    }

    #[test]
    fn push_returns_none_when_source_is_clean() {
        let executor = Arc::new(MockExecutor::new(vec![ok("")]));
        let runner = GitRunner::new(executor.clone());
        let ctx = Context::new();

        let handle = push(&ctx, &runner, Path::new("/src"), "bosk-carry", &[]).unwrap();
        assert!(handle.is_none());
        assert_eq!(executor.calls().len(), 1);
    }

    /// Failure table row 1: the `git stash push` invocation itself fails.
    #[test]
    fn push_fails_propagates_error() {
        let executor = Arc::new(MockExecutor::new(vec![
            ok(" M file.txt"),  // push(): has_changes
            ok(" M file.txt"),  // stash_push(): has_changes
            err("stash push"),  // stash_push(): the push itself
        ]));
        let runner = GitRunner::new(executor.clone());
        let ctx = Context::new();

        let result = push(&ctx, &runner, Path::new("/src"), "bosk-carry", &[]);
        assert!(result.is_err());
        assert_eq!(executor.calls().len(), 3);
    }

    /// Failure table row 2: the push succeeds but the target worktree
    /// fails to create, so the orchestrator asks to restore the source.
    #[test]
    fn restore_after_create_failure_pops_the_stash_back() {
        let executor = Arc::new(MockExecutor::new(vec![
            ok(" M file.txt"),           // push(): has_changes
            ok(" M file.txt"),           // stash_push(): has_changes
            ok(""),                      // stash_push(): stash push
            ok("deadbeef"),              // stash_push(): rev-parse stash@{0}
            ok("deadbeef\nother"),       // restore: stash_ref_index (stash list)
            ok(""),                      // restore: stash pop
        ]));
        let runner = GitRunner::new(executor.clone());
        let ctx = Context::new();

        let handle = push(&ctx, &runner, Path::new("/src"), "bosk-carry", &[])
            .unwrap()
            .expect("non-empty stash handle");
        assert_eq!(handle.0, "deadbeef");

        restore_after_create_failure(&ctx, &runner, Path::new("/src"), &handle).unwrap();
        assert_eq!(executor.calls().len(), 6);
    }

    /// Failure table row 3: the apply in the target worktree fails.
    #[test]
    fn finish_returns_transport_error_when_apply_fails() {
        let handle = StashHandle("deadbeef".to_string());
        let executor = Arc::new(MockExecutor::new(vec![
            err("stash apply"), // finish(): stash apply <hash>
        ]));
        let runner = GitRunner::new(executor.clone());
        let ctx = Context::new();

        let result = finish(
            &ctx,
            &runner,
            Path::new("/src"),
            Path::new("/target"),
            &handle,
            TransportMode::Carry,
        );
        let err = result.expect_err("apply failure must surface as TransportError");
        assert!(err.to_string().contains("failed to apply"));
        assert_eq!(executor.calls().len(), 1);
    }

    /// Failure table row 4: apply succeeds but the final drop (carry mode)
    /// fails — changes are now duplicated in both worktrees and the
    /// caller must be told so rather than silently losing the source copy.
    #[test]
    fn finish_returns_transport_error_when_final_drop_fails() {
        let handle = StashHandle("deadbeef".to_string());
        let executor = Arc::new(MockExecutor::new(vec![
            ok(""),              // finish(): stash apply <hash>
            ok("deadbeef\n"),    // finish(): stash_ref_index (stash list)
            err("stash drop"),   // finish(): stash drop
        ]));
        let runner = GitRunner::new(executor.clone());
        let ctx = Context::new();

        let result = finish(
            &ctx,
            &runner,
            Path::new("/src"),
            Path::new("/target"),
            &handle,
            TransportMode::Carry,
        );
        let err = result.expect_err("drop failure must surface as TransportError");
        assert!(err.to_string().contains("could not be dropped"));
        assert_eq!(executor.calls().len(), 3);
    }

    /// Sync mode's final step is a pop, not a drop, and a pop failure
    /// reports "popped" rather than "dropped" in the error message.
    #[test]
    fn finish_returns_transport_error_when_final_pop_fails_in_sync_mode() {
        let handle = StashHandle("deadbeef".to_string());
        let executor = Arc::new(MockExecutor::new(vec![
            ok(""),            // finish(): stash apply <hash>
            ok("deadbeef\n"),  // finish(): stash_ref_index (stash list)
            err("stash pop"),  // finish(): stash pop
        ]));
        let runner = GitRunner::new(executor.clone());
        let ctx = Context::new();

        let result = finish(
            &ctx,
            &runner,
            Path::new("/src"),
            Path::new("/target"),
            &handle,
            TransportMode::Sync,
        );
        let err = result.expect_err("pop failure must surface as TransportError");
        assert!(err.to_string().contains("could not be popped"));
    }

    #[test]
    fn finish_succeeds_and_reports_mode() {
        let handle = StashHandle("deadbeef".to_string());
        let executor = Arc::new(MockExecutor::new(vec![
            ok(""),           // finish(): stash apply <hash>
            ok("deadbeef\n"), // finish(): stash_ref_index (stash list)
            ok(""),           // finish(): stash drop
        ]));
        let runner = GitRunner::new(executor.clone());
        let ctx = Context::new();

        let outcome = finish(
            &ctx,
            &runner,
            Path::new("/src"),
            Path::new("/target"),
            &handle,
            TransportMode::Carry,
        )
        .unwrap();
        assert!(outcome.changes_moved);
        assert_eq!(outcome.mode, TransportMode::Carry);
    }

    #[test]
    fn cancelled_context_stops_push_before_reaching_the_executor() {
        let executor = Arc::new(MockExecutor::new(Vec::new()));
        let runner = GitRunner::new(executor.clone());
        let ctx = Context::new();
        ctx.cancel();

        let result = push(&ctx, &runner, Path::new("/src"), "bosk-carry", &[]);
        assert!(result.is_err());
        assert!(executor.calls().is_empty());
    }
}
