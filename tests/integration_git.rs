//! End-to-end scenarios S1-S6, backed by real `git` repositories in
//! scratch directories. Grounded on the `kabu` tool's impure-test
//! pattern (spawning real `git init`/`add`/`commit` via
//! `std::process::Command`), adapted to this crate's `tempfile`-based
//! convention instead of a cargo feature flag (this crate has no
//! existing feature-gated test split to match, so a plain `tests/`
//! directory carries the same "slow, real-disk" tests the `kabu`
//! example gates behind `impure-test`).

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use bosk::classifier::{self, CheckOptions};
use bosk::commands::OrchestratorContext;
use bosk::commands::add::{self, AddOptions};
use bosk::commands::remove::{self, RemoveOptions};
use bosk::config::Config;
use bosk::context::Context;
use bosk::filesystem::RealFilesystem;
use bosk::models::ForceLevel;
use bosk::vcs_executor::RealExecutor;
use bosk::vcs_runner::GitRunner;

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("git must be on PATH for these tests");
    assert!(status.success(), "git {args:?} failed in {}", dir.display());
}

fn init_repo(dir: &Path) {
    git(dir, &["init", "-q", "-b", "main"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "user.name", "test"]);
    std::fs::write(dir.join("README.md"), "hello\n").unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-q", "-m", "initial"]);
}

fn context_for(repo_dir: &Path, dest_base: &Path) -> OrchestratorContext {
    OrchestratorContext {
        runner: GitRunner::new(Arc::new(RealExecutor::new())),
        fs: Arc::new(RealFilesystem::new()),
        repo_dir: repo_dir.to_path_buf(),
        config: Config {
            symlinks: vec![".envrc".to_string()],
            worktree_dest_base_dir: dest_base.to_path_buf(),
            worktree_source_dir: repo_dir.to_path_buf(),
            default_source: None,
            init_submodules: None,
            submodule_reference: None,
        },
        cancellation: Context::new(),
    }
}

#[test]
fn s1_add_new_branch_creates_worktree_and_symlink() {
    let tmp = tempfile::tempdir().unwrap();
    let repo_dir = tmp.path().join("r");
    std::fs::create_dir_all(&repo_dir).unwrap();
    init_repo(&repo_dir);
    std::fs::write(repo_dir.join(".envrc"), "export FOO=1\n").unwrap();

    let dest_base = tmp.path().join("r-wt");
    let ctx = context_for(&repo_dir, &dest_base);

    let result = add::add(
        &ctx,
        "feat/new",
        AddOptions {
            sync: false,
            carry_from: None,
            file_patterns: vec![],
            lock: false,
            lock_reason: None,
            init_submodules: false,
        },
    )
    .expect("add should succeed");

    assert_eq!(result.branch, "feat/new");
    assert!(result.worktree_path.exists());
    assert!(
        ctx.runner
            .local_branch_exists(&ctx.cancellation, &repo_dir, "feat/new")
    );
    assert!(result.worktree_path.join(".envrc").symlink_metadata().is_ok());
    assert_eq!(result.symlinks.len(), 1);
    assert!(!result.symlinks[0].skipped);
}

#[test]
fn s3_remove_locked_skip_and_force() {
    let tmp = tempfile::tempdir().unwrap();
    let repo_dir = tmp.path().join("r");
    std::fs::create_dir_all(&repo_dir).unwrap();
    init_repo(&repo_dir);

    let dest_base = tmp.path().join("r-wt");
    let ctx = context_for(&repo_dir, &dest_base);

    add::add(
        &ctx,
        "feat/l",
        AddOptions {
            sync: false,
            carry_from: None,
            file_patterns: vec![],
            lock: true,
            lock_reason: Some("in review".to_string()),
            init_submodules: false,
        },
    )
    .expect("add should succeed");

    let none_result = remove::remove(
        &ctx,
        "feat/l",
        RemoveOptions {
            force_level: ForceLevel::None,
            check: false,
            cwd: tmp.path().to_path_buf(),
        },
    );
    assert!(none_result.is_err(), "locked worktree must be skipped without force");

    let unclean_result = remove::remove(
        &ctx,
        "feat/l",
        RemoveOptions {
            force_level: ForceLevel::Unclean,
            check: false,
            cwd: tmp.path().to_path_buf(),
        },
    );
    assert!(
        unclean_result.is_err(),
        "Unclean must not bypass a locked worktree"
    );

    let locked_result = remove::remove(
        &ctx,
        "feat/l",
        RemoveOptions {
            force_level: ForceLevel::Locked,
            check: false,
            cwd: tmp.path().to_path_buf(),
        },
    );
    assert!(locked_result.is_ok(), "Locked force level must remove a locked worktree");
    assert!(
        !ctx.runner
            .local_branch_exists(&ctx.cancellation, &repo_dir, "feat/l")
    );
}

#[test]
fn s5_empty_parent_cleanup_stops_at_dest_base() {
    let tmp = tempfile::tempdir().unwrap();
    let repo_dir = tmp.path().join("r");
    std::fs::create_dir_all(&repo_dir).unwrap();
    init_repo(&repo_dir);

    let dest_base = tmp.path().join("r-wt");
    let ctx = context_for(&repo_dir, &dest_base);

    // Worktree path nested three levels under dest_base.
    let nested_branch = "feat/nested/very/deep";
    git(&repo_dir, &["branch", nested_branch]);
    let worktree_path = dest_base.join(nested_branch);
    ctx.runner
        .worktree_add(
            &ctx.cancellation,
            &repo_dir,
            &worktree_path,
            nested_branch,
            false,
            None,
            false,
            None,
        )
        .unwrap();

    let result = remove::remove(
        &ctx,
        nested_branch,
        RemoveOptions {
            force_level: ForceLevel::None,
            check: false,
            cwd: tmp.path().to_path_buf(),
        },
    )
    .expect("remove should succeed");

    assert_eq!(result.cleaned_dirs.len(), 3);
    assert!(dest_base.exists());
}

#[test]
fn s2_carry_with_pathspec_moves_only_matched_files() {
    let tmp = tempfile::tempdir().unwrap();
    let repo_dir = tmp.path().join("r");
    std::fs::create_dir_all(&repo_dir).unwrap();
    init_repo(&repo_dir);

    std::fs::write(repo_dir.join("a.go"), "package a\n").unwrap();
    std::fs::write(repo_dir.join("b.md"), "# notes\n").unwrap();
    git(&repo_dir, &["add", "."]);
    git(&repo_dir, &["commit", "-q", "-m", "add a.go and b.md"]);
    std::fs::write(repo_dir.join("a.go"), "package a\n\nfunc X() {}\n").unwrap();
    std::fs::write(repo_dir.join("b.md"), "# notes\n\nmore\n").unwrap();

    let dest_base = tmp.path().join("r-wt");
    let ctx = context_for(&repo_dir, &dest_base);

    let result = add::add(
        &ctx,
        "feat/x",
        AddOptions {
            sync: false,
            carry_from: Some(repo_dir.clone()),
            file_patterns: vec!["*.go".to_string()],
            lock: false,
            lock_reason: None,
            init_submodules: false,
        },
    )
    .expect("carry should succeed");

    assert!(result.changes_moved);

    let source_status = ctx
        .runner
        .changed_files_with_status(&ctx.cancellation, &repo_dir)
        .unwrap();
    assert_eq!(source_status.len(), 1, "only b.md should remain modified in the source");
    assert_eq!(source_status[0].path, "b.md");

    let carried = std::fs::read_to_string(result.worktree_path.join("a.go")).unwrap();
    assert!(carried.contains("func X()"), "the new worktree must contain the modified a.go");
}

#[test]
fn s4_clean_detects_squash_merge_via_upstream_gone() {
    let tmp = tempfile::tempdir().unwrap();
    let repo_dir = tmp.path().join("r");
    std::fs::create_dir_all(&repo_dir).unwrap();
    init_repo(&repo_dir);

    let remote_dir = tmp.path().join("remote.git");
    git(tmp.path(), &["init", "-q", "--bare", remote_dir.to_str().unwrap()]);
    git(&repo_dir, &["remote", "add", "origin", remote_dir.to_str().unwrap()]);
    git(&repo_dir, &["push", "-q", "origin", "main"]);

    let dest_base = tmp.path().join("r-wt");
    let ctx = context_for(&repo_dir, &dest_base);

    add::add(
        &ctx,
        "feat/sq",
        AddOptions {
            sync: false,
            carry_from: None,
            file_patterns: vec![],
            lock: false,
            lock_reason: None,
            init_submodules: false,
        },
    )
    .expect("add should succeed");
    git(&repo_dir, &["push", "-q", "-u", "origin", "feat/sq"]);

    // Simulate a squash merge on the server: the remote branch is deleted
    // once its changes land in main via a squash commit, leaving the
    // local branch's upstream tracking ref "gone" without the local
    // branch itself appearing in `--merged main`.
    git(&repo_dir, &["push", "-q", "origin", "--delete", "feat/sq"]);
    git(&repo_dir, &["fetch", "-q", "--prune"]);

    let worktrees = ctx
        .runner
        .worktree_list(&ctx.cancellation, &repo_dir)
        .unwrap();
    let feat_sq = worktrees
        .iter()
        .find(|w| w.branch.as_deref() == Some("feat/sq"))
        .expect("feat/sq worktree must exist");

    let merge_status = ctx
        .runner
        .classify_branch_merge_status(&ctx.cancellation, &repo_dir, "main")
        .unwrap();
    assert!(
        !merge_status.is_merged("feat/sq"),
        "feat/sq must not appear in --merged output for this scenario"
    );

    let check_result = classifier::check(
        &ctx.cancellation,
        &ctx.runner,
        &repo_dir,
        feat_sq,
        &CheckOptions {
            force_level: ForceLevel::None,
            target_branch: Some("main"),
            cwd: tmp.path(),
            merge_status: Some(&merge_status),
        },
    );
    assert!(check_result.can_remove, "upstream-gone branch should be cleanable");
    assert_eq!(
        check_result.clean_reason,
        Some(bosk::error::CleanReason::UpstreamGone)
    );
}

#[test]
fn s6_prunable_removal_invokes_prune_and_deletes_branch() {
    let tmp = tempfile::tempdir().unwrap();
    let repo_dir = tmp.path().join("r");
    std::fs::create_dir_all(&repo_dir).unwrap();
    init_repo(&repo_dir);

    let dest_base = tmp.path().join("r-wt");
    let ctx = context_for(&repo_dir, &dest_base);

    let result = add::add(
        &ctx,
        "feat/gone",
        AddOptions {
            sync: false,
            carry_from: None,
            file_patterns: vec![],
            lock: false,
            lock_reason: None,
            init_submodules: false,
        },
    )
    .expect("add should succeed");

    // Delete the worktree directory out from under git, without going
    // through `git worktree remove`, so the VCS still has a (now stale)
    // record of it.
    std::fs::remove_dir_all(&result.worktree_path).unwrap();

    let removed = remove::remove(
        &ctx,
        "feat/gone",
        RemoveOptions {
            force_level: ForceLevel::None,
            check: false,
            cwd: tmp.path().to_path_buf(),
        },
    )
    .expect("removing a prunable worktree should succeed");

    assert!(removed.pruned);
    assert!(
        !ctx.runner
            .local_branch_exists(&ctx.cancellation, &repo_dir, "feat/gone")
    );
}

#[test]
fn current_directory_safety_blocks_removal_from_within() {
    let tmp = tempfile::tempdir().unwrap();
    let repo_dir = tmp.path().join("r");
    std::fs::create_dir_all(&repo_dir).unwrap();
    init_repo(&repo_dir);

    let dest_base = tmp.path().join("r-wt");
    let ctx = context_for(&repo_dir, &dest_base);

    let result = add::add(
        &ctx,
        "feat/cwd",
        AddOptions {
            sync: false,
            carry_from: None,
            file_patterns: vec![],
            lock: false,
            lock_reason: None,
            init_submodules: false,
        },
    )
    .unwrap();

    let worktree = ctx
        .runner
        .worktree_find_by_branch(&ctx.cancellation, &repo_dir, "feat/cwd")
        .unwrap();
    let check_result = classifier::check(
        &ctx.cancellation,
        &ctx.runner,
        &repo_dir,
        &worktree,
        &CheckOptions {
            force_level: ForceLevel::Locked,
            target_branch: None,
            cwd: &result.worktree_path.join("subdir"),
            merge_status: None,
        },
    );
    assert!(!check_result.can_remove);
}
