//! `Add` orchestrator (spec §4.H "Add"). Grounded on the teacher's
//! `workflow/create.rs::create`/`create_with_changes`.

use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow};
use tracing::{info, warn};

use crate::error::UsageError;
use crate::filesystem::Filesystem;
use crate::models::SubmoduleInitResult;
use crate::stash_transport::{self, TransportMode};
use crate::symlink_materializer::{self, MaterializeOptions};

use super::OrchestratorContext;

pub struct AddOptions {
    pub sync: bool,
    pub carry_from: Option<PathBuf>,
    pub file_patterns: Vec<String>,
    pub lock: bool,
    pub lock_reason: Option<String>,
    pub init_submodules: bool,
}

pub struct AddResult {
    pub branch: String,
    pub worktree_path: PathBuf,
    pub submodules: SubmoduleInitResult,
    pub symlinks: Vec<crate::models::SymlinkResult>,
    pub changes_moved: bool,
}

pub fn add(ctx: &OrchestratorContext, branch: &str, options: AddOptions) -> Result<AddResult> {
    ctx.cancellation.check()?;

    if branch.is_empty() {
        return Err(UsageError("branch name is required".into()).into());
    }
    if options.sync && options.carry_from.is_some() {
        return Err(UsageError("--sync and --carry are mutually exclusive".into()).into());
    }
    if !options.file_patterns.is_empty() && !options.sync && options.carry_from.is_none() {
        return Err(UsageError("--file requires --sync or --carry".into()).into());
    }

    info!(branch, "add:start");

    let dest_base = &ctx.config.worktree_dest_base_dir;
    let worktree_path = dest_base.join(branch);
    if ctx.fs.lstat(&worktree_path).is_ok() {
        return Err(anyhow!(
            "destination '{}' already exists",
            worktree_path.display()
        ));
    }

    if let Ok(existing) = ctx
        .runner
        .worktree_find_by_branch(&ctx.cancellation, &ctx.repo_dir, branch)
    {
        return Err(anyhow!(
            "branch '{branch}' is already checked out at '{}'",
            existing.path.display()
        ));
    }

    let create_branch = !ctx
        .runner
        .local_branch_exists(&ctx.cancellation, &ctx.repo_dir, branch);
    let mut track_remote: Option<String> = None;
    if create_branch {
        match ctx
            .runner
            .find_remote_for_branch(&ctx.cancellation, &ctx.repo_dir, branch)
        {
            Ok(Some(found)) => {
                ctx.runner
                    .fetch(&ctx.cancellation, &ctx.repo_dir, &found.remote, branch)?;
                track_remote = Some(found.remote);
            }
            Ok(None) => {}
            Err(e) => return Err(anyhow!("ambiguous remote for branch '{branch}': {e}")),
        }
    }

    // Step 1: stash transport, if requested.
    let source_dir = if options.sync {
        ctx.repo_dir.clone()
    } else if let Some(from) = &options.carry_from {
        from.clone()
    } else {
        ctx.repo_dir.clone()
    };
    let transport_mode = if options.sync {
        Some(TransportMode::Sync)
    } else if options.carry_from.is_some() {
        Some(TransportMode::Carry)
    } else {
        None
    };

    let pathspecs = if transport_mode.is_some() {
        stash_transport::expand_pathspecs(ctx.fs.as_ref(), &source_dir, &options.file_patterns)?
    } else {
        Vec::new()
    };

    let stash_handle = if let Some(_mode) = transport_mode {
        let message = format!("bosk: moving changes to {branch}");
        stash_transport::push(&ctx.cancellation, &ctx.runner, &source_dir, &message, &pathspecs)?
    } else {
        None
    };

    // Step 2: create the worktree. On failure after a successful push,
    // restore the source stash (spec §4.E failure table).
    let create_branch_here = create_branch && track_remote.is_none();
    let base = if create_branch_here {
        Some(
            ctx.config
                .default_source
                .clone()
                .unwrap_or_else(|| "HEAD".to_string()),
        )
    } else {
        None
    };
    let add_branch_ref = track_remote
        .as_ref()
        .map(|remote| format!("{remote}/{branch}"))
        .unwrap_or_else(|| branch.to_string());

    if let Err(e) = ctx.runner.worktree_add(
        &ctx.cancellation,
        &ctx.repo_dir,
        &worktree_path,
        &add_branch_ref,
        create_branch_here,
        base.as_deref(),
        options.lock,
        options.lock_reason.as_deref(),
    ) {
        if let Some(handle) = &stash_handle {
            let _ = stash_transport::restore_after_create_failure(
                &ctx.cancellation,
                &ctx.runner,
                &source_dir,
                handle,
            );
        }
        return Err(e).context("failed to create worktree");
    }

    // Step 3: submodules. Failure is a warning, never fatal.
    let submodules = if options.init_submodules || ctx.config.init_submodules == Some(true) {
        match ctx.runner.submodule_update(&ctx.cancellation, &worktree_path) {
            Ok(count) => SubmoduleInitResult {
                attempted: true,
                count,
                skipped: false,
                reason: String::new(),
            },
            Err(e) => {
                warn!(error = %e, "add:submodule init failed, continuing");
                SubmoduleInitResult {
                    attempted: true,
                    count: 0,
                    skipped: true,
                    reason: e.to_string(),
                }
            }
        }
    } else {
        SubmoduleInitResult::not_attempted()
    };

    // Steps 4: apply stash in target, drop/pop in source.
    let changes_moved = if let (Some(handle), Some(mode)) = (&stash_handle, transport_mode) {
        match stash_transport::finish(
            &ctx.cancellation,
            &ctx.runner,
            &source_dir,
            &worktree_path,
            handle,
            mode,
        ) {
            Ok(outcome) => outcome.changes_moved,
            Err(e) => {
                warn!(error = %e, "add:stash apply failed, rolling back worktree");
                let _ = ctx.runner.worktree_remove(
                    &ctx.cancellation,
                    &ctx.repo_dir,
                    &worktree_path,
                    stash_transport::APPLY_FAILURE_REMOVE_FORCE,
                );
                let _ = stash_transport::restore_after_create_failure(
                    &ctx.cancellation,
                    &ctx.runner,
                    &source_dir,
                    handle,
                );
                return Err(anyhow!(
                    "could not apply changes to '{branch}', likely due to conflicts. \
                     the new worktree has been removed; changes are safe in the stash ({e})"
                ));
            }
        }
    } else {
        false
    };

    // Step 5: symlinks.
    let symlinks = symlink_materializer::materialize(
        ctx.fs.as_ref(),
        &ctx.config.worktree_source_dir,
        &worktree_path,
        &ctx.config.symlinks,
        &MaterializeOptions {
            force: false,
            dry_run: false,
        },
    )?;

    info!(branch, path = %worktree_path.display(), "add:completed");

    Ok(AddResult {
        branch: branch.to_string(),
        worktree_path,
        submodules,
        symlinks,
        changes_moved,
    })
}
