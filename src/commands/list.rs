//! `List` orchestrator (spec §4.H "List / Init"). Returns worktrees and,
//! in verbose mode, per-worktree changed files fetched in parallel; bare
//! and prunable entries skip the file scan.

use std::sync::Mutex;

use anyhow::Result;

use crate::models::{FileStatus, Worktree};

use super::OrchestratorContext;

pub struct ListEntry {
    pub worktree: Worktree,
    pub changed_files: Vec<FileStatus>,
}

pub fn list(ctx: &OrchestratorContext, verbose: bool) -> Result<Vec<ListEntry>> {
    ctx.cancellation.check()?;

    let worktrees = ctx.runner.worktree_list(&ctx.cancellation, &ctx.repo_dir)?;

    if !verbose {
        return Ok(worktrees
            .into_iter()
            .map(|w| ListEntry {
                worktree: w,
                changed_files: Vec::new(),
            })
            .collect());
    }

    let buf: Mutex<Vec<(usize, ListEntry)>> = Mutex::new(Vec::new());
    rayon::scope(|s| {
        for (idx, worktree) in worktrees.iter().enumerate() {
            if ctx.cancellation.is_cancelled() {
                break;
            }
            s.spawn(|_| {
                if ctx.cancellation.is_cancelled() {
                    return;
                }
                let changed_files = if worktree.bare || worktree.prunable {
                    Vec::new()
                } else {
                    ctx.runner
                        .changed_files_with_status(&ctx.cancellation, &worktree.path)
                        .unwrap_or_default()
                };
                buf.lock().unwrap().push((
                    idx,
                    ListEntry {
                        worktree: worktree.clone(),
                        changed_files,
                    },
                ));
            });
        }
    });

    let mut buf = buf.into_inner().unwrap();
    buf.sort_by_key(|(idx, _)| *idx);
    Ok(buf.into_iter().map(|(_, e)| e).collect())
}
