mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing::error;

use bosk::commands::OrchestratorContext;
use bosk::commands::add::{self, AddOptions};
use bosk::commands::clean::{self, CleanOptions};
use bosk::commands::init;
use bosk::commands::list;
use bosk::commands::remove::{self, RemoveOptions};
use bosk::commands::sync::{self, SyncOptions};
use bosk::config;
use bosk::context::Context as CancellationContext;
use bosk::error::{self as bosk_error, ExitCode as BoskExitCode};
use bosk::filesystem::RealFilesystem;
use bosk::format::{self, Verbosity};
use bosk::models::ForceLevel;
use bosk::vcs_executor::RealExecutor;
use bosk::vcs_runner::GitRunner;

use cli::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = bosk::logger::init() {
        eprintln!("failed to initialize logging: {e}");
    }

    match run(cli) {
        Ok(code) => exit_code_to_process(code),
        Err(e) => {
            error!(error = %e, "bosk:fatal");
            eprintln!("error: {e}");
            if let Some(hint) = format::hint_for_stderr(&e.to_string()) {
                eprintln!("  hint: {hint}");
            }
            exit_code_to_process(bosk_error::exit_code_for(&e))
        }
    }
}

fn exit_code_to_process(code: BoskExitCode) -> ExitCode {
    ExitCode::from(match code {
        BoskExitCode::Success => 0,
        BoskExitCode::Failure => 1,
        BoskExitCode::Usage => 2,
        BoskExitCode::Partial => 3,
    })
}

fn run(cli: Cli) -> Result<BoskExitCode> {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Default
    };

    let cwd = std::env::current_dir().context("failed to determine current directory")?;

    match cli.command {
        Commands::Completions(args) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(args.shell, &mut cmd, name, &mut std::io::stdout());
            Ok(BoskExitCode::Success)
        }
        Commands::Init(args) => {
            let path = init::init(&cwd, args.force)?;
            println!("wrote {}", path.display());
            Ok(BoskExitCode::Success)
        }
        Commands::Add(args) => {
            let ctx = build_context(&cwd)?;
            if args.sync && args.carry {
                return Err(bosk::error::UsageError(
                    "--sync and --carry are mutually exclusive".into(),
                )
                .into());
            }
            let carry_from = if args.carry {
                Some(
                    args.source
                        .map(std::path::PathBuf::from)
                        .unwrap_or_else(|| cwd.clone()),
                )
            } else {
                None
            };
            let result = add::add(
                &ctx,
                &args.name,
                AddOptions {
                    sync: args.sync,
                    carry_from,
                    file_patterns: args.file_patterns,
                    lock: args.lock,
                    lock_reason: args.lock_reason,
                    init_submodules: args.init_submodules,
                },
            )?;
            match verbosity {
                Verbosity::Quiet => println!("{}", result.worktree_path.display()),
                _ => println!(
                    "created '{}' at {}",
                    result.branch,
                    result.worktree_path.display()
                ),
            }
            Ok(BoskExitCode::Success)
        }
        Commands::List(_args) => {
            let ctx = build_context(&cwd)?;
            let entries = list::list(&ctx, matches!(verbosity, Verbosity::Verbose))?;
            for entry in entries {
                match verbosity {
                    Verbosity::Quiet => println!("{}", entry.worktree.path.display()),
                    _ => println!(
                        "{}\t{}",
                        entry.worktree.branch_name(),
                        entry.worktree.path.display()
                    ),
                }
            }
            Ok(BoskExitCode::Success)
        }
        Commands::Remove(args) => {
            let ctx = build_context(&cwd)?;
            let force_level = if args.force_locked {
                ForceLevel::Locked
            } else if args.force {
                ForceLevel::Unclean
            } else {
                ForceLevel::None
            };
            let mut failures = 0usize;
            for name in &args.names {
                let result = remove::remove(
                    &ctx,
                    name,
                    RemoveOptions {
                        force_level,
                        check: args.check,
                        cwd: cwd.clone(),
                    },
                );
                match result {
                    Ok(removed) => {
                        let (stdout, stderr) = format::format_removed(&removed, verbosity);
                        print!("{stdout}");
                        eprint!("{stderr}");
                    }
                    Err(e) => {
                        failures += 1;
                        eprintln!("error: {name}: {e}");
                    }
                }
            }
            Ok(if failures > 0 {
                BoskExitCode::Partial
            } else {
                BoskExitCode::Success
            })
        }
        Commands::Clean(args) => {
            let ctx = build_context(&cwd)?;
            let force_level = if args.force_locked {
                ForceLevel::Locked
            } else if args.force {
                ForceLevel::Unclean
            } else {
                ForceLevel::None
            };
            let result = clean::clean(
                &ctx,
                CleanOptions {
                    check: args.check,
                    force_level,
                    target: args.target,
                    cwd: cwd.clone(),
                },
            )?;
            for candidate in &result.candidates {
                print!("{}", format::format_clean_candidate(candidate, verbosity));
            }
            let failures = result.removed.iter().filter(|r| r.err.is_some()).count();
            for removed in &result.removed {
                let (stdout, stderr) = format::format_removed(removed, verbosity);
                print!("{stdout}");
                eprint!("{stderr}");
            }
            Ok(if failures > 0 {
                BoskExitCode::Partial
            } else {
                BoskExitCode::Success
            })
        }
        Commands::Sync(args) => {
            let ctx = build_context(&cwd)?;
            // The symlink/submodule source is the `--source` branch's own
            // worktree directory, not wherever `bosk` happened to be
            // invoked from (spec's Sync input has `source_branch` and
            // `source_path` as distinct fields for exactly this reason).
            let source_path = match &args.source {
                Some(branch) => {
                    ctx.runner
                        .worktree_find_by_branch(&ctx.cancellation, &ctx.repo_dir, branch)?
                        .path
                }
                None => ctx.config.worktree_source_dir.clone(),
            };
            let symlink_patterns = ctx.config.symlinks.clone();
            let init_submodules = ctx.config.init_submodules.unwrap_or(false);
            let results = sync::sync(
                &ctx,
                &args.branches,
                SyncOptions {
                    check: args.check,
                    all: args.all,
                    source_branch: args.source,
                    source_path,
                    symlink_patterns,
                    init_submodules,
                    cwd: cwd.clone(),
                },
            )?;
            let mut failures = 0usize;
            for r in &results {
                if let Some(skip) = &r.skipped {
                    println!("'{}': {}", r.branch, skip);
                } else {
                    println!("synced '{}'", r.branch);
                }
                if r.submodules.skipped {
                    failures += 1;
                }
            }
            Ok(if failures > 0 {
                BoskExitCode::Partial
            } else {
                BoskExitCode::Success
            })
        }
    }
}

fn build_context(cwd: &std::path::Path) -> Result<OrchestratorContext> {
    let cancellation = CancellationContext::new();
    let probe_executor = Arc::new(RealExecutor::new());
    let probe_runner = GitRunner::new(probe_executor);
    let repo_dir = probe_runner
        .get_repo_root(&cancellation, cwd)
        .map_err(|e| anyhow::anyhow!("not in a git repository: {e}"))?;
    let config = config::load(&repo_dir)?;
    Ok(OrchestratorContext {
        runner: GitRunner::new(Arc::new(RealExecutor::new())),
        fs: Arc::new(RealFilesystem::new()),
        repo_dir,
        config,
        cancellation,
    })
}
