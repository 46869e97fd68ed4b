//! Component I: Result & Formatter (spec §4.I). Pure functions of a
//! result value; never perform I/O beyond string assembly. Three
//! verbosity levels per spec §6/§7: quiet (machine-parsable), default
//! (one headline), verbose (per-step detail plus hints).

use crate::models::{CleanCandidate, RemovedWorktree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Default,
    Verbose,
}

/// Maps known VCS stderr substrings to an actionable one-line hint (spec
/// §7). Only the two documented patterns are handled; unmatched stderr
/// gets no hint rather than a guessed one.
pub fn hint_for_stderr(stderr: &str) -> Option<&'static str> {
    if stderr.contains("modified or untracked files") {
        Some("use `--force`")
    } else if stderr.contains("locked working tree") {
        Some("run `worktree unlock` or use `-ff`")
    } else {
        None
    }
}

pub fn format_removed(result: &RemovedWorktree, verbosity: Verbosity) -> (String, String) {
    let mut stdout = String::new();
    let mut stderr = String::new();

    if let Some(err) = &result.err {
        stderr.push_str(&format!("error: {}: {err}\n", result.branch));
        if let Some(hint) = hint_for_stderr(err) {
            stderr.push_str(&format!("  hint: {hint}\n"));
        }
        return (stdout, stderr);
    }

    match verbosity {
        Verbosity::Quiet => {
            stdout.push_str(&result.worktree_path.display().to_string());
            stdout.push('\n');
        }
        Verbosity::Default => {
            if result.pruned {
                stdout.push_str(&format!("pruned and removed '{}'\n", result.branch));
            } else {
                stdout.push_str(&format!("removed '{}'\n", result.branch));
            }
        }
        Verbosity::Verbose => {
            stdout.push_str(&format!(
                "removed '{}' at {}\n",
                result.branch,
                result.worktree_path.display()
            ));
            for dir in &result.cleaned_dirs {
                stdout.push_str(&format!("  cleaned empty directory {}\n", dir.display()));
            }
            if !result.git_output.is_empty() {
                stdout.push_str(&format!("  {}\n", result.git_output));
            }
        }
    }

    (stdout, stderr)
}

pub fn format_clean_candidate(candidate: &CleanCandidate, verbosity: Verbosity) -> String {
    if candidate.skipped {
        match verbosity {
            Verbosity::Quiet => String::new(),
            _ => format!(
                "skip '{}': {}\n",
                candidate.branch,
                candidate
                    .skip_reason
                    .map(|r| r.to_string())
                    .unwrap_or_default()
            ),
        }
    } else {
        match verbosity {
            Verbosity::Quiet => format!("{}\n", candidate.worktree_path.display()),
            _ => format!(
                "'{}' is cleanable ({})\n",
                candidate.branch,
                candidate
                    .clean_reason
                    .map(|r| r.to_string())
                    .unwrap_or_default()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_matches_known_patterns() {
        assert_eq!(
            hint_for_stderr("fatal: '/x' contains modified or untracked files, use --force"),
            Some("use `--force`")
        );
        assert_eq!(
            hint_for_stderr("fatal: '/x' is a locked working tree"),
            Some("run `worktree unlock` or use `-ff`")
        );
        assert_eq!(hint_for_stderr("fatal: something else"), None);
    }
}
