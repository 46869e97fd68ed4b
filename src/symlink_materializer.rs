//! Component F: Symlink Materializer (spec §4.F). Grounded on the
//! teacher's `workflow/setup.rs::handle_file_operations` symlink branch
//! (conflict detection via `lstat`, relative-target computation via
//! `pathdiff`), generalized onto the `Filesystem` trait so both real and
//! predicted (`--check`) runs share one code path, matching how the
//! `kabu` example's `process_operation` threads a `dry_run` flag through
//! its single conflict-handling routine instead of duplicating it.

use std::path::Path;

use crate::filesystem::{Filesystem, is_not_exist};
use crate::models::SymlinkResult;

pub struct MaterializeOptions {
    pub force: bool,
    /// Prediction mode (spec §4.F "Prediction mode"): identical logic,
    /// no creation side effects.
    pub dry_run: bool,
}

/// Expands every pattern in `patterns` against `src_dir` and symlinks
/// each match into the equivalent relative location under `dst_dir`.
pub fn materialize(
    fs: &dyn Filesystem,
    src_dir: &Path,
    dst_dir: &Path,
    patterns: &[String],
    options: &MaterializeOptions,
) -> anyhow::Result<Vec<SymlinkResult>> {
    let mut results = Vec::new();
    for pattern in patterns {
        let matches = fs.glob(src_dir, pattern)?;
        if matches.is_empty() {
            results.push(SymlinkResult {
                src: src_dir.join(pattern),
                dst: dst_dir.join(pattern),
                skipped: true,
                reason: format!("{pattern} does not match any files, skipping"),
            });
            continue;
        }
        for m in matches {
            results.push(materialize_one(fs, src_dir, dst_dir, &m, options)?);
        }
    }
    Ok(results)
}

fn materialize_one(
    fs: &dyn Filesystem,
    src_dir: &Path,
    dst_dir: &Path,
    rel: &Path,
    options: &MaterializeOptions,
) -> anyhow::Result<SymlinkResult> {
    let src = src_dir.join(rel);
    let dst = dst_dir.join(rel);

    match fs.lstat(&dst) {
        Ok(meta) if meta.is_symlink && options.force => {
            if !options.dry_run {
                fs.remove(&dst)?;
            }
        }
        Ok(_) => {
            return Ok(SymlinkResult {
                src,
                dst,
                skipped: true,
                reason: format!(
                    "skipping symlink for {} (already exists)",
                    rel.display()
                ),
            });
        }
        Err(e) if is_not_exist(&e) => {}
        Err(e) => return Err(e.into()),
    }

    if !options.dry_run {
        if let Some(parent) = dst.parent()
            && parent != dst_dir
        {
            fs.mkdir_all(parent, 0o755)?;
        }
        let link_target = dst
            .parent()
            .and_then(|parent| pathdiff::diff_paths(&src, parent))
            .unwrap_or_else(|| src.clone());
        fs.symlink(&link_target, &dst)?;
    }

    Ok(SymlinkResult {
        src,
        dst,
        skipped: false,
        reason: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryFilesystem;
    use std::path::PathBuf;

    #[test]
    fn glob_completeness_matches_top_level_and_nested() {
        let fs = MemoryFilesystem::with_files([
            (PathBuf::from("/src/top.x"), b"a".to_vec()),
            (PathBuf::from("/src/nested/deep/file.x"), b"b".to_vec()),
            (PathBuf::from("/src/other.txt"), b"c".to_vec()),
        ]);
        let mut matches = fs.glob(Path::new("/src"), "**/*.x").unwrap();
        matches.sort();
        assert_eq!(
            matches,
            vec![
                PathBuf::from("nested/deep/file.x"),
                PathBuf::from("top.x"),
            ]
        );
    }

    #[test]
    fn idempotent_second_run_skips_existing() {
        let fs = MemoryFilesystem::with_files([(PathBuf::from("/src/.envrc"), b"x".to_vec())]);
        fs.mkdir_all(Path::new("/dst"), 0o755).unwrap();

        let opts = MaterializeOptions {
            force: false,
            dry_run: false,
        };
        let first = materialize(
            &fs,
            Path::new("/src"),
            Path::new("/dst"),
            &[".envrc".to_string()],
            &opts,
        )
        .unwrap();
        assert!(!first[0].skipped);

        let second = materialize(
            &fs,
            Path::new("/src"),
            Path::new("/dst"),
            &[".envrc".to_string()],
            &opts,
        )
        .unwrap();
        assert!(second[0].skipped);
        assert!(second[0].reason.contains("already exists"));
    }

    #[test]
    fn no_match_emits_skipped_result() {
        let fs = MemoryFilesystem::new();
        fs.mkdir_all(Path::new("/src"), 0o755).unwrap();
        let opts = MaterializeOptions {
            force: false,
            dry_run: false,
        };
        let results = materialize(
            &fs,
            Path::new("/src"),
            Path::new("/dst"),
            &["*.nope".to_string()],
            &opts,
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].skipped);
        assert!(results[0].reason.contains("does not match"));
    }
}
