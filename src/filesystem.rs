//! Component A: Filesystem Facade (spec §4.A). A small trait covering
//! every filesystem primitive the core touches, so orchestrators can be
//! driven against an in-memory double in tests instead of real disk I/O
//! (spec §9 "Filesystem + VCS abstraction").

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct Metadata {
    pub is_dir: bool,
    pub is_symlink: bool,
    pub is_file: bool,
}

pub trait Filesystem: Send + Sync {
    /// Follows symlinks.
    fn stat(&self, path: &Path) -> io::Result<Metadata>;
    /// Does not follow the final symlink component.
    fn lstat(&self, path: &Path) -> io::Result<Metadata>;
    /// Stores `src` verbatim as the link target; does not resolve it.
    fn symlink(&self, src: &Path, dst: &Path) -> io::Result<()>;
    fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()>;
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
    fn remove(&self, path: &Path) -> io::Result<()>;
    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Rooted at `dir`; evaluates `pattern` with doublestar semantics
    /// (`*` within a path segment, `**` across segments including zero)
    /// and returns matches relative to `dir`, in a deterministic order.
    fn glob(&self, dir: &Path, pattern: &str) -> io::Result<Vec<PathBuf>>;
}

pub fn is_not_exist(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
}

/// Real-disk implementation. `glob` walks `dir` with `walkdir` (skipping
/// `.git`) and matches relative paths against a compiled `globset`
/// matcher — the teacher's plain `glob` crate does not evaluate `**`
/// across zero path segments, which spec invariant 7 requires, hence the
/// switch to `globset` (grounded on the `kabu` tool's
/// `expand_link`/`contains_glob_pattern` glob handling).
pub struct RealFilesystem;

impl RealFilesystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

fn build_matcher(pattern: &str) -> io::Result<GlobSet> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(false)
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mut builder = GlobSetBuilder::new();
    builder.add(glob);
    builder
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

impl Filesystem for RealFilesystem {
    fn stat(&self, path: &Path) -> io::Result<Metadata> {
        let meta = std::fs::metadata(path)?;
        Ok(Metadata {
            is_dir: meta.is_dir(),
            is_symlink: false,
            is_file: meta.is_file(),
        })
    }

    fn lstat(&self, path: &Path) -> io::Result<Metadata> {
        let meta = std::fs::symlink_metadata(path)?;
        Ok(Metadata {
            is_dir: meta.is_dir(),
            is_symlink: meta.file_type().is_symlink(),
            is_file: meta.is_file(),
        })
    }

    fn symlink(&self, src: &Path, dst: &Path) -> io::Result<()> {
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(src, dst)
        }
        #[cfg(windows)]
        {
            if src.is_dir() {
                std::os::windows::fs::symlink_dir(src, dst)
            } else {
                std::os::windows::fs::symlink_file(src, dst)
            }
        }
    }

    fn mkdir_all(&self, path: &Path, _mode: u32) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            entries.push(entry?.path());
        }
        Ok(entries)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let meta = std::fs::symlink_metadata(path)?;
        if meta.is_dir() {
            std::fs::remove_dir(path)
        } else {
            std::fs::remove_file(path)
        }
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn glob(&self, dir: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
        let matcher = build_matcher(pattern)?;
        let mut matches = BTreeSet::new();
        let mut matched_dirs: Vec<PathBuf> = Vec::new();

        for entry in WalkDir::new(dir).follow_links(false).into_iter().filter_entry(|e| {
            e.file_name() != ".git"
        }) {
            let entry = entry.map_err(io::Error::other)?;
            let path = entry.path();
            if path == dir {
                continue;
            }
            let rel = path.strip_prefix(dir).unwrap_or(path).to_path_buf();

            if matched_dirs
                .iter()
                .any(|d| rel.starts_with(d) && rel != *d)
            {
                continue;
            }

            if matcher.is_match(&rel) {
                matches.insert(rel.clone());
                if entry.file_type().is_dir() {
                    matched_dirs.push(rel);
                }
            }
        }

        Ok(matches.into_iter().collect())
    }
}
