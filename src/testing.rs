//! In-memory test doubles for the Filesystem Facade (`filesystem.rs`) and
//! VCS Executor (`vcs_executor.rs`) boundaries, per spec §9 "Filesystem +
//! VCS abstraction": both interfaces exist so orchestrators can be driven
//! in tests without a real process or disk. Always compiled (not
//! `#[cfg(test)]`-gated) so the crate's `tests/` integration suite and
//! downstream consumers can use them directly.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::filesystem::{Filesystem, Metadata};
use crate::vcs_executor::VcsExecutor;
use crate::error::VcsError;

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Symlink(PathBuf),
    Dir,
}

/// An in-memory tree keyed by absolute, non-canonicalized path. Good
/// enough for unit/integration tests that never need real symlink
/// resolution (the facade's own `symlink` never resolves targets either,
/// per spec §4.A).
#[derive(Default)]
pub struct MemoryFilesystem {
    nodes: Mutex<HashMap<PathBuf, Node>>,
}

impl MemoryFilesystem {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_files(files: impl IntoIterator<Item = (PathBuf, Vec<u8>)>) -> Self {
        let fs = Self::new();
        {
            let mut nodes = fs.nodes.lock().unwrap();
            for (path, contents) in files {
                let mut cur = PathBuf::new();
                for comp in path.parent().unwrap_or(Path::new("")).components() {
                    cur.push(comp);
                    nodes.entry(cur.clone()).or_insert(Node::Dir);
                }
                nodes.insert(path, Node::File(contents));
            }
        }
        fs
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such path: {}", path.display()),
        )
    }
}

impl Filesystem for MemoryFilesystem {
    fn stat(&self, path: &Path) -> io::Result<Metadata> {
        self.lstat(path)
    }

    fn lstat(&self, path: &Path) -> io::Result<Metadata> {
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(path) {
            Some(Node::File(_)) => Ok(Metadata {
                is_dir: false,
                is_symlink: false,
                is_file: true,
            }),
            Some(Node::Symlink(_)) => Ok(Metadata {
                is_dir: false,
                is_symlink: true,
                is_file: false,
            }),
            Some(Node::Dir) => Ok(Metadata {
                is_dir: true,
                is_symlink: false,
                is_file: false,
            }),
            None => Err(Self::not_found(path)),
        }
    }

    fn symlink(&self, src: &Path, dst: &Path) -> io::Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        if nodes.contains_key(dst) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", dst.display()),
            ));
        }
        nodes.insert(dst.to_path_buf(), Node::Symlink(src.to_path_buf()));
        Ok(())
    }

    fn mkdir_all(&self, path: &Path, _mode: u32) -> io::Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        let mut cur = PathBuf::new();
        for comp in path.components() {
            cur.push(comp);
            nodes.entry(cur.clone()).or_insert(Node::Dir);
        }
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let nodes = self.nodes.lock().unwrap();
        if !matches!(nodes.get(path), Some(Node::Dir)) {
            return Err(Self::not_found(path));
        }
        Ok(nodes
            .keys()
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        if nodes.remove(path).is_none() {
            return Err(Self::not_found(path));
        }
        Ok(())
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        nodes.insert(path.to_path_buf(), Node::File(contents.to_vec()));
        Ok(())
    }

    fn glob(&self, dir: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
        use globset::GlobBuilder;
        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let matcher = glob.compile_matcher();

        let nodes = self.nodes.lock().unwrap();
        let mut matches: Vec<PathBuf> = nodes
            .keys()
            .filter_map(|p| p.strip_prefix(dir).ok())
            .filter(|rel| !rel.as_os_str().is_empty() && matcher.is_match(rel))
            .map(PathBuf::from)
            .collect();
        matches.sort();
        matches.dedup();
        Ok(matches)
    }
}

/// Scripted `VcsExecutor` double: each call consumes the next scripted
/// response for its `argv`, in the order calls are made. Panics (test
/// failure, not production behavior) if more calls are made than were
/// scripted.
#[derive(Default)]
pub struct MockExecutor {
    calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
    responses: Mutex<Vec<Result<String, VcsError>>>,
}

impl MockExecutor {
    pub fn new(responses: Vec<Result<String, VcsError>>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(responses.into_iter().rev().collect()),
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl VcsExecutor for MockExecutor {
    fn run(&self, dir: &Path, argv: &[&str]) -> Result<String, VcsError> {
        self.calls
            .lock()
            .unwrap()
            .push((dir.to_path_buf(), argv.iter().map(|s| s.to_string()).collect()));
        self.responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(VcsError::new(argv.join(" "), "no scripted response", None)))
    }
}
