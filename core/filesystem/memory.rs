use super::{DirEntry, EntryKind, FileSystem};
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Directory,
}

/// In-memory tree for exercising the selection engine without a disk.
///
/// Parent directories are created implicitly. Directories can be marked
/// unreadable to simulate permission errors, and every `read_dir` call is
/// counted so tests can assert when the cache touched the filesystem.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    nodes: BTreeMap<PathBuf, Node>,
    unreadable: BTreeSet<PathBuf>,
    read_dir_calls: Cell<usize>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        self.ensure_parents(path);
        self.nodes.insert(path.to_path_buf(), Node::Directory);
        self
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> &mut Self {
        let path = path.as_ref();
        self.ensure_parents(path);
        self.nodes
            .insert(path.to_path_buf(), Node::File(contents.into()));
        self
    }

    /// Removes `path` and everything below it.
    pub fn remove(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        self.nodes.retain(|p, _| !p.starts_with(path));
        self
    }

    pub fn deny(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.unreadable.insert(path.as_ref().to_path_buf());
        self
    }

    pub fn read_dir_calls(&self) -> usize {
        self.read_dir_calls.get()
    }

    pub fn reset_counters(&self) {
        self.read_dir_calls.set(0);
    }

    /// All directories, each listed before its children.
    pub fn directories(&self) -> Vec<PathBuf> {
        self.nodes
            .iter()
            .filter(|(_, node)| matches!(node, Node::Directory))
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn files(&self) -> Vec<PathBuf> {
        self.nodes
            .iter()
            .filter(|(_, node)| matches!(node, Node::File(_)))
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn ensure_parents(&mut self, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.nodes
                .entry(ancestor.to_path_buf())
                .or_insert(Node::Directory);
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        self.read_dir_calls.set(self.read_dir_calls.get() + 1);
        if self.unreadable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            ));
        }
        match self.nodes.get(path) {
            Some(Node::Directory) => {}
            Some(Node::File(_)) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not a directory: {}", path.display()),
                ));
            }
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such directory: {}", path.display()),
                ));
            }
        }
        // BTreeMap iteration is already sorted by path.
        Ok(self
            .nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .map(|(p, node)| DirEntry {
                path: p.clone(),
                kind: match node {
                    Node::Directory => EntryKind::Directory,
                    Node::File(_) => EntryKind::File,
                },
            })
            .collect())
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.nodes.get(path), Some(Node::Directory))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.nodes.get(path), Some(Node::File(_)))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.nodes.get(path) {
            Some(Node::File(bytes)) => Ok(bytes.clone()),
            Some(Node::Directory) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a directory: {}", path.display()),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )),
        }
    }
}
