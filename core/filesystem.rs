use log;
#[cfg(feature = "serde_support")]
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub mod memory;

pub use memory::MemoryFileSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "lowercase"))]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// Read-only view of the tree the selection engine walks.
///
/// Everything the engine knows about directory structure comes through this
/// trait, so the cache and mutators run the same way over a real disk and
/// over [`MemoryFileSystem`].
pub trait FileSystem {
    /// Lists the immediate children of `path`, sorted by path.
    ///
    /// Anything that is not a directory is reported as [`EntryKind::File`].
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    fn is_dir(&self, path: &Path) -> bool;

    /// True only for regular files.
    fn is_file(&self, path: &Path) -> bool;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

impl<T: FileSystem + ?Sized> FileSystem for &T {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        (**self).read_dir(path)
    }
    fn is_dir(&self, path: &Path) -> bool {
        (**self).is_dir(path)
    }
    fn is_file(&self, path: &Path) -> bool {
        (**self).is_file(path)
    }
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read(path)
    }
}

/// The live filesystem.
///
/// Children are classified without following symlinks, so a link to a
/// directory counts as a file and cannot send the recursive walks into a loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry_result in fs::read_dir(path)? {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry in {}: {}", path.display(), e);
                    continue;
                }
            };
            let kind = match entry.file_type() {
                Ok(ft) if ft.is_dir() => EntryKind::Directory,
                Ok(_) => EntryKind::File,
                Err(e) => {
                    log::warn!(
                        "Could not determine type of {}: {}",
                        entry.path().display(),
                        e
                    );
                    continue;
                }
            };
            entries.push(DirEntry {
                path: entry.path(),
                kind,
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn is_dir(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok_and(|m| m.is_dir())
    }

    fn is_file(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok_and(|m| m.is_file())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn real_read_dir_sorts_and_classifies() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("b_dir")).unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        File::create(dir.path().join("c.txt")).unwrap();

        let entries = RealFileSystem.read_dir(dir.path()).unwrap();
        let summary: Vec<(String, EntryKind)> = entries
            .iter()
            .map(|e| (e.file_name(), e.kind))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("a.txt".to_string(), EntryKind::File),
                ("b_dir".to_string(), EntryKind::Directory),
                ("c.txt".to_string(), EntryKind::File),
            ]
        );
    }

    #[test]
    fn real_read_dir_on_missing_path_errors() {
        let dir = tempdir().unwrap();
        assert!(RealFileSystem.read_dir(&dir.path().join("nope")).is_err());
        assert!(!RealFileSystem.is_file(&dir.path().join("nope")));
        assert!(!RealFileSystem.is_dir(&dir.path().join("nope")));
    }
}
