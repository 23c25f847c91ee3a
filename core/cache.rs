use crate::filesystem::{DirEntry, FileSystem};
use crate::selection::{SelectionStore, TriState};
use log;
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

/// What a set of children has shown so far about a directory's aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Evidence {
    saw_selected: bool,
    saw_unselected: bool,
}

impl Evidence {
    fn of(state: TriState) -> Self {
        match state {
            TriState::NotSelected => Evidence {
                saw_selected: false,
                saw_unselected: true,
            },
            TriState::Partial => Evidence {
                saw_selected: true,
                saw_unselected: true,
            },
            TriState::FullySelected => Evidence {
                saw_selected: true,
                saw_unselected: false,
            },
        }
    }

    fn merge(self, other: Evidence) -> Evidence {
        Evidence {
            saw_selected: self.saw_selected || other.saw_selected,
            saw_unselected: self.saw_unselected || other.saw_unselected,
        }
    }

    /// Once both kinds have been seen the aggregate can only be `Partial`.
    fn is_decided(self) -> bool {
        self.saw_selected && self.saw_unselected
    }

    fn into_state(self) -> TriState {
        match (self.saw_selected, self.saw_unselected) {
            (true, true) => TriState::Partial,
            (true, false) => TriState::FullySelected,
            _ => TriState::NotSelected,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Memoized tri-state per directory.
///
/// Every entry present must equal a from-scratch recomputation over the
/// current store and filesystem. Entries are only ever inserted by
/// [`resolve`](Self::resolve) or removed by the invalidation methods; they are
/// never rewritten in place.
#[derive(Debug, Clone, Default)]
pub struct DirectoryStateCache {
    entries: HashMap<PathBuf, TriState>,
    stats: CacheStats,
}

impl DirectoryStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached state of directory `path`, computing and caching it
    /// (and every subdirectory visited on the way) on a miss.
    ///
    /// A directory that cannot be listed resolves to `NotSelected`. An empty
    /// directory resolves to its own store entry. Otherwise children are
    /// visited in listing order until both selected and unselected evidence
    /// has been seen; subdirectories visited before that point stay cached.
    /// A regular file is never cached and reports its own store entry.
    pub fn resolve<F: FileSystem + ?Sized>(
        &mut self,
        path: &Path,
        store: &SelectionStore,
        fs: &F,
    ) -> TriState {
        if let Some(state) = self.entries.get(path) {
            self.stats.hits += 1;
            log::trace!("Cache hit for {}: {:?}", path.display(), state);
            return *state;
        }
        if fs.is_file(path) {
            return TriState::from_selected(store.get(path));
        }
        self.stats.misses += 1;
        let state = self.compute(path, store, fs);
        log::trace!("Cached {} as {:?}", path.display(), state);
        self.entries.insert(path.to_path_buf(), state);
        state
    }

    fn compute<F: FileSystem + ?Sized>(
        &mut self,
        path: &Path,
        store: &SelectionStore,
        fs: &F,
    ) -> TriState {
        let children = match fs.read_dir(path) {
            Ok(children) => children,
            Err(e) => {
                log::warn!(
                    "Cannot list {} ({}), treating it as not selected",
                    path.display(),
                    e
                );
                return TriState::NotSelected;
            }
        };

        // An empty directory is a leaf. Left unselected, it makes an otherwise
        // fully selected parent Partial even though it holds no files.
        if children.is_empty() {
            return TriState::from_selected(store.get(path));
        }

        let folded = children.iter().try_fold(Evidence::default(), |seen, child| {
            let seen = seen.merge(self.child_evidence(child, store, fs));
            if seen.is_decided() {
                log::trace!(
                    "{} is partial after {}, skipping remaining siblings",
                    path.display(),
                    child.path.display()
                );
                ControlFlow::Break(seen)
            } else {
                ControlFlow::Continue(seen)
            }
        });
        match folded {
            ControlFlow::Break(seen) | ControlFlow::Continue(seen) => seen.into_state(),
        }
    }

    fn child_evidence<F: FileSystem + ?Sized>(
        &mut self,
        child: &DirEntry,
        store: &SelectionStore,
        fs: &F,
    ) -> Evidence {
        let state = if child.is_dir() {
            self.resolve(&child.path, store, fs)
        } else {
            TriState::from_selected(store.get(&child.path))
        };
        Evidence::of(state)
    }

    /// Drops the entry for exactly `path`; cached descendants are kept.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        let removed = self.entries.remove(path).is_some();
        if removed {
            log::trace!("Invalidated {}", path.display());
        }
        removed
    }

    /// Drops the entries of every ancestor of `path`, up to the root.
    pub fn invalidate_ancestors(&mut self, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            self.invalidate(ancestor);
        }
    }

    pub fn clear_all(&mut self) {
        log::debug!("Clearing {} cached directory states", self.entries.len());
        self.entries.clear();
    }

    /// Peeks at a cached entry without computing anything.
    pub fn get(&self, path: &Path) -> Option<TriState> {
        self.entries.get(path).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Path, TriState)> {
        self.entries.iter().map(|(p, s)| (p.as_path(), *s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::MemoryFileSystem;
    use pretty_assertions::assert_eq;

    fn p(s: &str) -> &Path {
        Path::new(s)
    }

    #[test]
    fn mixed_files_resolve_to_partial() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/d/a", "a").add_file("/d/b", "b");
        let store = SelectionStore::from_selected(["/d/a"]);

        let mut cache = DirectoryStateCache::new();
        assert_eq!(cache.resolve(p("/d"), &store, &fs), TriState::Partial);
    }

    #[test]
    fn all_selected_files_resolve_to_full() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/d/a", "a").add_file("/d/c", "c");
        let store = SelectionStore::from_selected(["/d/a", "/d/c"]);

        let mut cache = DirectoryStateCache::new();
        assert_eq!(cache.resolve(p("/d"), &store, &fs), TriState::FullySelected);
    }

    #[test]
    fn empty_directory_uses_its_own_entry() {
        let mut fs = MemoryFileSystem::new();
        fs.add_dir("/e");

        let mut cache = DirectoryStateCache::new();
        assert_eq!(
            cache.resolve(p("/e"), &SelectionStore::new(), &fs),
            TriState::NotSelected
        );

        let mut cache = DirectoryStateCache::new();
        let store = SelectionStore::from_selected(["/e"]);
        assert_eq!(cache.resolve(p("/e"), &store, &fs), TriState::FullySelected);
    }

    #[test]
    fn non_empty_directory_ignores_its_own_entry() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/d/a", "a");
        let store = SelectionStore::from_selected(["/d"]);

        let mut cache = DirectoryStateCache::new();
        assert_eq!(cache.resolve(p("/d"), &store, &fs), TriState::NotSelected);
    }

    #[test]
    fn second_resolve_is_served_from_cache() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/d/sub/a", "a").add_file("/d/b", "b");
        let store = SelectionStore::from_selected(["/d/sub/a", "/d/b"]);

        let mut cache = DirectoryStateCache::new();
        let first = cache.resolve(p("/d"), &store, &fs);
        let calls_after_first = fs.read_dir_calls();
        assert!(calls_after_first > 0);

        let second = cache.resolve(p("/d"), &store, &fs);
        assert_eq!(first, second);
        assert_eq!(fs.read_dir_calls(), calls_after_first);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 2 });
    }

    #[test]
    fn short_circuit_still_caches_visited_subdirectories() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/d/a/f", "f")
            .add_file("/d/b/g", "g")
            .add_file("/d/c/h", "h");
        let store = SelectionStore::from_selected(["/d/a/f"]);

        let mut cache = DirectoryStateCache::new();
        assert_eq!(cache.resolve(p("/d"), &store, &fs), TriState::Partial);

        // a and b were visited before both kinds of evidence were seen.
        assert_eq!(cache.get(p("/d/a")), Some(TriState::FullySelected));
        assert_eq!(cache.get(p("/d/b")), Some(TriState::NotSelected));
        // c comes after the short circuit and was never listed.
        assert_eq!(cache.get(p("/d/c")), None);
        assert_eq!(fs.read_dir_calls(), 3);

        assert_eq!(cache.resolve(p("/d/c"), &store, &fs), TriState::NotSelected);
    }

    #[test]
    fn partial_subdirectory_decides_parent_immediately() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/d/a/x", "x")
            .add_file("/d/a/y", "y")
            .add_file("/d/b/z", "z");
        let store = SelectionStore::from_selected(["/d/a/x"]);

        let mut cache = DirectoryStateCache::new();
        assert_eq!(cache.resolve(p("/d"), &store, &fs), TriState::Partial);
        assert_eq!(cache.get(p("/d/a")), Some(TriState::Partial));
        assert_eq!(cache.get(p("/d/b")), None);
    }

    #[test]
    fn unreadable_directory_degrades_to_not_selected() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/d/locked/secret", "s")
            .add_file("/d/open", "o")
            .deny("/d/locked");
        let store = SelectionStore::from_selected(["/d/locked/secret", "/d/open"]);

        let mut cache = DirectoryStateCache::new();
        assert_eq!(cache.resolve(p("/d/locked"), &store, &fs), TriState::NotSelected);
        assert_eq!(cache.resolve(p("/d"), &store, &fs), TriState::Partial);
    }

    #[test]
    fn file_paths_report_their_store_entry_uncached() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/d/a", "a").add_file("/d/b", "b");
        let store = SelectionStore::from_selected(["/d/a"]);

        let mut cache = DirectoryStateCache::new();
        assert_eq!(cache.resolve(p("/d/a"), &store, &fs), TriState::FullySelected);
        assert_eq!(cache.resolve(p("/d/b"), &store, &fs), TriState::NotSelected);
        assert!(cache.is_empty());
        assert_eq!(fs.read_dir_calls(), 0);
    }

    #[test]
    fn invalidate_removes_only_the_exact_entry() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/d/sub/a", "a");
        let store = SelectionStore::new();

        let mut cache = DirectoryStateCache::new();
        cache.resolve(p("/d"), &store, &fs);
        assert_eq!(cache.len(), 2);

        assert!(cache.invalidate(p("/d")));
        assert!(!cache.invalidate(p("/d")));
        assert_eq!(cache.get(p("/d/sub")), Some(TriState::NotSelected));
    }

    #[test]
    fn invalidate_ancestors_walks_to_the_root() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/r/a/b/c.txt", "c").add_file("/r/other/x", "x");
        let store = SelectionStore::new();

        let mut cache = DirectoryStateCache::new();
        cache.resolve(p("/"), &store, &fs);
        assert_eq!(cache.len(), 5);

        cache.invalidate_ancestors(p("/r/a/b/c.txt"));
        assert_eq!(cache.get(p("/")), None);
        assert_eq!(cache.get(p("/r")), None);
        assert_eq!(cache.get(p("/r/a")), None);
        assert_eq!(cache.get(p("/r/a/b")), None);
        assert_eq!(cache.get(p("/r/other")), Some(TriState::NotSelected));

        cache.clear_all();
        assert!(cache.is_empty());
    }
}
