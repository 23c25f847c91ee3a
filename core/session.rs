use crate::cache::{CacheStats, DirectoryStateCache};
use crate::context::{self, GeneratedContext};
use crate::error::{AppError, Result};
use crate::filesystem::{FileSystem, RealFileSystem};
use crate::projects::Project;
use crate::selection::{SelectionStore, TriState};
use log;
use std::path::{Path, PathBuf};

/// A cached entry that no longer matches a from-scratch recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleEntry {
    pub path: PathBuf,
    pub cached: TriState,
    pub fresh: TriState,
}

/// One user's selection over one directory tree.
///
/// The session is the single owner of the selection store and the directory
/// state cache. Its mutators are the only code that writes the store, and each
/// one finishes its invalidation before returning, so any later
/// [`resolve`](Self::resolve) sees a consistent cache.
#[derive(Debug)]
pub struct Session<F: FileSystem = RealFileSystem> {
    root: PathBuf,
    fs: F,
    store: SelectionStore,
    cache: DirectoryStateCache,
}

impl Session<RealFileSystem> {
    pub fn on_disk(root: impl Into<PathBuf>) -> Self {
        Self::new(root, RealFileSystem)
    }
}

impl<F: FileSystem> Session<F> {
    pub fn new(root: impl Into<PathBuf>, fs: F) -> Self {
        Self {
            root: root.into(),
            fs,
            store: SelectionStore::new(),
            cache: DirectoryStateCache::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn cache(&self) -> &DirectoryStateCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Tri-state of `path`, served from the cache when possible. Files are
    /// answered from the store and never cached.
    pub fn resolve(&mut self, path: &Path) -> TriState {
        self.cache.resolve(path, &self.store, &self.fs)
    }

    /// Display state of any node: directories go through the cache, files
    /// read their store entry directly.
    pub fn state_of(&mut self, path: &Path) -> TriState {
        if self.fs.is_dir(path) {
            self.resolve(path)
        } else {
            TriState::from_selected(self.store.get(path))
        }
    }

    /// Sets `path` and, for a directory, everything beneath it to `selected`.
    pub fn set_recursive(&mut self, path: &Path, selected: bool) -> TriState {
        log::debug!(
            "Setting {} recursively to {}",
            path.display(),
            if selected { "selected" } else { "unselected" }
        );
        self.set_subtree(path, selected);
        self.cache.invalidate_ancestors(path);
        self.state_of(path)
    }

    fn set_subtree(&mut self, path: &Path, selected: bool) {
        self.store.set(path, selected);
        if !self.fs.is_dir(path) {
            return;
        }
        self.cache.invalidate(path);
        match self.fs.read_dir(path) {
            Ok(children) => {
                for child in children {
                    self.set_subtree(&child.path, selected);
                }
            }
            Err(e) => {
                log::warn!(
                    "Cannot list {} ({}), its children keep their previous selection",
                    path.display(),
                    e
                );
            }
        }
    }

    /// Flips the store entry of `path` alone. On an empty directory this is
    /// its whole selection, so its own cache entry goes too.
    pub fn toggle_leaf(&mut self, path: &Path) -> TriState {
        let selected = !self.store.get(path);
        log::debug!("Toggling {} to {}", path.display(), selected);
        self.store.set(path, selected);
        self.cache.invalidate(path);
        self.cache.invalidate_ancestors(path);
        TriState::from_selected(selected)
    }

    /// Tri-state checkbox click: a fully selected directory is cleared, any
    /// other state becomes fully selected.
    pub fn toggle_directory_icon(&mut self, path: &Path) -> TriState {
        let current = self.resolve(path);
        self.set_recursive(path, !current.is_full())
    }

    /// Replaces the whole selection, e.g. when a project is loaded.
    pub fn replace_selection(&mut self, store: SelectionStore) {
        log::debug!(
            "Replacing selection ({} -> {} entries)",
            self.store.len(),
            store.len()
        );
        self.store = store;
        self.cache.clear_all();
    }

    pub fn load_project(&mut self, project: &Project) {
        log::info!(
            "Loading project '{}' ({} selected paths)",
            project.name,
            project.selected_paths.len()
        );
        self.root = project.root_path.clone();
        self.replace_selection(SelectionStore::from_selected(
            project.selected_paths.iter().cloned(),
        ));
    }

    /// Snapshot of the current selection as a project record.
    pub fn to_project(&self, name: &str) -> Project {
        Project::new(name, self.root.clone(), self.store.selected_paths())
    }

    /// Drops every cached state, for when the tree changed underneath us.
    pub fn recalculate_all(&mut self) {
        self.cache.clear_all();
    }

    pub fn generate(&self) -> GeneratedContext {
        context::generate(&self.store, &self.fs)
    }

    /// Compares every cached entry with a from-scratch recomputation.
    pub fn audit(&self) -> Vec<StaleEntry> {
        let mut stale: Vec<StaleEntry> = self
            .cache
            .entries()
            .filter_map(|(path, cached)| {
                let fresh = DirectoryStateCache::new().resolve(path, &self.store, &self.fs);
                (fresh != cached).then(|| StaleEntry {
                    path: path.to_path_buf(),
                    cached,
                    fresh,
                })
            })
            .collect();
        stale.sort_by(|a, b| a.path.cmp(&b.path));
        stale
    }

    /// Fails on the first stale cache entry; a stale entry is a logic bug in
    /// the mutators, never a recoverable runtime condition.
    pub fn verify(&self) -> Result<()> {
        match self.audit().into_iter().next() {
            Some(entry) => {
                log::error!(
                    "Selection cache desynchronized at {}",
                    entry.path.display()
                );
                Err(AppError::CacheDesync {
                    path: entry.path,
                    cached: entry.cached,
                    fresh: entry.fresh,
                })
            }
            None => Ok(()),
        }
    }
}
