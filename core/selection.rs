#[cfg(feature = "serde_support")]
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Aggregate selection status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub enum TriState {
    NotSelected,
    Partial,
    FullySelected,
}

impl TriState {
    /// State of a leaf, which is never partial.
    pub fn from_selected(selected: bool) -> Self {
        if selected {
            TriState::FullySelected
        } else {
            TriState::NotSelected
        }
    }

    pub fn is_full(self) -> bool {
        self == TriState::FullySelected
    }

    /// Checkbox marker used by text front ends.
    pub fn marker(self) -> &'static str {
        match self {
            TriState::NotSelected => "[ ]",
            TriState::Partial => "[-]",
            TriState::FullySelected => "[x]",
        }
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TriState::NotSelected => "not selected",
            TriState::Partial => "partial",
            TriState::FullySelected => "fully selected",
        };
        f.write_str(label)
    }
}

/// Explicit path -> selected map; the ground truth of what the user picked.
///
/// A missing key means "not selected". Only the session's mutators write to
/// it, so every write is paired with the matching cache invalidation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionStore {
    entries: BTreeMap<PathBuf, bool>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh store with every given path marked selected.
    pub fn from_selected<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            entries: paths.into_iter().map(|p| (p.into(), true)).collect(),
        }
    }

    pub fn get(&self, path: &Path) -> bool {
        self.entries.get(path).copied().unwrap_or(false)
    }

    pub(crate) fn set(&mut self, path: &Path, selected: bool) {
        self.entries.insert(path.to_path_buf(), selected);
    }

    /// Entries in lexicographic path order, including explicit `false`s.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, bool)> {
        self.entries.iter().map(|(p, s)| (p.as_path(), *s))
    }

    pub fn selected_paths(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.entries.values().filter(|s| **s).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
