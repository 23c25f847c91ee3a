use crate::filesystem::{DirEntry, EntryKind, FileSystem};
use crate::selection::TriState;
use crate::session::Session;
use log;
#[cfg(feature = "serde_support")]
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct TreeNode {
    pub name: String,
    pub path: PathBuf,
    #[cfg_attr(feature = "serde_support", serde(rename = "type"))]
    pub kind: EntryKind,
    pub state: TriState,
    #[cfg_attr(
        feature = "serde_support",
        serde(skip_serializing_if = "std::ops::Not::not")
    )]
    pub unreadable: bool,
    /// `None` for files and for directories below the depth limit.
    #[cfg_attr(
        feature = "serde_support",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub children: Option<Vec<TreeNode>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeOptions {
    /// Levels below the root to expand; `None` expands everything.
    pub max_depth: Option<usize>,
    /// List directories before files, each group sorted by name.
    pub dirs_first: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            dirs_first: true,
        }
    }
}

/// Snapshot of the session's tree as a UI would draw it.
///
/// Every expanded directory's state is asked of the session's cache, exactly
/// as a redraw would; files report their store entry.
pub fn build_selection_tree<F: FileSystem>(
    session: &mut Session<F>,
    options: &TreeOptions,
) -> TreeNode {
    let root = session.root().to_path_buf();
    log::debug!("Building selection tree for {}", root.display());
    build_dir_node(session, &root, display_name(&root), 0, options)
}

fn build_dir_node<F: FileSystem>(
    session: &mut Session<F>,
    path: &Path,
    name: String,
    depth: usize,
    options: &TreeOptions,
) -> TreeNode {
    let state = session.resolve(path);
    let mut node = TreeNode {
        name,
        path: path.to_path_buf(),
        kind: EntryKind::Directory,
        state,
        unreadable: false,
        children: None,
    };
    if options.max_depth.is_some_and(|max| depth >= max) {
        return node;
    }

    let mut entries = match session.filesystem().read_dir(path) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot list {} for display: {}", path.display(), e);
            node.unreadable = true;
            node.children = Some(Vec::new());
            return node;
        }
    };
    if options.dirs_first {
        entries.sort_by(|a, b| {
            b.is_dir()
                .cmp(&a.is_dir())
                .then_with(|| a.file_name().cmp(&b.file_name()))
        });
    }

    let children = entries
        .iter()
        .map(|entry| build_child(session, entry, depth + 1, options))
        .collect();
    node.children = Some(children);
    node
}

fn build_child<F: FileSystem>(
    session: &mut Session<F>,
    entry: &DirEntry,
    depth: usize,
    options: &TreeOptions,
) -> TreeNode {
    if entry.is_dir() {
        build_dir_node(session, &entry.path, entry.file_name(), depth, options)
    } else {
        TreeNode {
            name: entry.file_name(),
            path: entry.path.clone(),
            kind: EntryKind::File,
            state: TriState::from_selected(session.store().get(&entry.path)),
            unreadable: false,
            children: None,
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::MemoryFileSystem;
    use pretty_assertions::assert_eq;

    fn summarize(node: &TreeNode, depth: usize, out: &mut Vec<String>) {
        out.push(format!(
            "{}{} {}",
            "  ".repeat(depth),
            node.state.marker(),
            node.name
        ));
        for child in node.children.iter().flatten() {
            summarize(child, depth + 1, out);
        }
    }

    fn session() -> Session<MemoryFileSystem> {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/b.txt", "b")
            .add_file("/proj/a.txt", "a")
            .add_file("/proj/zdir/x.rs", "x")
            .add_file("/proj/zdir/y.rs", "y");
        Session::new("/proj", fs)
    }

    #[test]
    fn directories_are_listed_first_with_states() {
        let mut session = session();
        session.toggle_leaf(Path::new("/proj/zdir/x.rs"));
        session.toggle_leaf(Path::new("/proj/a.txt"));

        let tree = build_selection_tree(&mut session, &TreeOptions::default());
        let mut lines = Vec::new();
        summarize(&tree, 0, &mut lines);
        assert_eq!(
            lines,
            vec![
                "[-] proj",
                "  [-] zdir",
                "    [x] x.rs",
                "    [ ] y.rs",
                "  [x] a.txt",
                "  [ ] b.txt",
            ]
        );
    }

    #[test]
    fn depth_limit_collapses_but_still_resolves() {
        let mut session = session();
        session.set_recursive(Path::new("/proj/zdir"), true);

        let options = TreeOptions {
            max_depth: Some(1),
            dirs_first: false,
        };
        let tree = build_selection_tree(&mut session, &options);
        let children = tree.children.as_ref().unwrap();
        let names: Vec<&str> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "zdir"]);

        let zdir = &children[2];
        assert_eq!(zdir.state, TriState::FullySelected);
        assert_eq!(zdir.children, None);
    }

    #[test]
    fn unreadable_directory_is_flagged() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/locked/x", "x").deny("/proj/locked");
        let mut session = Session::new("/proj", fs);

        let tree = build_selection_tree(&mut session, &TreeOptions::default());
        let locked = &tree.children.as_ref().unwrap()[0];
        assert!(locked.unreadable);
        assert_eq!(locked.state, TriState::NotSelected);
        assert_eq!(locked.children, Some(Vec::new()));
    }
}
