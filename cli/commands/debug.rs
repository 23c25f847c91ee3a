use crate::ProjectWorkspace;
use crate::cli_args::DebugArgs;
use crate::output::print_data_or_text;
use anyhow::{Context, Result};
use colored::*;
use ctxbuilder_core::{CacheStats, Config, FileSystem, Session, TriState};
use log;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct DebugInfo<'a> {
    project_name: &'a str,
    project_root: String,
    registry_file: String,
    saved_project: bool,
    effective_config: &'a Config,
    selected_paths: usize,
    directories_resolved: usize,
    cache_entries: usize,
    cache_hits: u64,
    cache_misses: u64,
    root_state: String,
}

pub fn handle_debug_command(args: DebugArgs) -> Result<()> {
    let mut workspace = ProjectWorkspace::open(&args.project_config, Some(&args.format_output))?;

    log::debug!("Debug: Resolving every directory under the root...");
    let root = workspace.session.root().to_path_buf();
    let directories_resolved = resolve_all(&mut workspace.session, &root);
    let root_state = workspace.session.resolve(&root);

    log::debug!("Debug: Verifying selection cache...");
    workspace
        .session
        .verify()
        .context("Selection cache failed verification")?;

    let stats: CacheStats = workspace.session.cache_stats();
    let debug_data = DebugInfo {
        project_name: &workspace.name,
        project_root: root.display().to_string(),
        registry_file: workspace.registry.path().display().to_string(),
        saved_project: workspace.from_registry,
        effective_config: &workspace.config,
        selected_paths: workspace.session.store().selected_count(),
        directories_resolved,
        cache_entries: workspace.session.cache().len(),
        cache_hits: stats.hits,
        cache_misses: stats.misses,
        root_state: root_state.to_string(),
    };

    let text = pretty_debug_text(&debug_data, root_state)?;
    print_data_or_text(&debug_data, Some(text), &workspace.config, "debug")
}

/// Resolves `dir` and every readable directory below it; returns how many
/// directories were asked for.
fn resolve_all<F: FileSystem>(session: &mut Session<F>, dir: &Path) -> usize {
    session.resolve(dir);
    let subdirs: Vec<PathBuf> = match session.filesystem().read_dir(dir) {
        Ok(entries) => entries
            .into_iter()
            .filter(|e| e.is_dir())
            .map(|e| e.path)
            .collect(),
        Err(e) => {
            log::debug!("Not descending into {}: {}", dir.display(), e);
            Vec::new()
        }
    };
    1 + subdirs
        .iter()
        .map(|sub| resolve_all(session, sub))
        .sum::<usize>()
}

fn pretty_debug_text(info: &DebugInfo, root_state: TriState) -> Result<String> {
    let config_toml = info
        .effective_config
        .to_toml_string()
        .context("Failed to render effective config")?;
    let mut out = String::new();
    out.push_str(&format!("{}\n", " Debug Information ".green().bold().underline()));
    out.push_str(&format!("{:<22} {}\n", "Project:", info.project_name.cyan()));
    out.push_str(&format!("{:<22} {}\n", "Root:", info.project_root.cyan()));
    out.push_str(&format!(
        "{:<22} {} ({})\n",
        "Registry:",
        info.registry_file.cyan(),
        if info.saved_project { "saved" } else { "not saved yet" }
    ));
    out.push_str(&format!(
        "{:<22} {} {}\n",
        "Root state:",
        root_state.marker(),
        info.root_state
    ));
    out.push_str(&format!("{:<22} {}\n", "Selected paths:", info.selected_paths));
    out.push_str(&format!(
        "{:<22} {} resolved, {} cached\n",
        "Directories:", info.directories_resolved, info.cache_entries
    ));
    out.push_str(&format!(
        "{:<22} {} hits / {} misses\n",
        "Cache lookups:", info.cache_hits, info.cache_misses
    ));
    out.push_str(&format!("{:<22} {}\n", "Cache check:", "consistent".green()));
    out.push_str(&format!("\n{}\n", " Effective Config ".green().bold().underline()));
    out.push_str(&config_toml);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxbuilder_core::MemoryFileSystem;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolve_all_visits_every_readable_directory() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/p/a/x.rs", "x")
            .add_file("/p/a/b/y.rs", "y")
            .add_dir("/p/empty")
            .add_file("/p/locked/z.rs", "z")
            .deny("/p/locked");
        let mut session = Session::new("/p", fs);
        session.toggle_leaf(Path::new("/p/a/b/y.rs"));

        // p, a, a/b, empty, locked
        assert_eq!(resolve_all(&mut session, Path::new("/p")), 5);
        assert_eq!(session.cache().len(), 5);
        assert_eq!(session.cache().get(Path::new("/p/a")), Some(TriState::Partial));
        session.verify().unwrap();
    }
}
