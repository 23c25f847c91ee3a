use crate::ProjectWorkspace;
use crate::cli_args::{ClearArgs, SelectArgs, ToggleArgs};
use anyhow::{Context, Result};
use colored::*;
use ctxbuilder_core::{FileSystem, SelectionStore, TriState, find_matching_files};
use log;
use std::path::PathBuf;

fn describe(state: TriState) -> ColoredString {
    let label = state.to_string();
    match state {
        TriState::FullySelected => label.green(),
        TriState::Partial => label.yellow(),
        TriState::NotSelected => label.dimmed(),
    }
}

/// Paths named on the command line followed by every glob match, deduplicated.
fn collect_targets(workspace: &ProjectWorkspace, args: &SelectArgs) -> Result<Vec<PathBuf>> {
    let mut targets = Vec::new();
    for input in &args.paths {
        targets.push(workspace.resolve_input_path(input)?);
    }
    if !args.glob.is_empty() {
        let matches = find_matching_files(workspace.session.root(), &args.glob)
            .context("Failed to match glob patterns")?;
        if matches.is_empty() {
            log::warn!("No files matched {:?}", args.glob);
        }
        targets.extend(matches);
    }
    let mut seen = std::collections::HashSet::new();
    targets.retain(|p| seen.insert(p.clone()));
    Ok(targets)
}

pub fn handle_select_command(args: SelectArgs, selected: bool, quiet: bool) -> Result<()> {
    let mut workspace = ProjectWorkspace::open(&args.project_config, None)?;
    let targets = collect_targets(&workspace, &args)?;

    for target in &targets {
        let state = workspace.session.set_recursive(target, selected);
        if !quiet {
            println!(
                "{} {}",
                describe(state),
                workspace.display_path(target).cyan()
            );
        }
    }
    workspace.save()?;

    if !quiet {
        let root = workspace.session.root().to_path_buf();
        let root_state = workspace.session.resolve(&root);
        eprintln!(
            "{} project '{}' is now {} ({} selected paths)",
            "✅".green(),
            workspace.name,
            describe(root_state),
            workspace.session.store().selected_count()
        );
    }
    Ok(())
}

pub fn handle_toggle_command(args: ToggleArgs, quiet: bool) -> Result<()> {
    let mut workspace = ProjectWorkspace::open(&args.project_config, None)?;

    for input in &args.paths {
        let target = workspace.resolve_input_path(input)?;
        let state = if workspace.session.filesystem().is_dir(&target) {
            workspace.session.toggle_directory_icon(&target)
        } else {
            workspace.session.toggle_leaf(&target)
        };
        if !quiet {
            println!(
                "{} {}",
                describe(state),
                workspace.display_path(&target).cyan()
            );
        }
    }
    workspace.save()
}

pub fn handle_clear_command(args: ClearArgs, quiet: bool) -> Result<()> {
    let mut workspace = ProjectWorkspace::open(&args.project_config, None)?;
    let previous = workspace.session.store().selected_count();
    workspace.session.replace_selection(SelectionStore::new());
    workspace.save()?;
    if !quiet {
        eprintln!(
            "{} Cleared {} selected paths from project '{}'",
            "✅".green(),
            previous,
            workspace.name
        );
    }
    Ok(())
}
