use crate::ProjectWorkspace;
use crate::cli_args::TreeArgs;
use crate::output::{print_data_or_text, render_tree_text};
use anyhow::Result;
use ctxbuilder_core::build_selection_tree;
use log;

pub fn handle_tree_command(args: TreeArgs) -> Result<()> {
    let mut workspace = ProjectWorkspace::open(&args.project_config, Some(&args.format_output))?;

    let mut options = workspace.config.tree_options();
    if args.depth.is_some() {
        options.max_depth = args.depth;
    }
    log::debug!("Tree options: {:?}", options);

    let tree = build_selection_tree(&mut workspace.session, &options);
    let stats = workspace.session.cache_stats();
    log::debug!(
        "Tree built: {} cached directories ({} hits, {} misses)",
        workspace.session.cache().len(),
        stats.hits,
        stats.misses
    );
    if !workspace.from_registry {
        log::info!(
            "Project '{}' has no saved selection yet",
            workspace.name
        );
    }

    print_data_or_text(&tree, Some(render_tree_text(&tree)), &workspace.config, "tree")
}
