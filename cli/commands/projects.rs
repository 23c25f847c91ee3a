use crate::cli_args::{ProjectsAction, ProjectsArgs};
use crate::load_config_for_command;
use crate::output::print_data_or_text;
use anyhow::{Context, Result};
use colored::*;
use ctxbuilder_core::{Config, Project, ProjectRegistry};
use log;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ProjectSummary<'a> {
    name: &'a str,
    root_path: String,
    selected_paths: usize,
    updated_at: Option<String>,
}

impl<'a> From<&'a Project> for ProjectSummary<'a> {
    fn from(project: &'a Project) -> Self {
        Self {
            name: &project.name,
            root_path: project.root_path.display().to_string(),
            selected_paths: project.selected_paths.len(),
            updated_at: project.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

pub fn handle_projects_command(args: ProjectsArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;
    let config = load_config_for_command(
        &project_root,
        &args.project_config,
        Some(&args.format_output),
    )?;
    let registry_path = config.get_effective_projects_file()?;
    let mut registry = ProjectRegistry::load(&registry_path).with_context(|| {
        format!(
            "Failed to load project registry from {}",
            registry_path.display()
        )
    })?;
    log::debug!("Using project registry at {}", registry.path().display());

    match args.action {
        ProjectsAction::List => {
            let summaries: Vec<ProjectSummary> = registry.projects().map(Into::into).collect();
            print_data_or_text(&summaries, Some(list_text(&summaries)), &config, "projects")
        }
        ProjectsAction::Show { name } => {
            let project = registry.require(&name)?;
            print_data_or_text(project, Some(show_text(project)), &config, "project")
        }
        ProjectsAction::Remove { name } => {
            let removed = registry.remove(&name)?;
            registry.save()?;
            if !quiet {
                eprintln!(
                    "{} Removed project '{}' ({} selected paths)",
                    "✅".green(),
                    removed.name,
                    removed.selected_paths.len()
                );
            }
            Ok(())
        }
    }
}

fn list_text(summaries: &[ProjectSummary]) -> String {
    if summaries.is_empty() {
        return "(No saved projects)".yellow().to_string();
    }
    summaries
        .iter()
        .map(|s| {
            format!(
                "{:<24} {:>5} selected  {}",
                s.name.cyan(),
                s.selected_paths,
                s.root_path.dimmed()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn show_text(project: &Project) -> String {
    let mut out = format!(
        "{} {}\n{} {}\n",
        "Project:".green(),
        project.name.cyan().bold(),
        "Root:".green(),
        project.root_path.display()
    );
    if let Some(updated) = project.updated_at {
        out.push_str(&format!("{} {}\n", "Updated:".green(), updated.to_rfc3339()));
    }
    out.push_str(&format!("{}\n", "Selected paths:".green()));
    for path in &project.selected_paths {
        let shown = pathdiff::diff_paths(path, &project.root_path).unwrap_or_else(|| path.clone());
        out.push_str(&format!("  {}\n", shown.display()));
    }
    out
}
