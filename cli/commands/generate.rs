use crate::ProjectWorkspace;
use crate::cli_args::GenerateArgs;
use crate::output::{self, render_data_or_text};
use anyhow::Result;
use colored::Colorize;
use ctxbuilder_core::{Config, OutputFormat};
use log;
use std::path::{Path, PathBuf};

pub fn handle_generate_command(args: GenerateArgs, quiet: bool) -> Result<()> {
    let workspace = ProjectWorkspace::open(&args.project_config, Some(&args.format_output))?;
    let config = &workspace.config;
    if !workspace.from_registry {
        log::warn!(
            "Project '{}' has no saved selection; the context will be empty",
            workspace.name
        );
    }

    let context = workspace.session.generate();
    let content = render_data_or_text(&context, Some(context.text.clone()), config, "context")?;

    match args.save.as_ref() {
        Some(cli_save_dir) if !args.stdout => {
            let path = get_save_path(
                config,
                cli_save_dir.as_deref(),
                workspace.session.root(),
                &workspace.name,
            )?;
            output::write_to_file(&path, &content)?;
            if !quiet {
                eprintln!(
                    "{} Context saved to: {}",
                    "✅".green(),
                    path.display().to_string().blue()
                );
            }
        }
        _ => output::write_to_stdout(&content)?,
    }

    if !quiet {
        eprintln!("{}", context.summary().dimmed());
    }
    Ok(())
}

/// `<save dir>/<filename base>.<extension>`, with the directory taken from
/// the CLI, then `[save].output_dir`, relative paths anchored at the root.
fn get_save_path(
    config: &Config,
    cli_save_dir: Option<&Path>,
    project_root: &Path,
    project_name: &str,
) -> Result<PathBuf> {
    let save_dir_base = match cli_save_dir {
        Some(dir) => {
            log::debug!("Using save directory from CLI: {}", dir.display());
            dir.to_path_buf()
        }
        None => {
            log::debug!(
                "Save flag used without path, using configured/default save directory: {}",
                config.save.output_dir.display()
            );
            config.save.output_dir.clone()
        }
    };
    let save_dir = if save_dir_base.is_absolute() {
        save_dir_base
    } else {
        project_root.join(save_dir_base)
    };

    let filename_base = config
        .save
        .filename_base
        .clone()
        .unwrap_or_else(|| format!("{}_context", project_name));
    let extension = match &config.save.extension {
        Some(ext) => ext.trim_start_matches('.').to_string(),
        None => OutputFormat::parse(&config.output.format)?
            .extension()
            .to_string(),
    };
    log::trace!(
        "Save target: dir={}, base={}, ext={}",
        save_dir.display(),
        filename_base,
        extension
    );
    Ok(save_dir.join(format!("{}.{}", filename_base, extension)))
}
