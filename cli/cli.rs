mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::path::{Path, PathBuf};
use std::process;

use cli_args::{Cli, Commands, FormatOutputOpts, ProjectConfigOpts};
use ctxbuilder_core::{AppError, Config, Project, ProjectRegistry, Session};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);

            // Config errors and cache desyncs are always reported, even with -q.
            if !quiet || exit_code == 1 || exit_code == 9 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AppError>() {
        Some(AppError::Config(_)) => 1,
        Some(AppError::TomlParse(_)) => 1,
        Some(AppError::TomlSerialize(_)) => 1,
        Some(AppError::InvalidArgument(_)) => 1,
        Some(AppError::Io(_)) => 2,
        Some(AppError::FileRead { .. }) => 2,
        Some(AppError::FileWrite { .. }) => 2,
        Some(AppError::DirCreation { .. }) => 2,
        Some(AppError::WalkDir(_)) => 2,
        Some(AppError::Glob(_)) => 2,
        Some(AppError::ProjectNotFound(_)) => 2,
        Some(AppError::ProjectRegistry(_)) => 2,
        Some(AppError::JsonSerialize(_)) => 6,
        Some(AppError::YamlError(_)) => 6,
        Some(AppError::XmlSerialize(_)) => 6,
        Some(AppError::TikToken(_)) => 8,
        Some(AppError::CacheDesync { .. }) => 9,
        Some(_) => 1,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Tree(args) => {
                log::debug!("Executing 'tree' command...");
                commands::tree::handle_tree_command(args)?;
            }
            Commands::Select(args) => {
                log::debug!("Executing 'select' command...");
                commands::select::handle_select_command(args, true, quiet)?;
            }
            Commands::Deselect(args) => {
                log::debug!("Executing 'deselect' command...");
                commands::select::handle_select_command(args, false, quiet)?;
            }
            Commands::Toggle(args) => {
                log::debug!("Executing 'toggle' command...");
                commands::select::handle_toggle_command(args, quiet)?;
            }
            Commands::Clear(args) => {
                log::debug!("Executing 'clear' command...");
                commands::select::handle_clear_command(args, quiet)?;
            }
            Commands::Generate(args) => {
                log::debug!("Executing 'generate' command...");
                commands::generate::handle_generate_command(args, quiet)?;
            }
            Commands::Metrics(args) => {
                log::debug!("Executing 'metrics' command...");
                commands::metrics::handle_metrics_command(args, quiet)?;
            }
            Commands::Projects(args) => {
                log::debug!("Executing 'projects' command...");
                commands::projects::handle_projects_command(args, quiet)?;
            }
            Commands::Debug(args) => {
                log::debug!("Executing 'debug' command...");
                commands::debug::handle_debug_command(args)?;
            }
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args, quiet)?;
            }
        },
    }
    Ok(())
}

/// Loads the config for `project_root`, applying the CLI's project name and
/// output format overrides.
pub fn load_config_for_command(
    project_root: &Path,
    project_opts: &ProjectConfigOpts,
    format_override: Option<&FormatOutputOpts>,
) -> Result<Config> {
    let config_path = Config::resolve_config_path(
        project_root,
        project_opts.config_file.as_ref(),
        project_opts.disable_config_file,
    )
    .context("Failed to resolve configuration path")?;

    let mut config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(name) = &project_opts.project_name {
        config.general.project_name = Some(name.clone());
    }
    if let Some(fmt_opts) = format_override {
        apply_format_overrides(&mut config, fmt_opts);
    }

    config.general.project_name = Some(config.get_effective_project_name(project_root));
    log::trace!("Effective config: {:?}", config);
    Ok(config)
}

fn apply_format_overrides(config: &mut Config, fmt_opts: &FormatOutputOpts) {
    if let Some(format) = &fmt_opts.format {
        config.output.format = format.clone();
    }
    if fmt_opts.disable_json_minify {
        config.output.json_minify = false;
    } else if fmt_opts.enable_json_minify {
        config.output.json_minify = true;
    }
    if fmt_opts.enable_xml_pretty {
        config.output.xml_pretty_print = true;
    } else if fmt_opts.disable_xml_pretty {
        config.output.xml_pretty_print = false;
    }
}

/// A registry record found under the default, directory-derived name may
/// belong to another directory with the same basename. Only an explicit
/// `--project` may bind the session to a root other than the current one.
fn check_registered_root(
    project: &Project,
    project_root: &Path,
    explicit_name: bool,
) -> Result<(), AppError> {
    if project.root_path == project_root {
        return Ok(());
    }
    if !explicit_name {
        return Err(AppError::InvalidArgument(format!(
            "Project '{}' is registered at {}, not {}. Pass --project <NAME> to choose a project explicitly",
            project.name,
            project.root_path.display(),
            project_root.display()
        )));
    }
    log::warn!(
        "Project '{}' is rooted at {}, not {}; using its registered root",
        project.name,
        project.root_path.display(),
        project_root.display()
    );
    Ok(())
}

/// A session over the current project, plus what is needed to save it back.
pub struct ProjectWorkspace {
    pub config: Config,
    pub name: String,
    pub registry: ProjectRegistry,
    pub session: Session,
    pub from_registry: bool,
}

impl ProjectWorkspace {
    /// Resolves the project root and config, then loads the named project
    /// from the registry. An unknown project starts with an empty selection.
    pub fn open(
        project_opts: &ProjectConfigOpts,
        format_override: Option<&FormatOutputOpts>,
    ) -> Result<Self> {
        let project_root = Config::determine_project_root(project_opts.project_root.as_ref())
            .context("Failed to determine project root")?;
        log::info!("Project root determined: {}", project_root.display());

        let config = load_config_for_command(&project_root, project_opts, format_override)
            .context("Failed to load configuration")?;
        let name = config.get_effective_project_name(&project_root);

        let registry_path = config.get_effective_projects_file()?;
        let registry = ProjectRegistry::load(&registry_path).with_context(|| {
            format!(
                "Failed to load project registry from {}",
                registry_path.display()
            )
        })?;

        let mut session = Session::on_disk(&project_root);
        let from_registry = match registry.get(&name) {
            Some(project) => {
                check_registered_root(
                    project,
                    &project_root,
                    project_opts.project_name.is_some(),
                )?;
                session.load_project(project);
                true
            }
            None => {
                log::info!("Project '{}' not in registry, starting empty", name);
                false
            }
        };

        Ok(Self {
            config,
            name,
            registry,
            session,
            from_registry,
        })
    }

    /// Turns a command-line path into the absolute path the session tracks.
    pub fn resolve_input_path(&self, input: &Path) -> Result<PathBuf> {
        let root = self.session.root();
        let joined = if input.is_absolute() {
            input.to_path_buf()
        } else {
            root.join(input)
        };
        let canonical = joined.canonicalize().map_err(|e| {
            AppError::InvalidArgument(format!("Cannot resolve '{}': {}", input.display(), e))
        })?;
        if !canonical.starts_with(root) {
            log::warn!(
                "{} lies outside the project root {}",
                canonical.display(),
                root.display()
            );
        }
        Ok(canonical)
    }

    pub fn display_path(&self, path: &Path) -> String {
        pathdiff::diff_paths(path, self.session.root())
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| path.to_path_buf())
            .display()
            .to_string()
    }

    /// Writes the current selection back to the registry.
    pub fn save(&mut self) -> Result<()> {
        self.registry.upsert(self.session.to_project(&self.name));
        self.registry.save().with_context(|| {
            format!(
                "Failed to save project registry to {}",
                self.registry.path().display()
            )
        })?;
        self.from_registry = true;
        Ok(())
    }
}
