use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        long,
        help = "Specify the project root directory (default: $PROJECT_ROOT or current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,

    #[arg(
        long,
        help = "Specify path/filename of the TOML config file (default: .ctxbuilder/ctxbuilder.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "disable_config_file",
        help_heading = "Project Setup"
    )]
    pub config_file: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config_file",
        help_heading = "Project Setup"
    )]
    pub disable_config_file: bool,

    #[arg(
        short = 'p',
        long = "project",
        help = "Name of the saved project to use (overrides config/dir name).",
        value_name = "NAME",
        help_heading = "Project Setup"
    )]
    pub project_name: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FormatOutputOpts {
    #[arg(short = 'f', long, help = "Set the output format.", value_name = "FORMAT", value_parser = ["text", "json", "yaml", "xml"], help_heading = "Output Formatting")]
    pub format: Option<String>,

    #[arg(
        long,
        help = "Ensure JSON output is compact (minified) [default].",
        conflicts_with = "disable_json_minify",
        help_heading = "Output Formatting"
    )]
    pub enable_json_minify: bool,

    #[arg(
        long,
        help = "Ensure JSON output is pretty-printed (readable).",
        conflicts_with = "enable_json_minify",
        help_heading = "Output Formatting"
    )]
    pub disable_json_minify: bool,

    #[arg(
        long,
        help = "Ensure XML output is pretty-printed (readable).",
        conflicts_with = "disable_xml_pretty",
        help_heading = "Output Formatting"
    )]
    pub enable_xml_pretty: bool,

    #[arg(
        long,
        help = "Ensure XML output is compact [default].",
        conflicts_with = "enable_xml_pretty",
        help_heading = "Output Formatting"
    )]
    pub disable_xml_pretty: bool,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Select project files and build an AI context from them.",
    long_about = "ctxbuilder keeps a named selection of files and directories per project, \nshows the project tree with all/some/none selection markers, and concatenates \nthe selected files into one context with a token estimate.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  ctxbuilder select src --glob '**/*.toml'\n  ctxbuilder tree --depth 2\n  ctxbuilder toggle src/main.rs\n  ctxbuilder generate -s\n  ctxbuilder metrics --exact",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv, -vvv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "t",
        about = "Show the project tree with selection markers."
    )]
    Tree(TreeArgs),

    #[command(
        visible_alias = "add",
        about = "Select files or whole directories (recursively)."
    )]
    Select(SelectArgs),

    #[command(
        visible_alias = "rm",
        about = "Deselect files or whole directories (recursively)."
    )]
    Deselect(SelectArgs),

    #[command(about = "Toggle a file, or click a directory's checkbox.")]
    Toggle(ToggleArgs),

    #[command(about = "Empty the selection of the current project.")]
    Clear(ClearArgs),

    #[command(
        visible_alias = "g",
        visible_alias = "gen",
        about = "Concatenate the selected files into one context."
    )]
    Generate(GenerateArgs),

    #[command(
        visible_alias = "m",
        about = "Show size and token statistics for the selected files."
    )]
    Metrics(MetricsArgs),

    #[command(about = "List, show or remove saved projects.")]
    Projects(ProjectsArgs),

    #[command(
        visible_alias = "d",
        about = "Show effective configuration and check selection cache consistency."
    )]
    Debug(DebugArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,

    #[arg(
        long,
        value_name = "N",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..),
        help = "Expand at most N levels below the root (overrides [tree].max_depth)."
    )]
    pub depth: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct SelectArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,

    #[arg(
        value_name = "PATH",
        help = "Files or directories, relative to the project root.",
        required_unless_present = "glob"
    )]
    pub paths: Vec<PathBuf>,

    #[arg(
        short = 'g',
        long,
        value_name = "PATTERN",
        help = "Also apply to files matching this glob (e.g. 'src/**/*.rs', 'docs/'). Repeatable."
    )]
    pub glob: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ToggleArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,

    #[arg(
        value_name = "PATH",
        required = true,
        help = "Files or directories, relative to the project root."
    )]
    pub paths: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ClearArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,

    #[arg(
        long,
        help = "Force output of the context to standard output.",
        help_heading = "Output Control",
        conflicts_with = "save"
    )]
    pub stdout: bool,

    #[arg(
        short = 's', long, value_name = "SAVE_DIR",
        num_args = 0..=1,
        help_heading = "Output Control",
        help = "Save context. Optional SAVE_DIR overrides [save].output_dir.",
    )]
    pub save: Option<Option<PathBuf>>,
}

#[derive(Args, Debug, Clone)]
pub struct MetricsArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,

    #[arg(
        long,
        help = "Count tokens with the cl100k tokenizer instead of the bytes/4 estimate."
    )]
    pub exact: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ProjectsArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,

    #[command(subcommand)]
    pub action: ProjectsAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProjectsAction {
    #[command(about = "List saved projects.")]
    List,
    #[command(about = "Show one saved project and its selected paths.")]
    Show { name: String },
    #[command(about = "Remove a saved project from the registry.")]
    Remove { name: String },
}

#[derive(Args, Debug, Clone)]
pub struct DebugArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn select_accepts_paths_and_globs() {
        let cli = Cli::try_parse_from([
            "ctxbuilder",
            "select",
            "src",
            "README.md",
            "--glob",
            "**/*.toml",
            "--project",
            "api",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Select(args)) => {
                assert_eq!(
                    args.paths,
                    vec![PathBuf::from("src"), PathBuf::from("README.md")]
                );
                assert_eq!(args.glob, vec!["**/*.toml".to_string()]);
                assert_eq!(args.project_config.project_name.as_deref(), Some("api"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn select_needs_a_path_or_a_glob() {
        assert!(Cli::try_parse_from(["ctxbuilder", "select"]).is_err());
        assert!(Cli::try_parse_from(["ctxbuilder", "deselect", "-g", "*.md"]).is_ok());
    }

    #[test]
    fn generate_save_dir_is_optional() {
        let cli = Cli::try_parse_from(["ctxbuilder", "gen", "-s"]).unwrap();
        let Some(Commands::Generate(args)) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.save, Some(None));

        assert!(Cli::try_parse_from(["ctxbuilder", "gen", "-s", "--stdout"]).is_err());
    }

    #[test]
    fn tree_depth_must_be_positive() {
        assert!(Cli::try_parse_from(["ctxbuilder", "tree", "--depth", "0"]).is_err());
        let cli = Cli::try_parse_from(["ctxbuilder", "-vv", "tree", "--depth", "2"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
