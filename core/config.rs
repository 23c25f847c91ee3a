use crate::error::{AppError, Result};
use crate::projects::ProjectRegistry;
use crate::tree::TreeOptions;
use log;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_DIR: &str = ".ctxbuilder";
pub const DEFAULT_CONFIG_FILENAME: &str = "ctxbuilder.toml";
pub const DEFAULT_OUTPUT_DIR: &str = ".ctxbuilder/out";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub save: SaveConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub projects_file: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TreeConfig {
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default = "default_true")]
    pub dirs_first: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub json_minify: bool,
    #[serde(default = "default_false")]
    pub xml_pretty_print: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SaveConfig {
    #[serde(default = "default_save_dir_config")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub filename_base: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tokenizer {
    #[default]
    Estimate,
    Cl100k,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default)]
    pub tokenizer: Tokenizer,
}

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_format() -> String {
    "text".to_string()
}
fn default_save_dir_config() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            dirs_first: default_true(),
        }
    }
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            json_minify: default_true(),
            xml_pretty_print: default_false(),
        }
    }
}
impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            output_dir: default_save_dir_config(),
            filename_base: None,
            extension: None,
        }
    }
}

impl Config {
    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_project_root
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var("PROJECT_ROOT").ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        path_to_resolve.canonicalize().map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to canonicalize project root '{}': {}",
                    path_to_resolve.display(),
                    e
                ),
            ))
        })
    }

    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        let path_to_check = match cli_config_file {
            Some(p_str) => {
                let expanded_path_cow = shellexpand::tilde(p_str);
                let mut path = PathBuf::from(expanded_path_cow.as_ref());
                let looks_like_path = path.is_absolute()
                    || path.components().count() > 1
                    || p_str.contains(['/', '\\']);

                if looks_like_path {
                    if !path.exists() && path.extension().is_none() {
                        path.set_extension("toml");
                    }
                    if !path.exists() {
                        return Err(AppError::Config(format!(
                            "Specified config file not found at path: {}",
                            path.display()
                        )));
                    }
                    log::debug!("Using specified config file path: {}", path.display());
                    Some(path)
                } else {
                    let filename = if path.extension().is_none_or(|e| e != "toml") {
                        format!("{}.toml", path.to_string_lossy())
                    } else {
                        path.to_string_lossy().to_string()
                    };
                    let full_path = project_root.join(DEFAULT_CONFIG_DIR).join(filename);
                    if !full_path.exists() {
                        return Err(AppError::Config(format!(
                            "Specified config file '{}' not found in default directory: {}",
                            path.display(),
                            project_root.join(DEFAULT_CONFIG_DIR).display()
                        )));
                    }
                    log::debug!(
                        "Using specified config filename in default directory: {}",
                        full_path.display()
                    );
                    Some(full_path)
                }
            }
            None => {
                let default_path = project_root
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_CONFIG_FILENAME);
                if default_path.exists() {
                    log::debug!("Using default config file path: {}", default_path.display());
                    Some(default_path)
                } else {
                    log::debug!(
                        "No config file specified and default not found at: {}",
                        default_path.display()
                    );
                    None
                }
            }
        };
        Ok(path_to_check)
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&toml_content).map_err(|e| match e {
            AppError::TomlParse(msg) => AppError::TomlParse(format!(
                "Error parsing config file '{}': {}. Check TOML syntax and structure.",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_toml_str(toml_content: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_content)
            .map_err(|e| AppError::TomlParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        match self.output.format.to_lowercase().as_str() {
            "text" | "json" | "yaml" | "yml" | "xml" => {}
            other => {
                return Err(AppError::Config(format!(
                    "Unsupported output format '{}'. Use text, json, yaml or xml.",
                    other
                )));
            }
        }
        if self.tree.max_depth == Some(0) {
            return Err(AppError::Config(
                "[tree].max_depth must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get_effective_project_name(&self, project_root: &Path) -> String {
        self.general.project_name.clone().unwrap_or_else(|| {
            project_root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "UnknownProject".to_string())
        })
    }

    /// Registry file from config (with `~` expanded) or the per-user default.
    pub fn get_effective_projects_file(&self) -> Result<PathBuf> {
        match &self.general.projects_file {
            Some(path) => Ok(PathBuf::from(
                shellexpand::tilde(&path.to_string_lossy()).as_ref(),
            )),
            None => ProjectRegistry::default_path().ok_or_else(|| {
                AppError::Config(
                    "Could not determine a config directory for the project registry; set [general].projects_file".to_string(),
                )
            }),
        }
    }

    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            max_depth: self.tree.max_depth,
            dirs_first: self.tree.dirs_first,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.output.format, "text");
        assert!(config.tree.dirs_first);
        assert_eq!(config.metrics.tokenizer, Tokenizer::Estimate);
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::from_toml_str(
            r#"
            [general]
            project_name = "api"
            projects_file = "/tmp/registry.json"

            [tree]
            max_depth = 2
            dirs_first = false

            [output]
            format = "yaml"

            [metrics]
            tokenizer = "cl100k"
            "#,
        )
        .unwrap();
        assert_eq!(config.general.project_name.as_deref(), Some("api"));
        assert_eq!(
            config.get_effective_projects_file().unwrap(),
            PathBuf::from("/tmp/registry.json")
        );
        assert_eq!(
            config.tree_options(),
            TreeOptions {
                max_depth: Some(2),
                dirs_first: false
            }
        );
        assert_eq!(config.metrics.tokenizer, Tokenizer::Cl100k);
    }

    #[test]
    fn unknown_keys_and_bad_values_are_rejected() {
        assert!(matches!(
            Config::from_toml_str("[general]\nbogus = 1"),
            Err(AppError::TomlParse(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[output]\nformat = \"csv\""),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[tree]\nmax_depth = 0"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn default_config_file_is_found_under_project_root() {
        let dir = tempdir().unwrap();
        assert_eq!(Config::resolve_config_path(dir.path(), None, false).unwrap(), None);

        let config_dir = dir.path().join(DEFAULT_CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join(DEFAULT_CONFIG_FILENAME), "").unwrap();
        fs::write(config_dir.join("alt.toml"), "[output]\nformat = \"json\"").unwrap();

        assert_eq!(
            Config::resolve_config_path(dir.path(), None, false).unwrap(),
            Some(config_dir.join(DEFAULT_CONFIG_FILENAME))
        );
        let alt = Config::resolve_config_path(dir.path(), Some(&"alt".to_string()), false)
            .unwrap()
            .unwrap();
        assert_eq!(Config::load_from_path(&alt).unwrap().output.format, "json");
        assert_eq!(Config::resolve_config_path(dir.path(), None, true).unwrap(), None);
    }

    #[test]
    fn project_name_falls_back_to_directory_name() {
        let config = Config::default();
        assert_eq!(
            config.get_effective_project_name(Path::new("/work/my-app")),
            "my-app"
        );
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let rendered = Config::default().to_toml_string().unwrap();
        assert_eq!(Config::from_toml_str(&rendered).unwrap(), Config::default());
    }
}
