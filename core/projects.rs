use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_REGISTRY_DIR: &str = "ctxbuilder";
pub const DEFAULT_REGISTRY_FILENAME: &str = "projects.json";

/// A named selection over one root directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub root_path: PathBuf,
    #[serde(default)]
    pub selected_paths: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn new(name: impl Into<String>, root_path: PathBuf, selected_paths: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root_path,
            selected_paths,
            updated_at: None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProjectsFile {
    #[serde(default)]
    projects: Vec<Project>,
}

/// Reads every project record from `path`. A missing file holds no projects.
pub fn load_projects(path: &Path) -> Result<Vec<Project>> {
    if !path.exists() {
        log::debug!("No project registry at {}", path.display());
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let file: ProjectsFile = serde_json::from_str(&content).map_err(|e| {
        AppError::ProjectRegistry(format!(
            "Error parsing project registry '{}': {}",
            path.display(),
            e
        ))
    })?;
    log::debug!(
        "Loaded {} projects from {}",
        file.projects.len(),
        path.display()
    );
    Ok(file.projects)
}

pub fn save_projects(path: &Path, projects: &[Project]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AppError::DirCreation {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let file = ProjectsFile {
        projects: projects.to_vec(),
    };
    let json = serde_json::to_string_pretty(&file)?;
    fs::write(path, json).map_err(|e| AppError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    log::info!("Saved {} projects to {}", projects.len(), path.display());
    Ok(())
}

/// On-disk collection of projects, keyed by name in insertion order.
#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    path: PathBuf,
    projects: IndexMap<String, Project>,
}

impl ProjectRegistry {
    /// `<config_dir>/ctxbuilder/projects.json` for the current user.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(DEFAULT_REGISTRY_DIR)
                .join(DEFAULT_REGISTRY_FILENAME)
        })
    }

    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut projects = IndexMap::new();
        for project in load_projects(&path)? {
            if let Some(previous) = projects.insert(project.name.clone(), project) {
                log::warn!(
                    "Duplicate project '{}' in {}, keeping the later record",
                    previous.name,
                    path.display()
                );
            }
        }
        Ok(Self { path, projects })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Project> {
        self.get(name)
            .ok_or_else(|| AppError::ProjectNotFound(name.to_string()))
    }

    /// Inserts or replaces a project, stamping it with the current time.
    pub fn upsert(&mut self, mut project: Project) {
        project.updated_at = Some(Utc::now());
        log::debug!("Storing project '{}'", project.name);
        self.projects.insert(project.name.clone(), project);
    }

    pub fn remove(&mut self, name: &str) -> Result<Project> {
        self.projects
            .shift_remove(name)
            .ok_or_else(|| AppError::ProjectNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.projects.keys().map(String::as_str).collect()
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn save(&self) -> Result<()> {
        let projects: Vec<Project> = self.projects.values().cloned().collect();
        save_projects(&self.path, &projects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn missing_registry_is_empty() {
        let dir = tempdir().unwrap();
        let registry = ProjectRegistry::load(dir.path().join("projects.json")).unwrap();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.require("nope"),
            Err(AppError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn registry_survives_a_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/projects.json");

        let mut registry = ProjectRegistry::load(&path).unwrap();
        registry.upsert(Project::new(
            "api",
            PathBuf::from("/work/api"),
            vec![PathBuf::from("/work/api/src/main.rs")],
        ));
        registry.upsert(Project::new("web", PathBuf::from("/work/web"), Vec::new()));
        registry.save().unwrap();

        let reloaded = ProjectRegistry::load(&path).unwrap();
        assert_eq!(reloaded.names(), vec!["api", "web"]);
        let api = reloaded.require("api").unwrap();
        assert_eq!(api.selected_paths, vec![PathBuf::from("/work/api/src/main.rs")]);
        assert!(api.updated_at.is_some());
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let dir = tempdir().unwrap();
        let mut registry = ProjectRegistry::load(dir.path().join("p.json")).unwrap();
        for name in ["a", "b", "c"] {
            registry.upsert(Project::new(name, PathBuf::from("/"), Vec::new()));
        }
        assert_eq!(registry.remove("b").unwrap().name, "b");
        assert_eq!(registry.names(), vec!["a", "c"]);
        assert!(registry.remove("b").is_err());
    }

    #[test]
    fn records_use_camel_case_keys() {
        let json = r#"{"projects":[{"name":"x","rootPath":"/x","selectedPaths":["/x/a"]}]}"#;
        let dir = tempdir().unwrap();
        let path = dir.path().join("projects.json");
        fs::write(&path, json).unwrap();

        let projects = load_projects(&path).unwrap();
        assert_eq!(
            projects,
            vec![Project::new("x", PathBuf::from("/x"), vec![PathBuf::from("/x/a")])]
        );
    }

    #[test]
    fn corrupt_registry_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("projects.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_projects(&path),
            Err(AppError::ProjectRegistry(_))
        ));
    }
}
