use crate::error::{AppError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Regular files under `root` whose root-relative path matches any pattern.
///
/// A pattern ending in `/` matches everything below that directory. Symlinks
/// are not followed. Results are sorted by path.
pub fn find_matching_files(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    if patterns.is_empty() {
        return Ok(Vec::new());
    }
    let glob_set = build_glob_set_from_vec(patterns)?;

    log::debug!(
        "Searching {} for files matching {:?}",
        root.display(),
        patterns
    );
    let mut matches = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name();
    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!(
                    "Error accessing path while matching patterns: {} (at {})",
                    e,
                    e.path()
                        .map_or_else(|| "unknown path".into(), |p| p.display().to_string())
                );
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(relative_path) = pathdiff::diff_paths(entry.path(), root) else {
            log::warn!("Could not get relative path for: {}", entry.path().display());
            continue;
        };
        if glob_set.is_match(&relative_path) {
            log::trace!("Pattern match: {}", relative_path.display());
            matches.push(entry.into_path());
        }
    }
    matches.sort();
    log::info!("{} files matched the given patterns", matches.len());
    Ok(matches)
}

fn build_glob_set_from_vec(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern_str in patterns {
        let mut processed_pattern = pattern_str.trim().to_string();
        if processed_pattern.ends_with('/') && processed_pattern.len() > 1 {
            processed_pattern.push_str("**");
        }
        match Glob::new(&processed_pattern) {
            Ok(glob) => {
                log::trace!(
                    "Adding glob pattern: {} (processed as {})",
                    pattern_str,
                    processed_pattern
                );
                builder.add(glob);
            }
            Err(e) => {
                log::error!("Invalid glob pattern \"{}\": {}", pattern_str, e);
                return Err(AppError::Glob(format!(
                    "Invalid glob pattern \"{}\" (processed as \"{}\"): {}",
                    pattern_str, processed_pattern, e
                )));
            }
        }
    }
    builder.build().map_err(|e| {
        log::error!("Error building glob set: {}", e);
        AppError::Glob(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn layout() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        fs::write(dir.path().join("src/nested/deep.rs"), "").unwrap();
        fs::write(dir.path().join("src/notes.md"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();
        dir
    }

    #[test]
    fn extension_glob_matches_at_any_depth() {
        let dir = layout();
        let found = find_matching_files(dir.path(), &["**/*.rs".to_string()]).unwrap();
        assert_eq!(
            found,
            vec![
                dir.path().join("src/lib.rs"),
                dir.path().join("src/nested/deep.rs"),
            ]
        );
    }

    #[test]
    fn trailing_slash_matches_whole_directory() {
        let dir = layout();
        let found = find_matching_files(dir.path(), &["src/nested/".to_string()]).unwrap();
        assert_eq!(found, vec![dir.path().join("src/nested/deep.rs")]);
    }

    #[test]
    fn invalid_pattern_is_a_glob_error() {
        let dir = layout();
        let err = find_matching_files(dir.path(), &["src/[".to_string()]).unwrap_err();
        assert!(matches!(err, AppError::Glob(_)));
    }

    #[test]
    fn no_patterns_matches_nothing() {
        let dir = layout();
        assert!(find_matching_files(dir.path(), &[]).unwrap().is_empty());
    }
}
