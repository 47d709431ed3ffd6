use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model {name} not found (searched: {searched:?})")]
    NotFound { name: String, searched: Vec<PathBuf> },
}

/// Resolve a model file by name.
///
/// Resolution order:
/// 1. Explicit model directory (`--model-dir`)
/// 2. Per-user data directory (platform-specific)
pub fn resolve(name: &str, model_dir: Option<&Path>) -> Result<PathBuf, ModelResolveError> {
    let candidates: Vec<PathBuf> = model_dir
        .map(Path::to_path_buf)
        .into_iter()
        .chain(model_data_dir())
        .map(|dir| dir.join(name))
        .collect();

    if let Some(found) = candidates.iter().find(|p| p.exists()) {
        log::debug!("Resolved model {name} at {}", found.display());
        return Ok(found.clone());
    }

    Err(ModelResolveError::NotFound {
        name: name.to_string(),
        searched: candidates,
    })
}

/// Platform-specific model directory.
///
/// - macOS: `~/Library/Application Support/CatFace/models/`
/// - Linux: `$XDG_DATA_HOME/CatFace/models/` or `~/.local/share/CatFace/models/`
/// - Windows: `%APPDATA%/CatFace/models/`
pub fn model_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_DIR_NAME).join("models"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_explicit_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cascade.json");
        std::fs::write(&path, "{}").unwrap();

        let resolved = resolve("cascade.json", Some(dir.path())).unwrap();
        assert_eq!(resolved, path);
    }

    #[test]
    fn test_resolve_missing_reports_searched_paths() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve("no_such_model_4f1c.json", Some(dir.path())).unwrap_err();
        let ModelResolveError::NotFound { name, searched } = err;
        assert_eq!(name, "no_such_model_4f1c.json");
        assert_eq!(searched[0], dir.path().join("no_such_model_4f1c.json"));
    }

    #[test]
    fn test_model_data_dir_ends_with_app_models() {
        if let Some(dir) = model_data_dir() {
            assert!(dir.ends_with(Path::new(APP_DIR_NAME).join("models")));
        }
    }
}
