use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::identification::domain::gallery_registry::{GalleryRegistry, RegistryError};

#[derive(Error, Debug)]
pub enum RegistryFileError {
    #[error("failed to read gallery registry {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid gallery registry {path}: {source}")]
    Parse {
        path: PathBuf,
        source: RegistryError,
    },
}

pub fn load_registry(path: &Path) -> Result<GalleryRegistry, RegistryFileError> {
    let text = std::fs::read_to_string(path).map_err(|source| RegistryFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let registry = GalleryRegistry::parse(&text).map_err(|source| RegistryFileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "Loaded gallery registry: {} records, {} subjects",
        registry.records().len(),
        registry.gallery_size()
    );
    Ok(registry)
}
