use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::eye_color::domain::palette::{EyePalette, PaletteError};

#[derive(Error, Debug)]
pub enum PaletteFileError {
    #[error("failed to read palette {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse palette {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid palette {path}: {source}")]
    Invalid { path: PathBuf, source: PaletteError },
}

/// Loads a JSON palette of the form
/// `{"bands": [{"color": "Blue", "range": {"upper": [..], "lower": [..]}}], "shadow_max": [r, g, b]}`.
pub fn load_palette(path: &Path) -> Result<EyePalette, PaletteFileError> {
    let text = std::fs::read_to_string(path).map_err(|source| PaletteFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let palette: EyePalette =
        serde_json::from_str(&text).map_err(|source| PaletteFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    palette
        .validate()
        .map_err(|source| PaletteFileError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
    log::info!(
        "Loaded eye palette with {} bands from {}",
        palette.bands().len(),
        path.display()
    );
    Ok(palette)
}
