use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alignment::domain::face_aligner::AlignParams;
use crate::detection::domain::region_detector::DetectorParams;
use crate::eye_color::domain::eye_color_classifier::DEFAULT_TIE_TOLERANCE;
use crate::identification::infrastructure::lbph_recognizer::LbphParams;
use crate::shared::constants::{
    APP_DIR_NAME, DEFAULT_RECOGNIZER_INPUT_SIZE, EYE_CASCADE_NAME, FACE_CASCADE_NAME,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for one identification pipeline. Every field has a default,
/// so a config file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub face_detector: DetectorParams,
    pub eye_detector: DetectorParams,
    /// Cascade model file names, resolved through the model directory.
    pub face_cascade: String,
    pub eye_cascade: String,
    pub alignment: AlignParams,
    pub lbph: LbphParams,
    pub recognizer_input_size: u32,
    pub tie_tolerance: usize,
    /// JSON palette replacing the built-in colour bands.
    pub palette: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            face_detector: DetectorParams::face(),
            eye_detector: DetectorParams::eyes(),
            face_cascade: FACE_CASCADE_NAME.to_string(),
            eye_cascade: EYE_CASCADE_NAME.to_string(),
            alignment: AlignParams::default(),
            lbph: LbphParams::default(),
            recognizer_input_size: DEFAULT_RECOGNIZER_INPUT_SIZE,
            tie_tolerance: DEFAULT_TIE_TOLERANCE,
            palette: None,
        }
    }
}

impl PipelineConfig {
    /// `<config dir>/CatFace/config.json`, used when no path is given.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// An explicit path must load. Otherwise the default location is used
    /// when present, falling back to built-in defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path().filter(|p| p.exists()) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.face_detector
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("face_detector: {e}")))?;
        self.eye_detector
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("eye_detector: {e}")))?;
        self.lbph
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("lbph: {e}")))?;
        self.alignment
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("alignment: {e}")))?;
        if self.recognizer_input_size == 0 {
            return Err(ConfigError::Invalid(
                "recognizer_input_size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
