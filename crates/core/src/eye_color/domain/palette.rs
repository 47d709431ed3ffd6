use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named eye colour classes.
///
/// `Different` is not a palette band: it marks a pair of eyes whose
/// candidate colours have nothing in common.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EyeColor {
    Blue,
    Green,
    Yellow,
    Brown,
    Gray,
    Different,
}

impl EyeColor {
    pub fn name(&self) -> &'static str {
        match self {
            EyeColor::Blue => "Blue",
            EyeColor::Green => "Green",
            EyeColor::Yellow => "Yellow",
            EyeColor::Brown => "Brown",
            EyeColor::Gray => "Gray",
            EyeColor::Different => "Different",
        }
    }
}

impl fmt::Display for EyeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown eye colour: {0:?}")]
pub struct UnknownEyeColor(pub String);

impl FromStr for EyeColor {
    type Err = UnknownEyeColor;

    /// Case-insensitive; accepts the British spelling of gray.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" => Ok(EyeColor::Blue),
            "green" => Ok(EyeColor::Green),
            "yellow" => Ok(EyeColor::Yellow),
            "brown" => Ok(EyeColor::Brown),
            "gray" | "grey" => Ok(EyeColor::Gray),
            "different" => Ok(EyeColor::Different),
            _ => Err(UnknownEyeColor(s.to_string())),
        }
    }
}

/// Inclusive per-channel RGB range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandRange {
    pub upper: [u8; 3],
    pub lower: [u8; 3],
}

impl BandRange {
    pub const fn new(upper: [u8; 3], lower: [u8; 3]) -> Self {
        Self { upper, lower }
    }

    pub fn contains(&self, rgb: [u8; 3]) -> bool {
        (0..3).all(|c| self.lower[c] <= rgb[c] && rgb[c] <= self.upper[c])
    }

    /// A channel whose lower bound exceeds its upper bound matches nothing.
    pub fn is_satisfiable(&self) -> bool {
        (0..3).all(|c| self.lower[c] <= self.upper[c])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorBand {
    pub color: EyeColor,
    pub range: BandRange,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaletteError {
    #[error("palette has no colour bands")]
    Empty,
    #[error("\"Different\" cannot be a palette band")]
    ReservedColor,
    #[error("colour {0} appears more than once in the palette")]
    Duplicate(EyeColor),
}

/// Fixed table of colour bands plus the shadow exclusion rule.
///
/// Loaded once and shared read-only by every classification. Band order
/// matters: it is the order counts are reported in and ties are broken by.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyePalette {
    bands: Vec<ColorBand>,
    shadow_max: [u8; 3],
}

pub const DEFAULT_SHADOW_MAX: [u8; 3] = [30, 50, 114];

impl EyePalette {
    pub fn new(bands: Vec<ColorBand>, shadow_max: [u8; 3]) -> Result<Self, PaletteError> {
        let palette = Self { bands, shadow_max };
        palette.validate()?;
        Ok(palette)
    }

    pub fn validate(&self) -> Result<(), PaletteError> {
        if self.bands.is_empty() {
            return Err(PaletteError::Empty);
        }
        for (i, band) in self.bands.iter().enumerate() {
            if band.color == EyeColor::Different {
                return Err(PaletteError::ReservedColor);
            }
            if self.bands[..i].iter().any(|b| b.color == band.color) {
                return Err(PaletteError::Duplicate(band.color));
            }
            if !band.range.is_satisfiable() {
                log::warn!("Palette band {} can never match: {:?}", band.color, band.range);
            }
        }
        Ok(())
    }

    pub fn bands(&self) -> &[ColorBand] {
        &self.bands
    }

    pub fn colors(&self) -> impl Iterator<Item = EyeColor> + '_ {
        self.bands.iter().map(|b| b.color)
    }

    /// Dark pupil/shadow pixels that never count toward any band.
    pub fn is_shadow(&self, rgb: [u8; 3]) -> bool {
        (0..3).all(|c| rgb[c] <= self.shadow_max[c])
    }
}

impl Default for EyePalette {
    fn default() -> Self {
        let band = |color, upper, lower| ColorBand {
            color,
            range: BandRange::new(upper, lower),
        };
        Self {
            bands: vec![
                band(EyeColor::Blue, [150, 175, 195], [55, 111, 168]),
                band(EyeColor::Green, [163, 163, 125], [71, 84, 74]),
                band(EyeColor::Yellow, [238, 255, 172], [196, 170, 121]),
                band(EyeColor::Brown, [130, 101, 0], [51, 41, 40]),
                band(EyeColor::Gray, [128, 128, 128], [90, 85, 79]),
            ],
            shadow_max: DEFAULT_SHADOW_MAX,
        }
    }
}
