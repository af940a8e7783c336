//! Configuration and settings management for HotWireKit
//!
//! Provides the machine settings used by the G-code emitter, the cut-block
//! parameters and the selected profile indices. Files are JSON or TOML, chosen
//! by extension, and live in the platform config directory by default.

use crate::error::{SettingsError, SettingsResult};
use hotwirekit_core::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Motion mode used for the cut moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    /// G93: every move carries 1/minutes so both rails arrive together
    #[default]
    InverseTime,
    /// G94: one feed rate in mm/min per segment
    Constant,
}

impl FeedMode {
    pub fn gcode(&self) -> &'static str {
        match self {
            Self::InverseTime => "G93",
            Self::Constant => "G94",
        }
    }
}

impl fmt::Display for FeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InverseTime => write!(f, "inverse time (G93)"),
            Self::Constant => write!(f, "constant feed (G94)"),
        }
    }
}

/// Controller axis letters for the four wire-end coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisNames {
    /// Side A horizontal axis
    pub a_x: String,
    /// Side A vertical axis
    pub a_y: String,
    /// Side B horizontal axis
    pub b_x: String,
    /// Side B vertical axis
    pub b_y: String,
}

impl Default for AxisNames {
    fn default() -> Self {
        Self {
            a_x: "X".to_string(),
            a_y: "Y".to_string(),
            b_x: "A".to_string(),
            b_y: "Z".to_string(),
        }
    }
}

impl AxisNames {
    pub fn as_array(&self) -> [&str; 4] {
        [&self.a_x, &self.a_y, &self.b_x, &self.b_y]
    }
}

/// Machine preferences that are not part of a table profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSettings {
    /// Feed mode for cut moves
    pub feed_mode: FeedMode,
    /// Home position of gantry A in machine space, mm
    pub virtual_zero: [f64; 3],
    /// Decimal places for coordinates and feeds
    pub decimals: usize,
    /// Switch the heater off before the final move home
    pub power_off_at_end: bool,
    /// Append the final move back to the home position
    pub return_home: bool,
    /// Write `;` header comments before the preamble
    pub header_comments: bool,
    /// Axis letters written to the G-code
    pub axis_names: AxisNames,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            feed_mode: FeedMode::InverseTime,
            virtual_zero: [0.0, 0.0, 0.0],
            decimals: 3,
            power_off_at_end: false,
            return_home: true,
            header_comments: false,
            axis_names: AxisNames::default(),
        }
    }
}

impl MachineSettings {
    pub fn virtual_zero_point(&self) -> Point3<f64> {
        Point3::new(
            self.virtual_zero[0],
            self.virtual_zero[1],
            self.virtual_zero[2],
        )
    }
}

/// Parameters of the rough block pre-cut.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutBlockParameters {
    /// Distance from home to the cut line along X, mm
    pub position: f64,
    /// Height of the foam block, mm
    pub block_height: f64,
    /// Depth of the foam block along X, mm
    pub block_depth: f64,
    /// Clearance kept around the block, mm
    pub clearance: f64,
}

impl Default for CutBlockParameters {
    fn default() -> Self {
        Self {
            position: 300.0,
            block_height: 100.0,
            block_depth: 100.0,
            clearance: 10.0,
        }
    }
}

impl CutBlockParameters {
    pub fn validate(&self) -> SettingsResult<()> {
        let checks = [
            ("cut_block.position", self.position),
            ("cut_block.block_height", self.block_height),
            ("cut_block.block_depth", self.block_depth),
        ];
        for (key, value) in checks {
            if value <= 0.0 {
                return Err(SettingsError::InvalidSetting {
                    key: key.to_string(),
                    reason: format!("must be > 0, got {}", value),
                });
            }
        }
        if self.clearance < 0.0 {
            return Err(SettingsError::InvalidSetting {
                key: "cut_block.clearance".to_string(),
                reason: format!("must not be negative, got {}", self.clearance),
            });
        }
        Ok(())
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Selected table profile
    pub table_index: usize,
    /// Selected foam profile
    pub foam_index: usize,
    /// Profile library file, defaults to `profiles.json` next to the config
    pub profile_file: Option<PathBuf>,
    /// Machine preferences
    pub machine: MachineSettings,
    /// Last used cut-block parameters
    pub cut_block: CutBlockParameters,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<platform config dir>/hotwirekit`
    pub fn default_dir() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join("hotwirekit"))
            .ok_or_else(|| SettingsError::ConfigDirectory("no config directory on this platform".into()))
    }

    /// Profile library path: the configured one, or `profiles.json` beside `config_path`.
    pub fn profile_path(&self, config_path: Option<&Path>) -> SettingsResult<PathBuf> {
        if let Some(p) = &self.profile_file {
            return Ok(p.clone());
        }
        match config_path.and_then(|p| p.parent()) {
            Some(dir) => Ok(dir.join("profiles.json")),
            None => Ok(Self::default_dir()?.join("profiles.json")),
        }
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)?
        } else {
            return Err(SettingsError::UnsupportedFormat(path.display().to_string()));
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self)?
        } else {
            return Err(SettingsError::UnsupportedFormat(path.display().to_string()));
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> SettingsResult<()> {
        self.cut_block.validate()?;
        if self.machine.decimals == 0 || self.machine.decimals > 6 {
            return Err(SettingsError::InvalidSetting {
                key: "machine.decimals".to_string(),
                reason: "must be between 1 and 6".to_string(),
            });
        }
        let names = self.machine.axis_names.as_array();
        if names.iter().any(|n| n.is_empty()) {
            return Err(SettingsError::InvalidSetting {
                key: "machine.axis_names".to_string(),
                reason: "axis names must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.machine.feed_mode, FeedMode::InverseTime);
        assert_eq!(config.machine.axis_names.as_array(), ["X", "Y", "A", "Z"]);
        assert_eq!(config.cut_block.position, 300.0);
        assert_eq!(config.cut_block.clearance, 10.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            foam_index = 2

            [machine]
            feed_mode = "constant"
            "#,
        )
        .unwrap();
        assert_eq!(config.foam_index, 2);
        assert_eq!(config.machine.feed_mode, FeedMode::Constant);
        assert_eq!(config.machine.decimals, 3);
        assert_eq!(config.cut_block, CutBlockParameters::default());
    }

    #[test]
    fn test_invalid_cut_block() {
        let mut config = Config::default();
        config.cut_block.block_height = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cut_block.block_height"));
    }

    #[test]
    fn test_feed_mode_codes() {
        assert_eq!(FeedMode::InverseTime.gcode(), "G93");
        assert_eq!(FeedMode::Constant.gcode(), "G94");
    }

    #[test]
    fn test_profile_path_beside_config() {
        let config = Config::default();
        let path = config
            .profile_path(Some(Path::new("/tmp/hw/config.toml")))
            .unwrap();
        assert_eq!(path, PathBuf::from("/tmp/hw/profiles.json"));
    }
}
