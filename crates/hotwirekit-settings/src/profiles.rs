//! Foam and table profiles.
//!
//! On disk a profile library is a JSON array holding two arrays, tables first and
//! foams second. Every profile is itself a flat array in field order:
//!
//! ```text
//! [
//!   [["Default", 500.0, 400.0, 400.0, 10.0, 50.0, 2.0, 200.0, 20.0, 200.0, 0.0, 5.0]],
//!   [["Default", 1.6, 4.0, 1.9, 75]]
//! ]
//! ```

use crate::error::{ProfileError, ProfileResult, SettingsResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::info;

/// Cutting characteristics of one foam type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FoamRecord", into = "FoamRecord")]
pub struct FoamProfile {
    pub name: String,
    /// Kerf width at the root (longer) rail, mm
    pub root_kerf: f64,
    /// Cut speed at the root rail, mm/s
    pub speed: f64,
    /// Kerf width at a rail 0.4 times as long as the root rail, mm
    pub tip_kerf: f64,
    /// Heater setting in profile units
    pub heat: f64,
}

impl FoamProfile {
    /// Value sent with the heater command (`M3 S...`).
    pub fn heater_value(&self) -> f64 {
        self.heat * 10.0
    }

    /// Cut speed converted to mm/min.
    pub fn feed_per_minute(&self) -> f64 {
        self.speed * 60.0
    }

    pub fn validate(&self) -> ProfileResult<()> {
        let invalid = |reason: &str| ProfileError::InvalidValue {
            kind: "foam",
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.speed <= 0.0 {
            return Err(invalid("speed must be > 0"));
        }
        if self.root_kerf < 0.0 || self.tip_kerf < 0.0 {
            return Err(invalid("kerf must not be negative"));
        }
        if self.heat < 0.0 {
            return Err(invalid("heat must not be negative"));
        }
        Ok(())
    }
}

impl Default for FoamProfile {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            root_kerf: 1.6,
            speed: 4.0,
            tip_kerf: 1.9,
            heat: 75.0,
        }
    }
}

impl fmt::Display for FoamProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (kerf {:.2}/{:.2} mm, {:.1} mm/s, heat {})",
            self.name, self.root_kerf, self.tip_kerf, self.speed, self.heat
        )
    }
}

#[derive(Serialize, Deserialize)]
struct FoamRecord(String, f64, f64, f64, f64);

impl From<FoamRecord> for FoamProfile {
    fn from(r: FoamRecord) -> Self {
        Self {
            name: r.0,
            root_kerf: r.1,
            speed: r.2,
            tip_kerf: r.3,
            heat: r.4,
        }
    }
}

impl From<FoamProfile> for FoamRecord {
    fn from(p: FoamProfile) -> Self {
        FoamRecord(p.name, p.root_kerf, p.speed, p.tip_kerf, p.heat)
    }
}

/// Machine envelope, placement margins and base block geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TableRecord", into = "TableRecord")]
pub struct TableProfile {
    pub name: String,
    /// Distance between the two gantries along Z, mm
    pub wire_length: f64,
    /// X travel of each gantry, mm
    pub x_travel: f64,
    /// Y travel of each gantry, mm
    pub y_travel: f64,
    /// Maximum cut speed, mm/s
    pub max_speed: f64,
    /// Maximum heater setting
    pub max_heat: f64,
    /// Gap kept between objects stacked along Y, mm
    pub y_margin: f64,
    /// Base block size along X, mm
    pub base_length: f64,
    /// Base block size along Y (table top height), mm
    pub base_width: f64,
    /// Base block size along Z, mm
    pub base_height: f64,
    /// Base block offset along X, mm
    pub base_x_offset: f64,
    /// Gap kept between objects placed along X, mm
    pub x_margin: f64,
}

impl TableProfile {
    pub fn validate(&self) -> ProfileResult<()> {
        let invalid = |reason: &str| ProfileError::InvalidValue {
            kind: "table",
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.wire_length <= 0.0 || self.x_travel <= 0.0 || self.y_travel <= 0.0 {
            return Err(invalid("machine travel must be > 0"));
        }
        if self.x_margin < 0.0 || self.y_margin < 0.0 {
            return Err(invalid("margins must not be negative"));
        }
        Ok(())
    }
}

impl Default for TableProfile {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            wire_length: 500.0,
            x_travel: 400.0,
            y_travel: 400.0,
            max_speed: 10.0,
            max_heat: 50.0,
            y_margin: 2.0,
            base_length: 200.0,
            base_width: 20.0,
            base_height: 200.0,
            base_x_offset: 0.0,
            x_margin: 5.0,
        }
    }
}

impl fmt::Display for TableProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.0} x {:.0} mm, wire {:.0} mm)",
            self.name, self.x_travel, self.y_travel, self.wire_length
        )
    }
}

#[derive(Serialize, Deserialize)]
struct TableRecord(
    String,
    f64,
    f64,
    f64,
    f64,
    f64,
    f64,
    f64,
    f64,
    f64,
    f64,
    f64,
);

impl From<TableRecord> for TableProfile {
    fn from(r: TableRecord) -> Self {
        Self {
            name: r.0,
            wire_length: r.1,
            x_travel: r.2,
            y_travel: r.3,
            max_speed: r.4,
            max_heat: r.5,
            y_margin: r.6,
            base_length: r.7,
            base_width: r.8,
            base_height: r.9,
            base_x_offset: r.10,
            x_margin: r.11,
        }
    }
}

impl From<TableProfile> for TableRecord {
    fn from(p: TableProfile) -> Self {
        TableRecord(
            p.name,
            p.wire_length,
            p.x_travel,
            p.y_travel,
            p.max_speed,
            p.max_heat,
            p.y_margin,
            p.base_length,
            p.base_width,
            p.base_height,
            p.base_x_offset,
            p.x_margin,
        )
    }
}

/// Ordered table and foam profiles. Both lists always hold at least one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LibraryRecord", into = "LibraryRecord")]
pub struct ProfileLibrary {
    tables: Vec<TableProfile>,
    foams: Vec<FoamProfile>,
}

#[derive(Serialize, Deserialize)]
struct LibraryRecord(Vec<TableProfile>, Vec<FoamProfile>);

impl TryFrom<LibraryRecord> for ProfileLibrary {
    type Error = String;

    fn try_from(r: LibraryRecord) -> Result<Self, Self::Error> {
        if r.0.is_empty() {
            return Err("profile library has no table profiles".to_string());
        }
        if r.1.is_empty() {
            return Err("profile library has no foam profiles".to_string());
        }
        Ok(Self {
            tables: r.0,
            foams: r.1,
        })
    }
}

impl From<ProfileLibrary> for LibraryRecord {
    fn from(lib: ProfileLibrary) -> Self {
        LibraryRecord(lib.tables, lib.foams)
    }
}

impl Default for ProfileLibrary {
    fn default() -> Self {
        Self {
            tables: vec![TableProfile::default()],
            foams: vec![FoamProfile::default()],
        }
    }
}

impl ProfileLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(content: &str) -> SettingsResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json_string(&self) -> SettingsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a library file; a missing file yields the default library.
    pub fn load(path: &Path) -> SettingsResult<Self> {
        if !path.exists() {
            info!(
                "Profile file {} not found, using default profiles",
                path.display()
            );
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn save(&self, path: &Path) -> SettingsResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn tables(&self) -> &[TableProfile] {
        &self.tables
    }

    pub fn foams(&self) -> &[FoamProfile] {
        &self.foams
    }

    pub fn table(&self, index: usize) -> ProfileResult<&TableProfile> {
        self.tables.get(index).ok_or(ProfileError::IndexOutOfRange {
            kind: "table",
            index,
            len: self.tables.len(),
        })
    }

    pub fn foam(&self, index: usize) -> ProfileResult<&FoamProfile> {
        self.foams.get(index).ok_or(ProfileError::IndexOutOfRange {
            kind: "foam",
            index,
            len: self.foams.len(),
        })
    }

    /// Table at `index`, falling back to the last one when the index is stale.
    pub fn active_table(&self, index: usize) -> ProfileResult<&TableProfile> {
        self.tables
            .get(index)
            .or_else(|| self.tables.last())
            .ok_or(ProfileError::IndexOutOfRange {
                kind: "table",
                index,
                len: 0,
            })
    }

    /// Foam at `index`, falling back to the last one when the index is stale.
    pub fn active_foam(&self, index: usize) -> ProfileResult<&FoamProfile> {
        self.foams
            .get(index)
            .or_else(|| self.foams.last())
            .ok_or(ProfileError::IndexOutOfRange {
                kind: "foam",
                index,
                len: 0,
            })
    }

    pub fn add_table(&mut self, table: TableProfile) -> ProfileResult<usize> {
        table.validate()?;
        self.tables.push(table);
        Ok(self.tables.len() - 1)
    }

    pub fn add_foam(&mut self, foam: FoamProfile) -> ProfileResult<usize> {
        foam.validate()?;
        self.foams.push(foam);
        Ok(self.foams.len() - 1)
    }

    pub fn update_table(&mut self, index: usize, table: TableProfile) -> ProfileResult<()> {
        table.validate()?;
        let len = self.tables.len();
        let slot = self.tables.get_mut(index).ok_or(ProfileError::IndexOutOfRange {
            kind: "table",
            index,
            len,
        })?;
        *slot = table;
        Ok(())
    }

    pub fn update_foam(&mut self, index: usize, foam: FoamProfile) -> ProfileResult<()> {
        foam.validate()?;
        let len = self.foams.len();
        let slot = self.foams.get_mut(index).ok_or(ProfileError::IndexOutOfRange {
            kind: "foam",
            index,
            len,
        })?;
        *slot = foam;
        Ok(())
    }

    pub fn remove_table(&mut self, index: usize) -> ProfileResult<TableProfile> {
        self.table(index)?;
        if self.tables.len() == 1 {
            return Err(ProfileError::LastProfile("table"));
        }
        Ok(self.tables.remove(index))
    }

    pub fn remove_foam(&mut self, index: usize) -> ProfileResult<FoamProfile> {
        self.foam(index)?;
        if self.foams.len() == 1 {
            return Err(ProfileError::LastProfile("foam"));
        }
        Ok(self.foams.remove(index))
    }
}
