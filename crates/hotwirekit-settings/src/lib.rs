//! HotWireKit Settings Crate
//!
//! Foam and table profile libraries, machine settings and cut-block parameters,
//! plus their on-disk formats.

pub mod config;
pub mod error;
pub mod profiles;

pub use config::{AxisNames, Config, CutBlockParameters, FeedMode, MachineSettings};
pub use error::{ProfileError, SettingsError, SettingsResult};
pub use profiles::{FoamProfile, ProfileLibrary, TableProfile};
