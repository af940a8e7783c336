//! G-code emitter.
//!
//! Writes a traversed route as synchronized four-axis moves. Every route point is
//! projected onto the two gantry planes, range checked, and written as one `G1` line.
//!
//! Two feed modes are supported:
//! - constant feed (G94): heater and feed are set whenever the route enters a new
//!   segment, moves carry no feed word.
//! - inverse time (G93): every move carries `F = 60 * speed / d`, where `d` is the
//!   travel of the segment's driving rail. The driving rail is the one with the longer
//!   stored segment length, so a whole segment is timed against the same rail.

use crate::error::{CamToolError, CamToolResult};
use crate::machine::{MachineEnvelope, RangeWarning};
use crate::rails::Rail;
use crate::traversal::Route;
use hotwirekit_core::constants::POINT_TOLERANCE;
use hotwirekit_settings::{FeedMode, FoamProfile, MachineSettings, SettingsError};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Generated program plus what was noticed while writing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GcodeReport {
    pub gcode: String,
    /// Projected coordinates outside the machine envelope
    pub warnings: Vec<RangeWarning>,
    /// Number of `G1` lines written
    pub move_count: usize,
    /// Travel of the driving rail summed over all moves, mm
    pub cut_length: f64,
}

pub struct GcodeEmitter<'a> {
    envelope: MachineEnvelope,
    foam: &'a FoamProfile,
    settings: &'a MachineSettings,
    job_name: Option<String>,
}

impl<'a> GcodeEmitter<'a> {
    pub fn new(envelope: MachineEnvelope, foam: &'a FoamProfile, settings: &'a MachineSettings) -> Self {
        Self {
            envelope,
            foam,
            settings,
            job_name: None,
        }
    }

    pub fn with_job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = Some(name.into());
        self
    }

    pub fn generate(&self, route: &Route) -> CamToolResult<GcodeReport> {
        self.validate(route)?;

        let mode = self.settings.feed_mode;
        let names = self.settings.axis_names.as_array();
        let decimals = self.settings.decimals;
        let mut report = GcodeReport::default();
        let mut gcode = String::new();

        if self.settings.header_comments {
            self.write_header(&mut gcode, route);
        }
        gcode.push_str("G21\nG17\nG90\n");
        gcode.push_str(mode.gcode());
        gcode.push('\n');

        let home = self.envelope.home;
        let mut prev_a = home;
        let mut prev_b = home;
        let mut last_segment = None;

        for i in 0..route.len() {
            let a = route.side_a[i];
            let b = route.side_b[i];
            let command = &route.commands[i];
            let at_home = route.home_index == Some(i);
            let segment_start = last_segment != Some(command.segment);

            let d_a = planar_distance(&prev_a, &a);
            let d_b = planar_distance(&prev_b, &b);
            let (driver, other) = match command.lengths.driver() {
                Rail::A => (d_a, d_b),
                Rail::B => (d_b, d_a),
            };
            let travel = if driver > POINT_TOLERANCE { driver } else { other };

            let feed_word = match mode {
                FeedMode::Constant => String::new(),
                FeedMode::InverseTime => {
                    if travel <= POINT_TOLERANCE {
                        debug!("Skipping zero-length move at route index {}", i);
                        continue;
                    }
                    format!(" F{:.*}", decimals, inverse_time_feed(travel, self.foam.speed))
                }
            };

            if at_home && self.settings.power_off_at_end {
                gcode.push_str("M5\n");
            } else if segment_start {
                gcode.push_str(&format!("M3 S{:.0}\n", self.foam.heater_value()));
                if mode == FeedMode::Constant {
                    gcode.push_str(&format!("G1 F{}\n", format_value(self.foam.feed_per_minute(), decimals)));
                }
            }

            let (ma, mb) = self.envelope.project(&a, &b);
            for warning in self.envelope.check(i, &ma, &mb, names) {
                warn!("{}", warning);
                report.warnings.push(warning);
            }

            gcode.push_str(&format!(
                "G1 {}{} {}{} {}{} {}{}{}\n",
                names[0],
                format_value(ma.x, decimals),
                names[1],
                format_value(ma.y, decimals),
                names[2],
                format_value(mb.x, decimals),
                names[3],
                format_value(mb.y, decimals),
                feed_word
            ));
            report.move_count += 1;
            report.cut_length += travel;
            last_segment = Some(command.segment);

            prev_a = a;
            prev_b = b;
        }

        gcode.push_str("M5\nG94\n");

        info!(
            "Generated {} moves ({} mode), {} range warning(s)",
            report.move_count,
            mode,
            report.warnings.len()
        );
        report.gcode = gcode;
        Ok(report)
    }

    fn validate(&self, route: &Route) -> CamToolResult<()> {
        self.foam.validate().map_err(SettingsError::from)?;
        if route.is_empty() {
            return Err(CamToolError::InvalidParameters("route is empty".into()));
        }
        if route.side_b.len() != route.len() || route.commands.len() != route.len() {
            return Err(CamToolError::InvalidParameters(format!(
                "route lists differ in length: {} / {} / {}",
                route.side_a.len(),
                route.side_b.len(),
                route.commands.len()
            )));
        }
        if self.envelope.z_length <= 0.0 {
            return Err(CamToolError::InvalidParameters(
                "wire length must be > 0".into(),
            ));
        }
        Ok(())
    }

    fn write_header(&self, gcode: &mut String, route: &Route) {
        gcode.push_str("; HotWireKit toolpath\n");
        if let Some(name) = &self.job_name {
            gcode.push_str(&format!("; Job: {}\n", name));
        }
        gcode.push_str(&format!("; Foam: {}\n", self.foam));
        gcode.push_str(&format!("; Feed mode: {}\n", self.settings.feed_mode));
        gcode.push_str(&format!("; Route points: {}\n", route.len()));
        gcode.push_str(&format!(
            "; Generated: {}\n",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
}

/// Inverse-time feed for a move of `distance` mm at `speed` mm/s, in 1/min.
pub fn inverse_time_feed(distance: f64, speed: f64) -> f64 {
    1.0 / ((distance / speed) / 60.0)
}

/// Fixed-point value without a negative sign on zero.
pub fn format_value(value: f64, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, value);
    match s.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => rest.to_string(),
        _ => s,
    }
}

fn planar_distance(from: &Point3<f64>, to: &Point3<f64>) -> f64 {
    (to.xy() - from.xy()).norm()
}
