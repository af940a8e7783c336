//! Block pre-cut program.
//!
//! Cuts a slab of foam to depth before the shaped cut: the wire is raised to the table
//! top, the operator places the block against it, and a single vertical pass trims the
//! block. All moves are relative and drive both gantries identically.

use crate::error::CamToolResult;
use crate::gcode_emitter::{format_value, inverse_time_feed};
use hotwirekit_settings::{AxisNames, CutBlockParameters, FoamProfile, SettingsError, TableProfile};
use tracing::info;

pub struct CutBlockGenerator<'a> {
    params: CutBlockParameters,
    table: &'a TableProfile,
    foam: &'a FoamProfile,
    axis_names: AxisNames,
    decimals: usize,
}

impl<'a> CutBlockGenerator<'a> {
    pub fn new(params: CutBlockParameters, table: &'a TableProfile, foam: &'a FoamProfile) -> Self {
        Self {
            params,
            table,
            foam,
            axis_names: AxisNames::default(),
            decimals: 3,
        }
    }

    pub fn with_axis_names(mut self, names: AxisNames) -> Self {
        self.axis_names = names;
        self
    }

    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals;
        self
    }

    /// Vertical wire travel of the trimming pass.
    pub fn cut_distance(&self) -> f64 {
        self.params.block_height + 2.0 * self.params.clearance
    }

    pub fn generate(&self) -> CamToolResult<String> {
        self.params.validate()?;
        self.foam.validate().map_err(SettingsError::from)?;

        let p = &self.params;
        let half_kerf = self.foam.root_kerf / 2.0;
        let table_top = self.table.base_width + p.clearance;
        let cut = self.cut_distance();
        let feed = inverse_time_feed(cut, self.foam.speed);

        let mut gcode = String::new();
        gcode.push_str("G21\nG17\nG91\nG93\n");
        // up to the table top
        gcode.push_str(&self.rapid(0.0, table_top));
        gcode.push_str(&self.rapid(p.position + p.block_depth, 0.0));
        gcode.push_str("M0 (Place block against wire)\n");
        gcode.push_str(&self.rapid(p.clearance, 0.0));
        gcode.push_str(&self.rapid(0.0, p.block_height));
        // back over the block, wire on the kerf line
        gcode.push_str(&self.rapid(-(p.block_depth + half_kerf), 0.0));
        gcode.push_str(&format!("M3 S{:.0}\n", self.foam.heater_value()));
        gcode.push_str(&format!(
            "G1 {} F{}\n",
            self.axes(0.0, -cut),
            format_value(feed, self.decimals)
        ));
        gcode.push_str("M5\nM0 (Remove block)\n");
        gcode.push_str(&self.rapid(0.0, 2.0 * p.clearance));
        gcode.push_str(&self.rapid(-(p.position - half_kerf + p.clearance), 0.0));
        gcode.push_str("G90\n");
        gcode.push_str(&self.rapid(0.0, 0.0));
        gcode.push_str("G94\n");

        info!(
            "Cut block program: position {:.1} mm, depth {:.1} mm, pass {:.1} mm",
            p.position, p.block_depth, cut
        );
        Ok(gcode)
    }

    fn rapid(&self, x: f64, y: f64) -> String {
        format!("G0 {}\n", self.axes(x, y))
    }

    fn axes(&self, x: f64, y: f64) -> String {
        let [ax, ay, bx, by] = self.axis_names.as_array();
        let x = format_value(x, self.decimals);
        let y = format_value(y, self.decimals);
        format!("{ax}{x} {ay}{y} {bx}{x} {by}{y}")
    }
}
