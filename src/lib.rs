//! # HotWireKit
//!
//! Toolpath and G-code generator for four-axis hot-wire foam cutters.
//!
//! ## Architecture
//!
//! HotWireKit is organized as a workspace with multiple crates:
//!
//! 1. **hotwirekit-core** - Tolerances, boundary representation, solid builders, STL import
//! 2. **hotwirekit-settings** - Foam and table profiles, machine settings, persistence
//! 3. **hotwirekit-camtools** - Ring building, rail projection, kerf, path graph, G-code
//! 4. **hotwirekit-designer** - Part placement and block pre-cut sizing
//! 5. **hotwirekit** - Job files and the command-line front end
//!
//! ## Pipeline
//!
//! A job names its shapes, the links between them and the profiles to use. Each shape
//! becomes a pair of kerf-compensated rails, the rails and links form a path graph,
//! the graph is walked into one wire route, and the route is written as G93 or G94
//! G-code.

pub mod job;

pub use hotwirekit_camtools as camtools;
pub use hotwirekit_core as core;
pub use hotwirekit_designer as designer;
pub use hotwirekit_settings as settings;

pub use hotwirekit_camtools::{
    traverse, CamToolError, CutBlockGenerator, GcodeEmitter, GcodeReport, KerfModel,
    MachineEnvelope, PathGraph, RangeWarning, Route, ShapePathGenerator, ShapePathParameters,
    TraversalOptions,
};
pub use hotwirekit_settings::{Config, FoamProfile, MachineSettings, ProfileLibrary, TableProfile};
pub use job::{run_job, JobFile};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Sets up structured logging with:
/// - `RUST_LOG` environment variable support, `info` otherwise
/// - human readable output on stderr, or one JSON object per event with `json`
pub fn init_logging(json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(false),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_line_number(true),
            )
            .try_init()?;
    }

    Ok(())
}
