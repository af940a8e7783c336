//! hotwirekit CLI - toolpaths and G-code for hot-wire foam cutters

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hotwirekit::designer::base_box;
use hotwirekit::{init_logging, run_job, Config, CutBlockGenerator, JobFile, ProfileLibrary};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "hotwirekit")]
#[command(version = hotwirekit::VERSION)]
#[command(about = "Toolpath and G-code generator for 4-axis hot-wire foam cutters", long_about = None)]
struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate G-code from a job file
    Generate {
        /// Job file (.json)
        job: PathBuf,
        /// Output G-code file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Write the block pre-cut program
    CutBlock {
        /// Output G-code file
        #[arg(short, long)]
        output: PathBuf,
        /// Cut position along X, mm
        #[arg(long)]
        position: Option<f64>,
        /// Block height, mm
        #[arg(long)]
        height: Option<f64>,
        /// Block depth, mm
        #[arg(long)]
        depth: Option<f64>,
        /// Wire clearance above and below the block, mm
        #[arg(long)]
        clearance: Option<f64>,
        /// Cut at the far end of the base block instead of `position`
        #[arg(long)]
        at_base_end: bool,
    },
    /// List the foam and table profiles
    Profiles {
        /// Write the default profile library if none exists
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json)?;
    info!("hotwirekit {} (built {})", hotwirekit::VERSION, hotwirekit::BUILD_DATE);
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let profile_path = config.profile_path(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate { job, output } => {
            let library = ProfileLibrary::load(&profile_path)?;
            generate(&job, &output, &config, &library)?;
        }
        Commands::CutBlock {
            output,
            position,
            height,
            depth,
            clearance,
            at_base_end,
        } => {
            let library = ProfileLibrary::load(&profile_path)?;
            let mut params = config.cut_block;
            params.position = position.unwrap_or(params.position);
            params.block_height = height.unwrap_or(params.block_height);
            params.block_depth = depth.unwrap_or(params.block_depth);
            params.clearance = clearance.unwrap_or(params.clearance);

            let table = library.active_table(config.table_index)?;
            let foam = library.active_foam(config.foam_index)?;
            let params = hotwirekit::designer::size_cut_block(
                params,
                None,
                &base_box(table),
                table,
                at_base_end,
            );
            let gcode = CutBlockGenerator::new(params, table, foam)
                .with_axis_names(config.machine.axis_names.clone())
                .with_decimals(config.machine.decimals)
                .generate()?;
            write_output(&output, &gcode)?;
        }
        Commands::Profiles { init } => {
            if init {
                if profile_path.exists() {
                    bail!("Profile library {} already exists", profile_path.display());
                }
                ProfileLibrary::default().save(&profile_path)?;
                println!("Wrote default profiles to {}", profile_path.display());
            }
            let library = ProfileLibrary::load(&profile_path)?;
            print_profiles(&library, &config);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => Config::load_from_file(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(Config::new()),
    }
}

fn generate(job_path: &Path, output: &Path, config: &Config, library: &ProfileLibrary) -> Result<()> {
    let job = JobFile::load(job_path)?;
    let base_dir = job_path.parent().unwrap_or_else(|| Path::new("."));
    let report = run_job(&job, base_dir, config, library)?;

    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }
    if !report.warnings.is_empty() {
        warn!(
            "{} coordinate(s) outside the machine envelope, check the setup before cutting",
            report.warnings.len()
        );
    }
    write_output(output, &report.gcode)?;
    println!(
        "Wrote {} moves ({:.1} mm of cut) to {}",
        report.move_count,
        report.cut_length,
        output.display()
    );
    Ok(())
}

fn write_output(path: &Path, gcode: &str) -> Result<()> {
    fs::write(path, gcode).with_context(|| format!("Failed to write {}", path.display()))
}

fn print_profiles(library: &ProfileLibrary, config: &Config) {
    println!("Tables:");
    for (i, table) in library.tables().iter().enumerate() {
        let mark = if i == config.table_index { '*' } else { ' ' };
        println!(" {} [{}] {}", mark, i, table);
    }
    println!("Foams:");
    for (i, foam) in library.foams().iter().enumerate() {
        let mark = if i == config.foam_index { '*' } else { ' ' };
        println!(" {} [{}] {}", mark, i, foam);
    }
}
