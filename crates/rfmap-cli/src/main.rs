//! rfmap - load SDF terrain tiles and query elevations.
//!
//! Usage:
//!   rfmap load --min-lat 46 --max-lat 48 --min-lon 121 --max-lon 123
//!   rfmap --sdf-path ./sdf probe --lat 47.6 --lon 122.3 --range 0.5
//!
//! Longitudes are degrees west.

use clap::{Parser, Subcommand};
use rfmap_dem::{DemError, MaxPages, Region, RegionReport, Resolver, TerrainConfig, TileStore};
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rfmap", version, about = "Load SDF terrain tiles and query elevations")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory searched for tiles after the working directory
    #[arg(long, global = true)]
    sdf_path: Option<PathBuf>,

    /// High-definition tiles (3600 points per degree)
    #[arg(long, global = true)]
    hd: bool,

    /// Number of tile pages (1, 4, 9, 16, 25, 36, 49 or 64)
    #[arg(long, global = true)]
    max_pages: Option<u32>,

    /// Separator between the numbers in tile file names
    #[arg(long, global = true)]
    delimiter: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load every tile of a rectangular region
    Load {
        #[arg(long, allow_hyphen_values = true)]
        min_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        max_lat: f64,
        /// Eastern edge, degrees west
        #[arg(long, allow_hyphen_values = true)]
        min_lon: f64,
        /// Western edge, degrees west
        #[arg(long, allow_hyphen_values = true)]
        max_lon: f64,
    },
    /// Load the terrain around a site and print its elevation
    Probe {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Degrees west
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Also load everything within this many degrees of the site
        #[arg(long)]
        range: Option<f64>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), DemError> {
    let config = build_config(&cli)?;
    debug!(?config, "terrain configuration");

    let mut store = TileStore::from_config(&config);
    let resolver = Resolver::new(&config);

    match cli.command {
        Command::Load {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        } => {
            let region = Region::covering(&[(min_lat, min_lon), (max_lat, max_lon)])
                .ok_or_else(|| DemError::InvalidConfig("empty region".into()))?;
            let start = Instant::now();
            let report = resolver.load_region(&mut store, &region);
            println!("Resolved {} tiles in {:.3}s", report.total(), start.elapsed().as_secs_f64());
            print_report(&report);
            print_coverage(&store);
        }
        Command::Probe { lat, lon, range } => {
            let mut region = Region::around(lat, lon);
            if let Some(range) = range {
                region.extend_for_range(lat, lon, range, config.max_pages.deg_limit());
            }
            let report = resolver.load_region(&mut store, &region);
            print_report(&report);
            print_coverage(&store);

            println!("\nQuerying elevation at ({}, {})...", lat, lon);
            match store.elevation_at(lat, lon) {
                Some(elevation) => println!("Elevation: {} meters", elevation),
                None => println!("No terrain loaded for this point"),
            }
        }
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<TerrainConfig, DemError> {
    let mut config = match &cli.config {
        Some(path) => TerrainConfig::from_yaml_file(path)?,
        None => TerrainConfig::default(),
    };
    if cli.hd {
        config.hd_mode = true;
    }
    if let Some(pages) = cli.max_pages {
        config.max_pages = MaxPages::new(pages)?;
    }
    if let Some(delimiter) = &cli.delimiter {
        config.delimiter = delimiter.clone();
    }
    if let Some(path) = &cli.sdf_path {
        config.sdf_path = Some(path.clone());
    }
    let config = config.with_home_search_path();
    config.validate()?;
    Ok(config)
}

fn print_report(report: &RegionReport) {
    println!(
        "Loaded: {}  Already present: {}  Sea level: {}  Unavailable: {}",
        report.loaded, report.already_loaded, report.synthetic, report.unavailable
    );
}

fn print_coverage(store: &TileStore) {
    if let Some(bounds) = store.aggregate_bounds() {
        println!(
            "Coverage: lat {}° to {}°, lon {}°W to {}°W",
            bounds.min_north, bounds.max_north, bounds.min_west, bounds.max_west
        );
    }
    if let (Some(min), Some(max)) = (store.min_elevation(), store.max_elevation()) {
        println!("Elevation range: {} to {} meters", min, max);
    }
}
