//! # rfmap-dem
//!
//! Terrain tile store for RF coverage runs.
//!
//! Elevation data comes in one-degree SDF tiles, either as plain text or
//! wrapped in bzip2. A run holds a fixed number of tiles in a [`TileStore`];
//! each tile carries an elevation raster plus signal and mask planes that
//! later stages paint on.
//!
//! ## Overview
//!
//! ### Coordinates
//!
//! Latitudes are degrees north. Longitudes are degrees *west* in `[0, 360)`,
//! so a tile named `47_48_122_123.sdf` spans 47N to 48N and 122W to 123W.
//! Regions that cross the 0/360 meridian are handled throughout; see
//! [`lon_diff`].
//!
//! ### Resolving Tiles
//!
//! [`Resolver`] tries the plain file, then the bzip2 file, and finally fills
//! the region with sea-level terrain so a missing tile never stops a run.
//! Only a full store leaves a region unmapped.
//!
//! ## Examples
//!
//! ```no_run
//! use rfmap_dem::{Region, Resolver, TerrainConfig, TileStore};
//!
//! let config = TerrainConfig::from_yaml_file("terrain.yaml")?.with_home_search_path();
//! let mut store = TileStore::from_config(&config);
//!
//! // Everything within half a degree of a site
//! let mut region = Region::around(47.6, 122.3);
//! region.extend_for_range(47.6, 122.3, 0.5, config.max_pages.deg_limit());
//! let report = Resolver::new(&config).load_region(&mut store, &region);
//! println!("{} tiles loaded, {} assumed sea level", report.loaded, report.synthetic);
//!
//! if let Some(elevation) = store.elevation_at(47.6, 122.3) {
//!     println!("Elevation: {} meters", elevation);
//! }
//! # Ok::<(), rfmap_dem::DemError>(())
//! ```

mod config;
mod error;
mod geo;
mod grid;
mod loader;
mod resolver;
mod source;
mod store;
mod tile;

pub use config::{
    MaxPages, TerrainConfig, DEFAULT_COMPRESSED_SUFFIX, DEFAULT_DELIMITER, DEFAULT_PLAIN_SUFFIX,
    HD_RESOLUTION, STANDARD_RESOLUTION,
};
pub use error::DemError;
pub use geo::{lon_diff, normalize_west, reduce_angle, Region};
pub use grid::Grid;
pub use loader::{parse_tile, write_sdf, LoadResult, ParsedTile, TileLoader};
pub use resolver::{Outcome, RegionReport, Resolution, Resolver};
pub use source::{Bzip2Source, Container, PlainSource, TileSource, BZIP2_BLOCK_SIZE, MAX_TOKEN_LEN};
pub use store::{SlotOutcome, TileLocation, TileStore, EMPTY_SLOT_BOUNDS};
pub use tile::{Tile, TileBounds};

/// Result type for DEM operations.
pub type Result<T> = std::result::Result<T, DemError>;
