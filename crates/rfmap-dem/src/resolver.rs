//! Populating the store: plain file, then compressed file, then sea level.

use tracing::{info, warn};

use crate::config::TerrainConfig;
use crate::geo::Region;
use crate::loader::{LoadResult, TileLoader};
use crate::source::Container;
use crate::store::{SlotOutcome, TileStore};
use crate::tile::{Tile, TileBounds};

/// What happened to a requested region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Terrain was read from a file.
    Loaded,
    /// The region was already in the store.
    AlreadyLoaded,
    /// No file exists; the region was filled with sea-level terrain.
    SyntheticSeaLevel,
    /// No file exists and the store had no room for a sea-level tile.
    Unavailable,
}

/// Full account of one resolution, including which strategies were tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Final outcome.
    pub outcome: Outcome,
    /// Container that supplied the terrain, when one did.
    pub container: Option<Container>,
    /// Each file strategy tried, in order, with its result.
    pub attempts: Vec<(Container, LoadResult)>,
}

impl Resolution {
    /// Whether a file strategy was turned away for lack of a free page.
    pub fn hit_capacity(&self) -> bool {
        self.outcome == Outcome::Unavailable
            || self
                .attempts
                .iter()
                .any(|(_, result)| *result == LoadResult::NoCapacity)
    }
}

/// Tally of outcomes from loading a region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionReport {
    /// Tiles read from files.
    pub loaded: usize,
    /// Tiles that were already present.
    pub already_loaded: usize,
    /// Tiles filled with sea level.
    pub synthetic: usize,
    /// Tiles that found no free page.
    pub unavailable: usize,
}

impl RegionReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Loaded => self.loaded += 1,
            Outcome::AlreadyLoaded => self.already_loaded += 1,
            Outcome::SyntheticSeaLevel => self.synthetic += 1,
            Outcome::Unavailable => self.unavailable += 1,
        }
    }

    /// Number of cells visited.
    pub fn total(&self) -> usize {
        self.loaded + self.already_loaded + self.synthetic + self.unavailable
    }
}

/// Resolves geographic cells into store pages.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    config: &'a TerrainConfig,
}

impl<'a> Resolver<'a> {
    /// Resolver using the file naming and search path from `config`.
    pub fn new(config: &'a TerrainConfig) -> Self {
        Self { config }
    }

    /// Make sure the store holds terrain for `bounds`.
    ///
    /// Absence of data is never an error here: a region with no file is
    /// assumed to be open water.
    pub fn resolve(&self, store: &mut TileStore, bounds: TileBounds) -> Outcome {
        self.resolve_detailed(store, bounds).outcome
    }

    /// Like [`resolve`](Self::resolve), but reports every strategy tried.
    pub fn resolve_detailed(&self, store: &mut TileStore, bounds: TileBounds) -> Resolution {
        let mut attempts = Vec::with_capacity(2);

        for loader in [TileLoader::plain(self.config), TileLoader::compressed(self.config)] {
            let result = loader.load(store, bounds);
            attempts.push((loader.container(), result));
            match result {
                LoadResult::Loaded => {
                    return Resolution {
                        outcome: Outcome::Loaded,
                        container: Some(loader.container()),
                        attempts,
                    }
                }
                LoadResult::AlreadyLoaded => {
                    return Resolution {
                        outcome: Outcome::AlreadyLoaded,
                        container: None,
                        attempts,
                    }
                }
                LoadResult::NoCapacity | LoadResult::NotFound => {}
            }
        }

        Resolution {
            outcome: self.fill_sea_level(store, bounds),
            container: None,
            attempts,
        }
    }

    fn fill_sea_level(&self, store: &mut TileStore, bounds: TileBounds) -> Outcome {
        let slot = match store.find_slot_for(bounds) {
            SlotOutcome::AlreadyPresent(_) => return Outcome::AlreadyLoaded,
            SlotOutcome::Full => {
                warn!(?bounds, "no free page for region; it will read as unmapped");
                return Outcome::Unavailable;
            }
            SlotOutcome::Empty(slot) => slot,
        };

        info!(
            "Region \"{}\" assumed as sea-level into page {}",
            bounds.file_stem(&self.config.delimiter, self.config.hd_mode),
            slot + 1
        );
        let tile = Tile::sea_level(bounds, store.resolution());
        store.insert(slot, tile);
        Outcome::SyntheticSeaLevel
    }

    /// Resolve every one-degree cell of `region`.
    pub fn load_region(&self, store: &mut TileStore, region: &Region) -> RegionReport {
        let mut report = RegionReport::default();
        for bounds in region.cells() {
            report.record(self.resolve(store, bounds));
        }
        info!(
            loaded = report.loaded,
            already_loaded = report.already_loaded,
            synthetic = report.synthetic,
            unavailable = report.unavailable,
            "region resolved"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaxPages;

    fn config_in(dir: &std::path::Path) -> TerrainConfig {
        TerrainConfig {
            max_pages: MaxPages::new(4).unwrap(),
            sdf_path: Some(dir.to_path_buf()),
            ..TerrainConfig::default()
        }
    }

    #[test]
    fn test_missing_tile_becomes_sea_level() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let mut store = TileStore::new(config.max_pages, 8);
        let resolver = Resolver::new(&config);

        let bounds = TileBounds::cell(-60, 200);
        let resolution = resolver.resolve_detailed(&mut store, bounds);
        assert_eq!(resolution.outcome, Outcome::SyntheticSeaLevel);
        assert_eq!(resolution.container, None);
        assert_eq!(
            resolution.attempts,
            vec![
                (Container::Plain, LoadResult::NotFound),
                (Container::Bzip2, LoadResult::NotFound)
            ]
        );

        let tile = store.tile(0).unwrap();
        assert_eq!(tile.bounds(), bounds);
        assert!(tile.elevation_grid().as_slice().iter().all(|&v| v == 0));
        assert!(tile.min_elevation() <= 0);

        assert_eq!(resolver.resolve(&mut store, bounds), Outcome::AlreadyLoaded);
    }

    #[test]
    fn test_full_store_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let mut store = TileStore::new(config.max_pages, 2);
        let resolver = Resolver::new(&config);

        let region = Region {
            min_north: 10,
            max_north: 11,
            min_west: 20,
            max_west: 21,
        };
        let report = resolver.load_region(&mut store, &region);
        assert_eq!(report.synthetic, 4);
        assert!(store.is_full());

        let resolution = resolver.resolve_detailed(&mut store, TileBounds::cell(30, 30));
        assert_eq!(resolution.outcome, Outcome::Unavailable);
        assert!(resolution.hit_capacity());
        assert_eq!(
            resolution.attempts,
            vec![
                (Container::Plain, LoadResult::NoCapacity),
                (Container::Bzip2, LoadResult::NoCapacity)
            ]
        );

        let again = resolver.load_region(&mut store, &region);
        assert_eq!(again.already_loaded, 4);
        assert_eq!(again.total(), 4);
    }
}
