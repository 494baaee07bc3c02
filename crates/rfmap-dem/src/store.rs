//! Fixed-capacity store of terrain tiles with aggregate bounds.

use crate::config::{MaxPages, TerrainConfig};
use crate::tile::{Tile, TileBounds};

/// Bounds reported for a slot that holds no tile.
///
/// Consumers that walk raw slots treat `max_north == -90` as "empty".
pub const EMPTY_SLOT_BOUNDS: TileBounds = TileBounds {
    min_north: 90,
    max_north: -90,
    min_west: 360,
    max_west: -1,
};

/// Where a tile with given bounds would go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOutcome {
    /// A tile with these bounds is already stored in this slot.
    AlreadyPresent(usize),
    /// This slot is free.
    Empty(usize),
    /// Every slot holds some other tile.
    Full,
}

/// A tile and the pixel on it that holds a queried point.
#[derive(Debug, Clone, Copy)]
pub struct TileLocation<'a> {
    /// Slot the tile lives in.
    pub slot: usize,
    /// The covering tile.
    pub tile: &'a Tile,
    /// Row on the tile.
    pub x: usize,
    /// Column on the tile.
    pub y: usize,
}

/// Running extent of everything loaded so far. Each field is `None` until
/// the first tile is merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Extent {
    min_north: Option<i32>,
    max_north: Option<i32>,
    min_west: Option<i32>,
    max_west: Option<i32>,
    min_elevation: Option<i16>,
    max_elevation: Option<i16>,
}

impl Extent {
    fn merge(&mut self, tile: &Tile) {
        let bounds = tile.bounds();

        self.max_north = Some(self.max_north.map_or(bounds.max_north, |v| v.max(bounds.max_north)));
        self.min_north = Some(self.min_north.map_or(bounds.min_north, |v| v.min(bounds.min_north)));
        self.max_west = Some(extend_west(self.max_west, bounds.max_west, true));
        self.min_west = Some(extend_west(self.min_west, bounds.min_west, false));

        let lo = tile.min_elevation();
        self.min_elevation = Some(self.min_elevation.map_or(lo, |v| v.min(lo)));
        if !tile.is_sea_level() {
            let hi = tile.max_elevation();
            self.max_elevation = Some(self.max_elevation.map_or(hi, |v| v.max(hi)));
        }
    }
}

/// Extend a west bound, honouring the 0/360 seam.
///
/// Values less than 180 degrees apart compare normally. Further apart, the
/// new value lies on the far side of the seam and the preferred direction
/// flips.
fn extend_west(current: Option<i32>, value: i32, prefer_larger: bool) -> i32 {
    let Some(current) = current else {
        return value;
    };
    let larger = if (value - current).abs() < 180 {
        prefer_larger
    } else {
        !prefer_larger
    };
    if larger {
        current.max(value)
    } else {
        current.min(value)
    }
}

/// Fixed-capacity collection of terrain tiles.
///
/// Slots are filled in order and never evicted. Once every slot is taken,
/// requests for new regions are turned away rather than replacing a tile.
///
/// Tiles enter the store through [`TileLoader`](crate::TileLoader) and
/// [`Resolver`](crate::Resolver).
///
/// # Example
///
/// ```
/// use rfmap_dem::{MaxPages, Outcome, Resolver, SlotOutcome, TerrainConfig, TileBounds, TileStore};
///
/// let dir = tempfile::tempdir()?;
/// let config = TerrainConfig {
///     max_pages: MaxPages::new(4)?,
///     sdf_path: Some(dir.path().to_path_buf()),
///     ..TerrainConfig::default()
/// };
/// let mut store = TileStore::new(config.max_pages, 4);
/// let bounds = TileBounds::new(47, 48, 122, 123);
/// assert_eq!(store.find_slot_for(bounds), SlotOutcome::Empty(0));
///
/// // No file in the tile directory, so the region is filled as sea level.
/// let outcome = Resolver::new(&config).resolve(&mut store, bounds);
/// assert_eq!(outcome, Outcome::SyntheticSeaLevel);
/// assert_eq!(store.find_slot_for(bounds), SlotOutcome::AlreadyPresent(0));
/// assert_eq!(store.elevation_at(47.5, 122.5), Some(0));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct TileStore {
    capacity: MaxPages,
    resolution: usize,
    slots: Vec<Option<Tile>>,
    extent: Extent,
}

impl TileStore {
    /// Create an empty store.
    pub fn new(capacity: MaxPages, resolution: usize) -> Self {
        Self {
            capacity,
            resolution,
            slots: (0..capacity.get()).map(|_| None).collect(),
            extent: Extent::default(),
        }
    }

    /// Create an empty store sized by a run configuration.
    pub fn from_config(config: &TerrainConfig) -> Self {
        Self::new(config.max_pages, config.resolution())
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Points per degree of every tile in this store.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Whether no tile has been loaded yet.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Whether every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Decide where a tile with `bounds` would go.
    pub fn find_slot_for(&self, bounds: TileBounds) -> SlotOutcome {
        if let Some(slot) = self
            .slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|t| t.bounds() == bounds))
        {
            return SlotOutcome::AlreadyPresent(slot);
        }
        match self.slots.iter().position(Option::is_none) {
            Some(slot) => SlotOutcome::Empty(slot),
            None => SlotOutcome::Full,
        }
    }

    /// Fold a tile's bounds and elevation extrema into the store aggregates.
    pub fn merge_bounds(&mut self, tile: &Tile) {
        self.extent.merge(tile);
    }

    /// Place a freshly loaded tile in an empty slot and merge its bounds.
    ///
    /// Callers obtain `slot` from [`find_slot_for`](Self::find_slot_for)
    /// and insert before touching the store again.
    pub(crate) fn insert(&mut self, slot: usize, tile: Tile) -> &Tile {
        debug_assert!(self.slots[slot].is_none(), "slot {} is already occupied", slot);
        self.extent.merge(&tile);
        self.slots[slot].insert(tile)
    }

    /// Tile in a slot, if loaded.
    pub fn tile(&self, slot: usize) -> Option<&Tile> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Mutable tile in a slot, if loaded.
    pub fn tile_mut(&mut self, slot: usize) -> Option<&mut Tile> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Bounds of a slot, with [`EMPTY_SLOT_BOUNDS`] for an unoccupied one.
    pub fn slot_bounds(&self, slot: usize) -> Option<TileBounds> {
        self.slots
            .get(slot)
            .map(|s| s.as_ref().map_or(EMPTY_SLOT_BOUNDS, Tile::bounds))
    }

    /// Iterate loaded tiles in slot order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.slots.iter().flatten()
    }

    /// Iterate loaded tiles mutably, e.g. to split their planes across
    /// worker threads.
    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.slots.iter_mut().flatten()
    }

    /// Find the tile covering `(lat, west)` and the pixel holding it.
    pub fn find(&self, lat: f64, west: f64) -> Option<TileLocation<'_>> {
        self.slots.iter().enumerate().find_map(|(slot, s)| {
            let tile = s.as_ref()?;
            let (x, y) = tile.pixel_for(lat, west)?;
            Some(TileLocation { slot, tile, x, y })
        })
    }

    /// Mutable counterpart of [`find`](Self::find).
    pub fn find_mut(&mut self, lat: f64, west: f64) -> Option<(&mut Tile, usize, usize)> {
        self.slots.iter_mut().flatten().find_map(|tile| {
            let (x, y) = tile.pixel_for(lat, west)?;
            Some((tile, x, y))
        })
    }

    /// Elevation in meters at a point.
    pub fn elevation_at(&self, lat: f64, west: f64) -> Option<i16> {
        let loc = self.find(lat, west)?;
        loc.tile.elevation(loc.x, loc.y)
    }

    /// Signal value at a point.
    pub fn signal_at(&self, lat: f64, west: f64) -> Option<u8> {
        let loc = self.find(lat, west)?;
        loc.tile.signal(loc.x, loc.y)
    }

    /// Store a signal value at a point, returning it.
    pub fn put_signal(&mut self, lat: f64, west: f64, value: u8) -> Option<u8> {
        let (tile, x, y) = self.find_mut(lat, west)?;
        let cell = tile.signal_grid_mut().get_mut(x, y)?;
        *cell = value;
        Some(value)
    }

    /// Mask bits at a point.
    pub fn mask_at(&self, lat: f64, west: f64) -> Option<u8> {
        let loc = self.find(lat, west)?;
        loc.tile.mask(loc.x, loc.y)
    }

    /// Store `value` in the upper five mask bits, keeping the lower three
    /// flag bits. Returns the stored value.
    pub fn put_mask(&mut self, lat: f64, west: f64, value: u8) -> Option<u8> {
        let (tile, x, y) = self.find_mut(lat, west)?;
        let cell = tile.mask_grid_mut().get_mut(x, y)?;
        *cell = (*cell & 0x07) | (value << 3);
        Some(*cell >> 3)
    }

    /// Set mask bits at a point, returning the resulting mask.
    pub fn or_mask(&mut self, lat: f64, west: f64, bits: u8) -> Option<u8> {
        let (tile, x, y) = self.find_mut(lat, west)?;
        let cell = tile.mask_grid_mut().get_mut(x, y)?;
        *cell |= bits;
        Some(*cell)
    }

    /// Northern edge of everything loaded, or -90 before the first load.
    pub fn max_north(&self) -> i32 {
        self.extent.max_north.unwrap_or(-90)
    }

    /// Southern edge of everything loaded, or 90 before the first load.
    pub fn min_north(&self) -> i32 {
        self.extent.min_north.unwrap_or(90)
    }

    /// Western edge of everything loaded, or -1 before the first load.
    pub fn max_west(&self) -> i32 {
        self.extent.max_west.unwrap_or(-1)
    }

    /// Eastern edge of everything loaded, or 360 before the first load.
    pub fn min_west(&self) -> i32 {
        self.extent.min_west.unwrap_or(360)
    }

    /// Lowest elevation loaded so far.
    pub fn min_elevation(&self) -> Option<i16> {
        self.extent.min_elevation
    }

    /// Highest elevation loaded so far.
    pub fn max_elevation(&self) -> Option<i16> {
        self.extent.max_elevation
    }

    /// Bounding box of everything loaded, or `None` before the first load.
    pub fn aggregate_bounds(&self) -> Option<TileBounds> {
        let e = &self.extent;
        Some(TileBounds::new(e.min_north?, e.max_north?, e.min_west?, e.max_west?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn store(pages: u32) -> TileStore {
        TileStore::new(MaxPages::new(pages).unwrap(), 4)
    }

    fn tile_with(bounds: TileBounds, min: i16, max: i16) -> Tile {
        let mut grid = Grid::new(4);
        grid.set(0, 0, min).unwrap();
        grid.set(3, 3, max).unwrap();
        Tile::from_elevation(bounds, grid)
    }

    #[test]
    fn test_empty_store_sentinels() {
        let store = store(4);
        assert!(store.is_empty());
        assert_eq!(store.max_north(), -90);
        assert_eq!(store.min_north(), 90);
        assert_eq!(store.max_west(), -1);
        assert_eq!(store.min_west(), 360);
        assert_eq!(store.min_elevation(), None);
        assert_eq!(store.aggregate_bounds(), None);
        assert_eq!(store.slot_bounds(3), Some(EMPTY_SLOT_BOUNDS));
        assert_eq!(store.slot_bounds(4), None);
    }

    #[test]
    fn test_find_slot_for() {
        let mut store = store(4);
        for (i, lat) in (40..44).enumerate() {
            let bounds = TileBounds::cell(lat, 100);
            assert_eq!(store.find_slot_for(bounds), SlotOutcome::Empty(i));
            store.insert(i, Tile::sea_level(bounds, 4));
        }
        assert!(store.is_full());
        assert_eq!(store.find_slot_for(TileBounds::cell(42, 100)), SlotOutcome::AlreadyPresent(2));
        assert_eq!(store.find_slot_for(TileBounds::cell(50, 100)), SlotOutcome::Full);
    }

    #[test]
    fn test_merge_north_and_elevation() {
        let mut store = store(4);
        store.insert(0, tile_with(TileBounds::cell(40, 100), -5, 300));
        store.insert(1, tile_with(TileBounds::cell(38, 100), 10, 1200));

        assert_eq!(store.min_north(), 38);
        assert_eq!(store.max_north(), 41);
        assert_eq!(store.min_elevation(), Some(-5));
        assert_eq!(store.max_elevation(), Some(1200));
    }

    #[test]
    fn test_sea_level_never_raises_max_elevation() {
        let mut below: Grid<i16> = Grid::new(4);
        below.as_mut_slice().fill(-3);
        below.set(1, 2, -50).unwrap();

        let mut below_sea = store(4);
        below_sea.insert(0, Tile::from_elevation(TileBounds::cell(40, 100), below));
        below_sea.insert(1, Tile::sea_level(TileBounds::cell(41, 100), 4));
        assert_eq!(below_sea.min_elevation(), Some(-50));
        assert_eq!(below_sea.max_elevation(), Some(-3));

        let mut hills: Grid<i16> = Grid::new(4);
        hills.as_mut_slice().fill(20);
        hills.set(3, 3, 80).unwrap();

        let mut coast = store(4);
        coast.insert(0, Tile::from_elevation(TileBounds::cell(40, 100), hills));
        assert_eq!(coast.min_elevation(), Some(20));
        coast.insert(1, Tile::sea_level(TileBounds::cell(41, 100), 4));
        assert_eq!(coast.min_elevation(), Some(0));
        assert_eq!(coast.max_elevation(), Some(80));

        let mut only_water = store(4);
        only_water.insert(0, Tile::sea_level(TileBounds::cell(0, 0), 4));
        assert_eq!(only_water.min_elevation(), Some(0));
        assert_eq!(only_water.max_elevation(), None);
    }

    #[test]
    fn test_non_finite_point_finds_nothing() {
        let mut store = store(4);
        store.insert(0, Tile::sea_level(TileBounds::new(0, 1, 0, 1), 4));
        assert!(store.find(0.5, 0.5).is_some());
        assert!(store.find(f64::NAN, 0.5).is_none());
        assert!(store.find(0.5, f64::NAN).is_none());
        assert_eq!(store.elevation_at(f64::NAN, 0.5), None);
        assert_eq!(store.put_signal(f64::NAN, 0.5, 9), None);
        assert_eq!(store.or_mask(f64::INFINITY, 0.5, 1), None);
        assert!(store.tile(0).unwrap().signal_grid().as_slice().iter().all(|&v| v == 0));
        assert!(store.tile(0).unwrap().mask_grid().as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_merge_west_across_seam_keeps_near_side() {
        let mut store = store(4);
        store.merge_bounds(&Tile::sea_level(TileBounds::new(0, 1, 9, 10), 4));
        store.merge_bounds(&Tile::sea_level(TileBounds::new(0, 1, 349, 350), 4));

        // 350 is behind the seam relative to 10.
        assert_eq!(store.max_west(), 10);
        // 349 is east of 9 across the seam.
        assert_eq!(store.min_west(), 349);
    }

    #[test]
    fn test_merge_west_normal() {
        let mut store = store(4);
        store.merge_bounds(&Tile::sea_level(TileBounds::cell(0, 100), 4));
        store.merge_bounds(&Tile::sea_level(TileBounds::cell(0, 103), 4));
        store.merge_bounds(&Tile::sea_level(TileBounds::cell(0, 98), 4));
        assert_eq!(store.min_west(), 98);
        assert_eq!(store.max_west(), 104);
    }

    #[test]
    fn test_extend_west() {
        assert_eq!(extend_west(None, 200, true), 200);
        assert_eq!(extend_west(Some(10), 350, true), 10);
        assert_eq!(extend_west(Some(350), 10, true), 10);
        assert_eq!(extend_west(Some(10), 350, false), 350);
        assert_eq!(extend_west(Some(120), 121, true), 121);
        assert_eq!(extend_west(Some(120), 119, false), 119);
    }

    #[test]
    fn test_find_and_accessors() {
        let mut store = store(4);
        store.insert(0, tile_with(TileBounds::new(47, 48, 122, 123), 7, 99));
        store.insert(1, Tile::sea_level(TileBounds::new(47, 48, 121, 122), 4));

        let loc = store.find(47.0, 123.0).unwrap();
        assert_eq!((loc.slot, loc.x, loc.y), (0, 0, 3));
        assert_eq!(store.elevation_at(47.75, 123.0), Some(99));
        assert_eq!(store.elevation_at(47.75, 122.25), Some(0));
        assert_eq!(store.find(47.5, 121.5).unwrap().slot, 1);
        assert!(store.find(49.5, 122.5).is_none());
        assert!(store.find(47.5, 125.5).is_none());

        assert_eq!(store.put_signal(47.5, 122.5, 77), Some(77));
        assert_eq!(store.signal_at(47.5, 122.5), Some(77));
        assert_eq!(store.put_signal(10.0, 10.0, 1), None);

        assert_eq!(store.or_mask(47.5, 122.5, 0b001), Some(0b001));
        assert_eq!(store.put_mask(47.5, 122.5, 5), Some(5));
        assert_eq!(store.mask_at(47.5, 122.5), Some((5 << 3) | 0b001));
        assert_eq!(store.or_mask(47.5, 122.5, 0b100), Some((5 << 3) | 0b101));
        assert_eq!(store.mask_at(0.0, 0.0), None);
    }
}
