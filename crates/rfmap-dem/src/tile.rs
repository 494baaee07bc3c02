//! Single terrain tile representation.

use crate::geo::{lon_diff, normalize_west};
use crate::grid::Grid;
use crate::Result;

/// Geographic bounds of a tile, in whole degrees.
///
/// Longitudes are degrees west in `[0, 360)`. A standard tile spans one
/// degree in each direction, with `max_west` possibly wrapping to 0 for the
/// column just east of the seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileBounds {
    /// Southern edge.
    pub min_north: i32,
    /// Northern edge.
    pub max_north: i32,
    /// Eastern edge.
    pub min_west: i32,
    /// Western edge.
    pub max_west: i32,
}

impl TileBounds {
    /// Create bounds from explicit edges.
    pub fn new(min_north: i32, max_north: i32, min_west: i32, max_west: i32) -> Self {
        Self {
            min_north,
            max_north,
            min_west,
            max_west,
        }
    }

    /// The one-degree cell whose south-east corner is `(lat, west)`.
    pub fn cell(lat: i32, west: i32) -> Self {
        let west = normalize_west(west);
        Self::new(lat, lat + 1, west, normalize_west(west + 1))
    }

    /// File stem for this tile, e.g. `47_48_122_123` or `47_48_122_123-hd`.
    pub fn file_stem(&self, delimiter: &str, hd_mode: bool) -> String {
        format!(
            "{min_north}{d}{max_north}{d}{min_west}{d}{max_west}{hd}",
            min_north = self.min_north,
            max_north = self.max_north,
            min_west = self.min_west,
            max_west = self.max_west,
            d = delimiter,
            hd = if hd_mode { "-hd" } else { "" },
        )
    }
}

/// One page of terrain: elevation plus the signal and mask planes that the
/// propagation engine fills in later.
#[derive(Debug, Clone)]
pub struct Tile {
    bounds: TileBounds,
    /// Elevation in meters.
    elevation: Grid<i16>,
    /// Path loss or signal level written by the propagation engine.
    signal: Grid<u8>,
    /// Flag bits owned by consumers (transmitter, label, boundary bits).
    mask: Grid<u8>,
    min_elevation: i16,
    max_elevation: i16,
    sea_level: bool,
}

impl Tile {
    /// Build a tile from an elevation grid, computing extrema over every cell.
    pub fn from_elevation(bounds: TileBounds, elevation: Grid<i16>) -> Self {
        let min = elevation.as_slice().iter().copied().min().unwrap_or(0);
        let max = elevation.as_slice().iter().copied().max().unwrap_or(0);
        Self::with_extrema(bounds, elevation, min, max)
    }

    pub(crate) fn with_extrema(bounds: TileBounds, elevation: Grid<i16>, min: i16, max: i16) -> Self {
        let resolution = elevation.resolution();
        Self {
            bounds,
            elevation,
            signal: Grid::new(resolution),
            mask: Grid::new(resolution),
            min_elevation: min,
            max_elevation: max,
            sea_level: false,
        }
    }

    /// A flat tile at sea level, used when no terrain file exists.
    ///
    /// Its own extrema are both 0, but it only ever lowers the store's
    /// minimum: water never raises the store's maximum elevation.
    pub fn sea_level(bounds: TileBounds, resolution: usize) -> Self {
        let mut tile = Self::with_extrema(bounds, Grid::new(resolution), 0, 0);
        tile.sea_level = true;
        tile
    }

    /// Whether this tile was synthesized because no terrain file exists.
    pub fn is_sea_level(&self) -> bool {
        self.sea_level
    }

    /// Geographic bounds of this tile.
    pub fn bounds(&self) -> TileBounds {
        self.bounds
    }

    /// Points per degree.
    pub fn resolution(&self) -> usize {
        self.elevation.resolution()
    }

    /// Lowest elevation seen while loading.
    pub fn min_elevation(&self) -> i16 {
        self.min_elevation
    }

    /// Highest elevation seen while loading.
    pub fn max_elevation(&self) -> i16 {
        self.max_elevation
    }

    /// Pixel holding `(lat, west)`, if the point falls on this tile.
    ///
    /// `x` counts rows north from `min_north`; `y` counts columns west, with
    /// `y = resolution - 1` on the `max_west` meridian. The `max_north` and
    /// `min_west` edges belong to the neighbouring tiles.
    pub fn pixel_for(&self, lat: f64, west: f64) -> Option<(usize, usize)> {
        if !lat.is_finite() || !west.is_finite() {
            return None;
        }
        let res = self.resolution() as f64;
        let max_index = self.resolution() as i64 - 1;

        let x = (res * (lat - self.bounds.min_north as f64)).round_ties_even() as i64;
        let y = max_index
            - (res * lon_diff(self.bounds.max_west as f64, west)).round_ties_even() as i64;

        if (0..=max_index).contains(&x) && (0..=max_index).contains(&y) {
            Some((x as usize, y as usize))
        } else {
            None
        }
    }

    /// Elevation at a pixel.
    pub fn elevation(&self, x: usize, y: usize) -> Option<i16> {
        self.elevation.get(x, y)
    }

    /// Signal value at a pixel.
    pub fn signal(&self, x: usize, y: usize) -> Option<u8> {
        self.signal.get(x, y)
    }

    /// Store a signal value at a pixel.
    pub fn set_signal(&mut self, x: usize, y: usize, value: u8) -> Result<()> {
        self.signal.set(x, y, value)
    }

    /// Mask bits at a pixel.
    pub fn mask(&self, x: usize, y: usize) -> Option<u8> {
        self.mask.get(x, y)
    }

    /// Store mask bits at a pixel.
    pub fn set_mask(&mut self, x: usize, y: usize, value: u8) -> Result<()> {
        self.mask.set(x, y, value)
    }

    /// The elevation plane.
    pub fn elevation_grid(&self) -> &Grid<i16> {
        &self.elevation
    }

    /// The signal plane.
    pub fn signal_grid(&self) -> &Grid<u8> {
        &self.signal
    }

    /// The signal plane, for bulk writes.
    pub fn signal_grid_mut(&mut self) -> &mut Grid<u8> {
        &mut self.signal
    }

    /// The mask plane.
    pub fn mask_grid(&self) -> &Grid<u8> {
        &self.mask
    }

    /// The mask plane, for bulk writes.
    pub fn mask_grid_mut(&mut self) -> &mut Grid<u8> {
        &mut self.mask
    }

    /// Reset the signal and mask planes, leaving elevation untouched.
    pub fn clear_overlays(&mut self) {
        self.signal.clear();
        self.mask.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem() {
        let bounds = TileBounds::new(47, 48, 122, 123);
        assert_eq!(bounds.file_stem("_", false), "47_48_122_123");
        assert_eq!(bounds.file_stem(":", true), "47:48:122:123-hd");
    }

    #[test]
    fn test_cell_wraps_at_seam() {
        let bounds = TileBounds::cell(-3, 359);
        assert_eq!(bounds, TileBounds::new(-3, -2, 359, 0));
    }

    #[test]
    fn test_pixel_for() {
        let tile = Tile::sea_level(TileBounds::new(47, 48, 122, 123), 4);

        // South-west corner is row 0, last column.
        assert_eq!(tile.pixel_for(47.0, 123.0), Some((0, 3)));
        assert_eq!(tile.pixel_for(47.25, 122.5), Some((1, 1)));
        assert_eq!(tile.pixel_for(47.5, 122.25), Some((2, 0)));

        // Northern and eastern edges belong to the neighbouring tiles.
        assert_eq!(tile.pixel_for(48.0, 122.5), None);
        assert_eq!(tile.pixel_for(47.5, 122.0), None);
        assert_eq!(tile.pixel_for(46.5, 122.5), None);
        assert_eq!(tile.pixel_for(47.5, 124.0), None);
    }

    #[test]
    fn test_pixel_for_rejects_non_finite() {
        let tile = Tile::sea_level(TileBounds::new(0, 1, 0, 1), 4);
        assert_eq!(tile.pixel_for(f64::NAN, 0.5), None);
        assert_eq!(tile.pixel_for(0.5, f64::NAN), None);
        assert_eq!(tile.pixel_for(f64::INFINITY, 0.5), None);
        assert_eq!(tile.pixel_for(0.5, f64::NEG_INFINITY), None);
        assert_eq!(tile.pixel_for(0.5, 0.5), Some((2, 1)));
    }

    #[test]
    fn test_pixel_for_across_seam() {
        let tile = Tile::sea_level(TileBounds::cell(10, 359), 4);
        assert_eq!(tile.pixel_for(10.5, 359.5), Some((2, 1)));
        assert_eq!(tile.pixel_for(10.5, 0.5), None);
    }

    #[test]
    fn test_from_elevation_extrema() {
        let mut grid = Grid::new(2);
        grid.set(0, 0, -12).unwrap();
        grid.set(1, 1, 840).unwrap();
        let tile = Tile::from_elevation(TileBounds::new(0, 1, 0, 1), grid);
        assert!(!tile.is_sea_level());
        assert!(Tile::sea_level(TileBounds::new(0, 1, 0, 1), 2).is_sea_level());
        assert_eq!(tile.min_elevation(), -12);
        assert_eq!(tile.max_elevation(), 840);
        assert!(tile.signal_grid().as_slice().iter().all(|&v| v == 0));
        assert!(tile.mask_grid().as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_overlay_planes() {
        let mut tile = Tile::sea_level(TileBounds::new(0, 1, 0, 1), 3);
        tile.set_signal(2, 1, 140).unwrap();
        tile.set_mask(0, 0, 0b1010).unwrap();
        assert_eq!(tile.signal(2, 1), Some(140));
        assert_eq!(tile.mask(0, 0), Some(0b1010));
        assert!(tile.set_signal(3, 0, 1).is_err());

        tile.clear_overlays();
        assert_eq!(tile.signal(2, 1), Some(0));
        assert_eq!(tile.mask(0, 0), Some(0));
    }
}
