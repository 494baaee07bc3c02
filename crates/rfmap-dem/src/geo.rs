//! Longitude arithmetic and one-degree region planning.
//!
//! Longitudes throughout this crate are degrees *west* in `[0, 360)`, so the
//! seam sits between 359 and 0 and every comparison across it has to go
//! through [`lon_diff`].

use crate::tile::TileBounds;

/// Signed difference `a - b` between two west longitudes, folded so that
/// the short way around the globe is taken.
pub fn lon_diff(a: f64, b: f64) -> f64 {
    let mut diff = a - b;
    if diff <= -180.0 {
        diff += 360.0;
    }
    if diff >= 180.0 {
        diff -= 360.0;
    }
    diff
}

/// Fold an integer angle into `[0, 180]`.
pub fn reduce_angle(angle: i32) -> i32 {
    let a = angle.rem_euclid(360);
    if a > 180 {
        360 - a
    } else {
        a
    }
}

/// Normalize an integer west longitude into `[0, 360)`.
pub fn normalize_west(west: i32) -> i32 {
    west.rem_euclid(360)
}

/// Latitude beyond which longitude ranges stop growing with `1/cos(lat)`.
const MAX_SCALING_LATITUDE: f64 = 70.0;

/// A rectangle of whole-degree cells to load.
///
/// `min_north..=max_north` are the southern edges of the rows to load and
/// `min_west`/`max_west` the eastern edges of the outermost columns, so a
/// region with all four values equal covers exactly one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Southern edge of the southernmost row.
    pub min_north: i32,
    /// Southern edge of the northernmost row.
    pub max_north: i32,
    /// Eastern edge of the easternmost column.
    pub min_west: i32,
    /// Eastern edge of the westernmost column.
    pub max_west: i32,
}

impl Region {
    /// The single cell containing a point.
    pub fn around(lat: f64, west: f64) -> Self {
        let lat = lat.floor() as i32;
        let west = normalize_west(west.floor() as i32);
        Self {
            min_north: lat,
            max_north: lat,
            min_west: west,
            max_west: west,
        }
    }

    /// Smallest region covering every `(lat, west)` point, or `None` when
    /// no points are given.
    pub fn covering(points: &[(f64, f64)]) -> Option<Self> {
        let (&(lat, west), rest) = points.split_first()?;
        let mut region = Self::around(lat, west);
        for &(lat, west) in rest {
            region.include(lat, west);
        }
        Some(region)
    }

    /// Widen the region so it contains the cell holding `(lat, west)`.
    pub fn include(&mut self, lat: f64, west: f64) {
        let lat = lat.floor() as i32;
        let west = normalize_west(west.floor() as i32);
        self.extend(lat, lat, west, west);
    }

    /// Widen the region by `deg_range` degrees around a site.
    ///
    /// The longitude range is stretched by `1/cos(lat)` so the area stays
    /// roughly square on the ground, and both ranges are capped at
    /// `deg_limit` so the request fits the store's page count.
    pub fn extend_for_range(&mut self, lat: f64, west: f64, deg_range: f64, deg_limit: f64) {
        let scaling_lat = if lat.abs() < MAX_SCALING_LATITUDE {
            lat
        } else {
            MAX_SCALING_LATITUDE
        };
        let deg_range_lon = (deg_range / scaling_lat.to_radians().cos()).min(deg_limit);
        let deg_range = deg_range.min(deg_limit);

        let north_min = (lat - deg_range).floor() as i32;
        let north_max = (lat + deg_range).floor() as i32;
        let west_min = normalize_west((west - deg_range_lon).floor() as i32);
        let west_max = normalize_west((west + deg_range_lon).floor() as i32);

        self.extend(north_min, north_max, west_min, west_max);
    }

    fn extend(&mut self, north_min: i32, north_max: i32, west_min: i32, west_max: i32) {
        self.min_north = self.min_north.min(north_min);
        self.max_north = self.max_north.max(north_max);
        if lon_diff(west_min as f64, self.min_west as f64) < 0.0 {
            self.min_west = west_min;
        }
        if lon_diff(west_max as f64, self.max_west as f64) >= 0.0 {
            self.max_west = west_max;
        }
    }

    /// Every one-degree tile in the region, column by column.
    ///
    /// Columns are counted from `min_west` unless the raw span exceeds 180
    /// degrees, in which case the region straddles the seam and columns are
    /// counted from `max_west` instead.
    pub fn cells(&self) -> Vec<TileBounds> {
        let span = self.max_west - self.min_west;
        let width = reduce_angle(span);
        let start = if span <= 180 { self.min_west } else { self.max_west };

        let mut cells = Vec::new();
        for column in 0..=width {
            let west = normalize_west(start + column);
            for lat in self.min_north..=self.max_north {
                cells.push(TileBounds::cell(lat, west));
            }
        }
        cells
    }
}
