//! Loading SDF tile files into a [`TileStore`].
//!
//! An SDF file is text: four header lines giving the tile edges, then
//! `resolution * resolution` elevations in row-major order. The same text is
//! accepted plain or wrapped in bzip2; [`TileLoader`] is parameterized by the
//! [`Container`] and parses both through [`TileSource`].

use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::TerrainConfig;
use crate::grid::Grid;
use crate::source::{Container, TileSource};
use crate::store::{SlotOutcome, TileStore};
use crate::tile::{Tile, TileBounds};

/// Result of asking one loader for a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadResult {
    /// A tile with these bounds was already in the store and was left as is.
    AlreadyLoaded,
    /// The tile was read and stored.
    Loaded,
    /// The store had no free slot.
    NoCapacity,
    /// No file for this tile exists in this container.
    NotFound,
}

impl LoadResult {
    /// Whether the store now holds the tile.
    pub fn is_present(self) -> bool {
        matches!(self, LoadResult::Loaded | LoadResult::AlreadyLoaded)
    }
}

/// Reads tiles of one container format.
#[derive(Debug, Clone, Copy)]
pub struct TileLoader<'a> {
    config: &'a TerrainConfig,
    container: Container,
}

impl<'a> TileLoader<'a> {
    /// Loader for a given container.
    pub fn new(config: &'a TerrainConfig, container: Container) -> Self {
        Self { config, container }
    }

    /// Loader for uncompressed `.sdf` files.
    pub fn plain(config: &'a TerrainConfig) -> Self {
        Self::new(config, Container::Plain)
    }

    /// Loader for bzip2-compressed files.
    pub fn compressed(config: &'a TerrainConfig) -> Self {
        Self::new(config, Container::Bzip2)
    }

    /// Container this loader reads.
    pub fn container(&self) -> Container {
        self.container
    }

    /// File name of the tile with `bounds` in this container.
    pub fn file_name(&self, bounds: TileBounds) -> String {
        format!(
            "{}{}",
            bounds.file_stem(&self.config.delimiter, self.config.hd_mode),
            self.container.suffix(self.config)
        )
    }

    /// Load the tile with `bounds` into `store`.
    ///
    /// The working directory is searched before the configured tile
    /// directory. Content problems never fail the load: a short file keeps
    /// whatever was read and leaves the rest at zero.
    pub fn load(&self, store: &mut TileStore, bounds: TileBounds) -> LoadResult {
        let slot = match store.find_slot_for(bounds) {
            SlotOutcome::AlreadyPresent(_) => return LoadResult::AlreadyLoaded,
            SlotOutcome::Full => return LoadResult::NoCapacity,
            SlotOutcome::Empty(slot) => slot,
        };

        let file_name = self.file_name(bounds);
        let Some((path, mut source)) = self.open(&file_name) else {
            debug!(file = %file_name, container = %self.container, "tile file not found");
            return LoadResult::NotFound;
        };

        info!("Loading \"{}\" into page {}", path.display(), slot + 1);

        let parsed = parse_tile(&mut *source, bounds, store.resolution());
        let expected = store.resolution() * store.resolution();
        if parsed.values_read < expected {
            warn!(
                "{} ended after {} of {} elevations; remaining points are 0",
                path.display(),
                parsed.values_read,
                expected
            );
        }

        let header_bounds = parsed.tile.bounds();
        if header_bounds != bounds {
            warn!(?bounds, ?header_bounds, "{} header disagrees with its name", path.display());
            if let SlotOutcome::AlreadyPresent(_) = store.find_slot_for(header_bounds) {
                return LoadResult::AlreadyLoaded;
            }
        }

        store.insert(slot, parsed.tile);
        LoadResult::Loaded
    }

    fn open(&self, file_name: &str) -> Option<(PathBuf, Box<dyn TileSource>)> {
        let local = PathBuf::from(file_name);
        if let Ok(source) = self.container.open(&local) {
            return Some((local, source));
        }
        let dir = self.config.sdf_path.as_deref()?;
        let path = dir.join(file_name);
        match self.container.open(&path) {
            Ok(source) => Some((path, source)),
            Err(_) => None,
        }
    }
}

/// A tile parsed from a source, plus how many elevations were present.
#[derive(Debug)]
pub struct ParsedTile {
    /// The tile, with bounds taken from the header.
    pub tile: Tile,
    /// Number of elevation values read before the source ran out.
    pub values_read: usize,
}

/// Parse SDF text into a tile.
///
/// Header lines may carry a `;` comment. A header line without a number
/// keeps the corresponding edge from `requested`. Elevation tokens that are
/// not numbers read as their leading integer, or 0.
pub fn parse_tile<S: TileSource + ?Sized>(
    source: &mut S,
    requested: TileBounds,
    resolution: usize,
) -> ParsedTile {
    let mut header = |fallback: i32| {
        read_line(&mut *source)
            .and_then(|line| leading_int(strip_comment(&line)))
            .map_or(fallback, saturate_i32)
    };
    let max_west = header(requested.max_west);
    let min_north = header(requested.min_north);
    let min_west = header(requested.min_west);
    let max_north = header(requested.max_north);
    let bounds = TileBounds::new(min_north, max_north, min_west, max_west);

    let mut elevation = Grid::new(resolution);
    let mut min = i16::MAX;
    let mut max = i16::MIN;
    let mut values_read = 0;

    let tokens = Tokens::new(source);
    for (cell, token) in elevation.as_mut_slice().iter_mut().zip(tokens) {
        let value = leading_int(&token).map_or(0, saturate_i16);
        *cell = value;
        min = min.min(value);
        max = max.max(value);
        values_read += 1;
    }

    if values_read == 0 {
        min = 0;
        max = 0;
    }

    ParsedTile {
        tile: Tile::with_extrema(bounds, elevation, min, max),
        values_read,
    }
}

/// Whitespace-separated tokens across the lines of a source.
struct Tokens<'a, S: ?Sized> {
    source: &'a mut S,
    pending: std::vec::IntoIter<String>,
}

impl<'a, S: TileSource + ?Sized> Tokens<'a, S> {
    fn new(source: &'a mut S) -> Self {
        Self {
            source,
            pending: Vec::new().into_iter(),
        }
    }
}

impl<S: TileSource + ?Sized> Iterator for Tokens<'_, S> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(token) = self.pending.next() {
                return Some(token);
            }
            let line = read_line(&mut *self.source)?;
            self.pending = line
                .split_whitespace()
                .map(str::to_owned)
                .collect::<Vec<_>>()
                .into_iter();
        }
    }
}

/// Next whole line of a source.
///
/// A source may hand out a long line in several pieces; they are joined
/// until one ends in a newline so no number is split across pieces.
fn read_line<S: TileSource + ?Sized>(source: &mut S) -> Option<String> {
    let mut line = source.next_line()?;
    while !line.ends_with('\n') {
        match source.next_line() {
            Some(more) => line.push_str(&more),
            None => break,
        }
    }
    Some(line)
}

fn strip_comment(line: &str) -> &str {
    line.split(';').next().unwrap_or("")
}

/// Parse the integer at the start of `s`, ignoring leading whitespace and
/// anything after the digits. Overflow saturates.
fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let magnitude = rest[..digits].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

fn saturate_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn saturate_i16(v: i64) -> i16 {
    v.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

/// Render a tile in SDF text form.
///
/// Useful for writing synthetic tiles and fixtures; [`parse_tile`] reads
/// the output back unchanged.
pub fn write_sdf<W: std::io::Write>(out: &mut W, tile: &Tile) -> std::io::Result<()> {
    let b = tile.bounds();
    writeln!(out, "{}", b.max_west)?;
    writeln!(out, "{}", b.min_north)?;
    writeln!(out, "{}", b.min_west)?;
    writeln!(out, "{}", b.max_north)?;
    for value in tile.elevation_grid().as_slice() {
        writeln!(out, "{}", value)?;
    }
    Ok(())
}
