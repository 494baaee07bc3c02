//! Square row-major raster used for every tile plane.

use crate::{DemError, Result};

/// A `resolution x resolution` raster stored in row-major order.
///
/// The outer index `x` varies slowest, matching the order values appear in
/// an SDF file. For terrain planes `x` runs south to north and `y` runs
/// from the eastern edge of the tile towards its western edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    data: Vec<T>,
    resolution: usize,
}

impl<T: Copy + Default> Grid<T> {
    /// Create a grid filled with `T::default()`.
    pub fn new(resolution: usize) -> Self {
        Self {
            data: vec![T::default(); resolution * resolution],
            resolution,
        }
    }

    /// Side length of the grid.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.resolution && y < self.resolution).then(|| x * self.resolution + y)
    }

    /// Read a cell, or `None` if `(x, y)` is outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        self.index(x, y).map(|i| self.data[i])
    }

    /// Write a cell.
    pub fn set(&mut self, x: usize, y: usize, value: T) -> Result<()> {
        let i = self.index(x, y).ok_or(DemError::PixelOutOfRange {
            x,
            y,
            resolution: self.resolution,
        })?;
        self.data[i] = value;
        Ok(())
    }

    /// Mutable access to a cell, or `None` if `(x, y)` is outside the grid.
    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        self.index(x, y).map(move |i| &mut self.data[i])
    }

    /// The whole plane in row-major order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Iterate rows (one per outer index).
    pub fn rows(&self) -> std::slice::Chunks<'_, T> {
        self.data.chunks(self.resolution)
    }

    /// Iterate rows mutably.
    ///
    /// Rows are disjoint borrows, so callers may hand them to separate
    /// worker threads.
    pub fn rows_mut(&mut self) -> std::slice::ChunksMut<'_, T> {
        self.data.chunks_mut(self.resolution)
    }

    /// Reset every cell to `T::default()`.
    pub fn clear(&mut self) {
        self.data.fill(T::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_layout() {
        let mut grid: Grid<i16> = Grid::new(3);
        grid.set(1, 2, 7).unwrap();
        assert_eq!(grid.as_slice()[5], 7);
        assert_eq!(grid.get(1, 2), Some(7));
        assert_eq!(grid.rows().nth(1).unwrap(), &[0, 0, 7]);
    }

    #[test]
    fn test_out_of_range() {
        let mut grid: Grid<u8> = Grid::new(2);
        assert!(grid.get(2, 0).is_none());
        assert!(grid.get(0, 2).is_none());
        assert!(matches!(
            grid.set(0, 5, 1),
            Err(DemError::PixelOutOfRange { x: 0, y: 5, resolution: 2 })
        ));
    }

    #[test]
    fn test_clear() {
        let mut grid: Grid<u8> = Grid::new(2);
        *grid.get_mut(1, 1).unwrap() = 9;
        grid.clear();
        assert!(grid.as_slice().iter().all(|&v| v == 0));
    }
}
