//! Error types for the DEM crate.
//!
//! Only configuration and environment problems are errors. A missing tile,
//! a full store, or a short file is reported through the load outcome enums
//! instead, since the rest of the run must continue with degraded terrain.

use thiserror::Error;

/// Errors that can occur when configuring or driving the tile store.
#[derive(Debug, Error)]
pub enum DemError {
    /// I/O error reading a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Page count is not one of the supported square sizes.
    #[error("Invalid page count {0} (must be one of 1, 4, 9, 16, 25, 36, 49, 64)")]
    InvalidMaxPages(u32),

    /// A single page is only large enough for high-definition runs.
    #[error("A page count of 1 requires high-definition mode")]
    MaxPagesRequiresHd,

    /// Any other invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Pixel coordinate is outside the tile grid.
    #[error("Pixel ({x}, {y}) is outside a {resolution}x{resolution} grid")]
    PixelOutOfRange {
        /// Row index.
        x: usize,
        /// Column index.
        y: usize,
        /// Grid side length.
        resolution: usize,
    },
}
