//! Run configuration consumed by the tile store and loaders.

use crate::{DemError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Points per degree in standard mode.
pub const STANDARD_RESOLUTION: usize = 1200;

/// Points per degree in high-definition mode.
pub const HD_RESOLUTION: usize = 3600;

/// Default separator between the four numbers of a tile file name.
pub const DEFAULT_DELIMITER: &str = "_";

/// Default suffix of uncompressed tile files.
pub const DEFAULT_PLAIN_SUFFIX: &str = ".sdf";

/// Default suffix of bzip2-compressed tile files.
pub const DEFAULT_COMPRESSED_SUFFIX: &str = ".sdf.bz";

/// File in the home directory naming the default tile directory.
const SEARCH_PATH_FILE: &str = ".splat_path";

/// Number of tile pages a store holds: a perfect square from 1 to 64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MaxPages(u32);

impl MaxPages {
    /// Every supported page count.
    pub const ALLOWED: [u32; 8] = [1, 4, 9, 16, 25, 36, 49, 64];

    /// Validate a page count.
    pub fn new(pages: u32) -> Result<Self> {
        if Self::ALLOWED.contains(&pages) {
            Ok(Self(pages))
        } else {
            Err(DemError::InvalidMaxPages(pages))
        }
    }

    /// Number of pages.
    pub fn get(self) -> usize {
        self.0 as usize
    }

    /// Side of the square of degrees this many pages can cover.
    pub fn degrees(self) -> u32 {
        match self.0 {
            1 => 1,
            4 => 2,
            9 => 3,
            16 => 4,
            25 => 5,
            36 => 6,
            49 => 7,
            _ => 8,
        }
    }

    /// Largest coverage radius, in degrees, that still fits in the store.
    pub fn deg_limit(self) -> f64 {
        match self.0 {
            1 => 0.125,
            4 => 0.5,
            9 => 1.0,
            16 => 1.5,
            25 => 2.0,
            36 => 2.5,
            49 => 3.0,
            _ => 3.5,
        }
    }
}

impl Default for MaxPages {
    fn default() -> Self {
        Self(16)
    }
}

impl TryFrom<u32> for MaxPages {
    type Error = DemError;

    fn try_from(pages: u32) -> Result<Self> {
        Self::new(pages)
    }
}

impl From<MaxPages> for u32 {
    fn from(pages: MaxPages) -> u32 {
        pages.0
    }
}

/// Configuration for loading terrain tiles.
///
/// # Example
///
/// ```
/// use rfmap_dem::TerrainConfig;
///
/// let config = TerrainConfig::from_yaml_str("max_pages: 4\nsdf_path: /srv/sdf\n")?;
/// assert_eq!(config.resolution(), 1200);
/// assert_eq!(config.max_pages.get(), 4);
/// # Ok::<(), rfmap_dem::DemError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Use 3600 points per degree and `-hd` file names.
    pub hd_mode: bool,
    /// Number of tile pages.
    pub max_pages: MaxPages,
    /// Directory searched after the working directory.
    pub sdf_path: Option<PathBuf>,
    /// Separator between the numbers in a tile file name.
    pub delimiter: String,
    /// Suffix of uncompressed tile files.
    pub plain_suffix: String,
    /// Suffix of bzip2-compressed tile files.
    pub compressed_suffix: String,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            hd_mode: false,
            max_pages: MaxPages::default(),
            sdf_path: None,
            delimiter: DEFAULT_DELIMITER.to_string(),
            plain_suffix: DEFAULT_PLAIN_SUFFIX.to_string(),
            compressed_suffix: DEFAULT_COMPRESSED_SUFFIX.to_string(),
        }
    }
}

impl TerrainConfig {
    /// Parse and validate a YAML configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Check combinations of values that are individually valid.
    pub fn validate(&self) -> Result<()> {
        if self.max_pages.get() == 1 && !self.hd_mode {
            return Err(DemError::MaxPagesRequiresHd);
        }
        if self.delimiter.is_empty() {
            return Err(DemError::InvalidConfig("delimiter must not be empty".into()));
        }
        if self.plain_suffix == self.compressed_suffix {
            return Err(DemError::InvalidConfig(format!(
                "plain and compressed suffixes are both {:?}",
                self.plain_suffix
            )));
        }
        Ok(())
    }

    /// Points per degree for this run.
    pub fn resolution(&self) -> usize {
        if self.hd_mode {
            HD_RESOLUTION
        } else {
            STANDARD_RESOLUTION
        }
    }

    /// Fill in `sdf_path` from `$HOME/.splat_path` when it is unset.
    ///
    /// Only the first line of that file is used. A missing file leaves the
    /// working directory as the only place tiles are searched.
    pub fn with_home_search_path(mut self) -> Self {
        if self.sdf_path.is_none() {
            if let Some(home) = std::env::var_os("HOME") {
                self.sdf_path = read_search_path(&Path::new(&home).join(SEARCH_PATH_FILE));
            }
        }
        self
    }
}

fn read_search_path(file: &Path) -> Option<PathBuf> {
    let contents = std::fs::read_to_string(file).ok()?;
    let line = contents.lines().next()?.trim();
    if line.is_empty() {
        None
    } else {
        Some(PathBuf::from(line))
    }
}
