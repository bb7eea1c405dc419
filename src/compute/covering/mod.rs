//! Covering strategies: bounding box + resolution -> set of cell keys.
//!
//! Four interchangeable implementations share the [`CoveringStrategy`] trait:
//!
//! | Strategy | Cell key | Resolution | Exactness |
//! |----------|----------|------------|-----------|
//! | [`GridStepCovering`] | geohash string | 1-12 | lattice-sampled, approximate |
//! | [`HexagonalCovering`] | H3 cell (u64) | 0-15 | every overlapping cell |
//! | [`SphericalCovering`] | S2 cell (u64) | 0-30 | region coverer at one level |
//! | [`TreeOnlyCovering`] | none | 0 | always empty |
//!
//! Keys are only meaningful together with the [`CellScope`] that produced
//! them. Every [`Covering`] carries its scope and the inverted index refuses
//! to look up a covering from a different scope.

mod grid_step;
mod hexagonal;
mod spherical;
mod tree_only;

pub use grid_step::{GridStepCovering, lattice_step};
pub use hexagonal::HexagonalCovering;
pub use spherical::{SphericalCovering, auto_level};
pub use tree_only::TreeOnlyCovering;

use crate::error::{GeocellError, Result};
use geocell_types::bbox::BoundingBox;
use geocell_types::config::StrategyKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;

/// Opaque key of one spatial cell.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CellKey {
    /// Fixed-length string key (geohash)
    Text(String),
    /// 64-bit integer key (H3, S2)
    Int(u64),
}

impl CellKey {
    /// Whether this key variant is the one `kind` produces.
    pub fn matches(&self, kind: StrategyKind) -> bool {
        matches!(
            (self, kind),
            (CellKey::Text(_), StrategyKind::Geohash)
                | (CellKey::Int(_), StrategyKind::H3 | StrategyKind::S2)
        )
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellKey::Text(hash) => f.write_str(hash),
            CellKey::Int(id) => write!(f, "{id:#018x}"),
        }
    }
}

/// The strategy and resolution a set of cell keys belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellScope {
    pub kind: StrategyKind,
    pub resolution: u8,
}

impl CellScope {
    pub fn new(kind: StrategyKind, resolution: u8) -> Self {
        Self { kind, resolution }
    }
}

impl fmt::Display for CellScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind, self.resolution)
    }
}

/// The cells covering one rectangle.
///
/// `cells` are looked up by exact key. `ranges` are inclusive integer key
/// ranges (S2 descendant ranges) looked up by range scan; they are only
/// produced for query cells coarser than the index level.
#[derive(Debug, Clone, PartialEq)]
pub struct Covering {
    scope: CellScope,
    cells: BTreeSet<CellKey>,
    ranges: Vec<(u64, u64)>,
}

impl Covering {
    pub fn new(scope: CellScope, cells: BTreeSet<CellKey>) -> Self {
        Self {
            scope,
            cells,
            ranges: Vec::new(),
        }
    }

    pub fn with_ranges(
        scope: CellScope,
        cells: BTreeSet<CellKey>,
        ranges: Vec<(u64, u64)>,
    ) -> Self {
        Self {
            scope,
            cells,
            ranges,
        }
    }

    pub fn empty(scope: CellScope) -> Self {
        Self::new(scope, BTreeSet::new())
    }

    pub fn scope(&self) -> CellScope {
        self.scope
    }

    pub fn cells(&self) -> &BTreeSet<CellKey> {
        &self.cells
    }

    pub fn ranges(&self) -> &[(u64, u64)] {
        &self.ranges
    }

    /// Number of lookups (keys plus ranges) this covering issues.
    pub fn len(&self) -> usize {
        self.cells.len() + self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.ranges.is_empty()
    }

    pub fn into_cells(self) -> BTreeSet<CellKey> {
        self.cells
    }
}

/// Maps a bounding box to the cells covering it at a given resolution.
///
/// Implementations are deterministic and side-effect free.
pub trait CoveringStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Valid resolutions for this strategy.
    fn resolutions(&self) -> RangeInclusive<u8> {
        self.kind().resolutions()
    }

    fn validate_resolution(&self, resolution: u8) -> Result<()> {
        let range = self.resolutions();
        if range.contains(&resolution) {
            Ok(())
        } else {
            Err(GeocellError::InvalidResolution {
                kind: self.kind(),
                resolution,
                min: *range.start(),
                max: *range.end(),
            })
        }
    }

    /// Cover `bbox` at exactly `resolution`. Used for indexing features.
    fn cover(&self, bbox: &BoundingBox, resolution: u8) -> Result<Covering>;

    /// Cover a query rectangle for an index built at `resolution`.
    fn cover_query(&self, bbox: &BoundingBox, resolution: u8) -> Result<Covering> {
        self.cover(bbox, resolution)
    }
}

impl<S: CoveringStrategy + ?Sized> CoveringStrategy for Box<S> {
    fn kind(&self) -> StrategyKind {
        (**self).kind()
    }

    fn resolutions(&self) -> RangeInclusive<u8> {
        (**self).resolutions()
    }

    fn cover(&self, bbox: &BoundingBox, resolution: u8) -> Result<Covering> {
        (**self).cover(bbox, resolution)
    }

    fn cover_query(&self, bbox: &BoundingBox, resolution: u8) -> Result<Covering> {
        (**self).cover_query(bbox, resolution)
    }
}

/// Fail with `CoveringTooLarge` when a cap is set and `cells` exceeds it.
pub(crate) fn check_limit(cells: usize, limit: Option<usize>) -> Result<()> {
    match limit {
        Some(limit) if cells > limit => Err(GeocellError::CoveringTooLarge { cells, limit }),
        _ => Ok(()),
    }
}

pub(crate) fn check_geographic(bbox: &BoundingBox) -> Result<()> {
    if !bbox.is_finite()
        || bbox.min_x < -180.0
        || bbox.max_x > 180.0
        || bbox.min_y < -90.0
        || bbox.max_y > 90.0
    {
        return Err(GeocellError::InvalidInput(format!(
            "bounding box ({}, {}, {}, {}) is outside the geographic range",
            bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
        )));
    }
    Ok(())
}
