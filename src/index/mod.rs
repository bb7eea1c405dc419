//! Index handles.
//!
//! Every backend is the same generic [`CoveringIndex`] parameterised by its
//! covering strategy; [`SpatialIndex`] is the object-safe face used when the
//! backend is picked at runtime.
//!
//! ```rust
//! use geocell::prelude::*;
//!
//! let mut source = MemorySource::new();
//! source.push(1, BoundingBox::new(0.0, 0.0, 1.0, 1.0));
//! source.push(2, BoundingBox::new(5.0, 5.0, 6.0, 6.0));
//!
//! let mut index = H3Index::h3(5)?;
//! index.build(&source)?;
//!
//! let hits = index.query(&BoundingBox::new(0.0, 0.0, 2.0, 2.0), &QueryOptions::default())?;
//! assert_eq!(hits.len(), 1);
//! # Ok::<(), geocell::GeocellError>(())
//! ```

pub mod bounds;
pub mod cells;
pub mod snapshot;
#[cfg(feature = "sync")]
pub mod sync;

use crate::compute::covering::{
    CellScope, CoveringStrategy, GridStepCovering, HexagonalCovering, SphericalCovering,
    TreeOnlyCovering,
};
use crate::compute::query::{self, QueryResult};
use crate::config::QueryOptions;
use crate::error::{GeocellError, Result};
use crate::source::FeatureSource;
use crate::storage::{load_snapshot, save_snapshot};
use geocell_types::bbox::BoundingBox;
use geocell_types::config::StrategyKind;
use geocell_types::feature::FeatureId;
use rustc_hash::FxHashSet;
use snapshot::{BuildStats, IndexSnapshot};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Common interface of all index backends.
pub trait SpatialIndex: Send + Sync {
    /// Covering strategy this backend indexes with.
    fn kind(&self) -> StrategyKind;

    /// Resolution every build and query of this backend uses.
    fn resolution(&self) -> u8;

    /// Build from `source`, replacing any current snapshot only on success.
    fn build(&mut self, source: &dyn FeatureSource) -> Result<BuildStats>;

    /// Run a query and report how the candidates were narrowed.
    ///
    /// Fails with `NotBuilt` before the first successful build or load.
    fn query_with_stats(&self, bbox: &BoundingBox, options: &QueryOptions) -> Result<QueryResult>;

    /// Ids of features whose bounding box overlaps `bbox` (with the default
    /// exact refinement), in no particular order.
    fn query(&self, bbox: &BoundingBox, options: &QueryOptions) -> Result<FxHashSet<FeatureId>> {
        Ok(self.query_with_stats(bbox, options)?.ids)
    }

    /// Replace the current snapshot with one read from `path`.
    fn load(&mut self, path: &Path) -> Result<()>;

    /// Write the current snapshot to `path`.
    fn save(&self, path: &Path) -> Result<()>;

    /// The snapshot queries currently run against.
    fn snapshot(&self) -> Option<Arc<IndexSnapshot>>;

    fn is_built(&self) -> bool {
        self.snapshot().is_some()
    }
}

/// An index backed by covering strategy `S`.
pub struct CoveringIndex<S> {
    strategy: S,
    resolution: u8,
    build_tree: bool,
    snapshot_path: Option<PathBuf>,
    snapshot: Option<Arc<IndexSnapshot>>,
}

/// Geohash strings at a fixed precision.
pub type GeohashIndex = CoveringIndex<GridStepCovering>;
/// H3 cells at a fixed resolution.
pub type H3Index = CoveringIndex<HexagonalCovering>;
/// S2 cells at a fixed level.
pub type S2Index = CoveringIndex<SphericalCovering>;
/// No cells, the R-tree alone.
pub type RTreeIndex = CoveringIndex<TreeOnlyCovering>;

impl<S: CoveringStrategy> CoveringIndex<S> {
    /// Create an empty index. Fails if `resolution` is invalid for the
    /// strategy.
    pub fn new(strategy: S, resolution: u8) -> Result<Self> {
        strategy.validate_resolution(resolution)?;
        Ok(Self {
            strategy,
            resolution,
            build_tree: true,
            snapshot_path: None,
            snapshot: None,
        })
    }

    /// Whether builds also produce the secondary R-tree. Ignored for the
    /// tree-only strategy, which always builds it.
    pub fn with_build_tree(mut self, build_tree: bool) -> Self {
        self.build_tree = build_tree;
        self
    }

    /// Save every successful build to `path`.
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// The covering strategy, with whatever limits it was configured with.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Strategy kind and resolution a snapshot must carry to be served here.
    pub fn scope(&self) -> CellScope {
        CellScope::new(self.strategy.kind(), self.resolution)
    }

    pub fn build_tree(&self) -> bool {
        self.build_tree
    }

    /// Where successful builds are saved, if anywhere.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Install an already built snapshot. Its scope must match this index.
    pub fn set_snapshot(&mut self, snapshot: Arc<IndexSnapshot>) -> Result<()> {
        check_snapshot_scope(self.scope(), &snapshot)?;
        self.snapshot = Some(snapshot);
        Ok(())
    }

    #[cfg(feature = "sync")]
    pub(crate) fn into_parts(self) -> (S, u8, bool, Option<PathBuf>, Option<Arc<IndexSnapshot>>) {
        (
            self.strategy,
            self.resolution,
            self.build_tree,
            self.snapshot_path,
            self.snapshot,
        )
    }
}

impl GeohashIndex {
    /// Geohash index at `precision` characters, 1 to 12.
    pub fn geohash(precision: u8) -> Result<Self> {
        Self::new(GridStepCovering::new(), precision)
    }
}

impl H3Index {
    /// H3 index at `resolution`, 0 to 15.
    pub fn h3(resolution: u8) -> Result<Self> {
        Self::new(HexagonalCovering::new(), resolution)
    }
}

impl S2Index {
    /// S2 index at `level`, 0 to 30.
    pub fn s2(level: u8) -> Result<Self> {
        Self::new(SphericalCovering::new(), level)
    }
}

impl RTreeIndex {
    pub fn rtree() -> Result<Self> {
        Self::new(TreeOnlyCovering, 0)
    }
}

pub(crate) fn check_snapshot_scope(expected: CellScope, snapshot: &IndexSnapshot) -> Result<()> {
    if snapshot.scope() != expected {
        return Err(GeocellError::ResolutionMismatch {
            expected,
            found: snapshot.scope(),
        });
    }
    Ok(())
}

impl<S: CoveringStrategy> SpatialIndex for CoveringIndex<S> {
    fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    fn resolution(&self) -> u8 {
        self.resolution
    }

    fn build(&mut self, source: &dyn FeatureSource) -> Result<BuildStats> {
        let (snapshot, stats) =
            IndexSnapshot::build(&self.strategy, self.resolution, self.build_tree, source)?;
        let snapshot = Arc::new(snapshot);
        self.snapshot = Some(Arc::clone(&snapshot));

        if let Some(path) = &self.snapshot_path {
            save_snapshot(&snapshot, path)?;
        }
        Ok(stats)
    }

    fn query_with_stats(&self, bbox: &BoundingBox, options: &QueryOptions) -> Result<QueryResult> {
        let snapshot = self
            .snapshot
            .as_ref()
            .ok_or(GeocellError::NotBuilt(self.strategy.kind()))?;
        query::execute(&self.strategy, snapshot, bbox, options)
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        let snapshot = load_snapshot(path)?;
        self.set_snapshot(Arc::new(snapshot))
    }

    fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self
            .snapshot
            .as_ref()
            .ok_or(GeocellError::NotBuilt(self.strategy.kind()))?;
        save_snapshot(snapshot, path)
    }

    fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.snapshot.clone()
    }
}
