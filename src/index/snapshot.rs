//! Immutable result of one build pass.

use super::bounds::BoundsStore;
use super::cells::{CellIndexBuilder, InvertedCellIndex};
use crate::compute::covering::{CellScope, CoveringStrategy};
use crate::compute::rtree::RangeIndex;
use crate::error::{GeocellError, Result};
use crate::source::FeatureSource;
use geocell_types::config::StrategyKind;
use geocell_types::feature::FeatureRecord;
use rustc_hash::FxHashSet;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Counters reported by a build pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildStats {
    /// Features the source yielded
    pub features_seen: usize,
    /// Features that made it into the bounds store
    pub features_indexed: usize,
    /// Features without geometry
    pub skipped_missing_geometry: usize,
    /// Features whose bounding box had non-finite coordinates
    pub skipped_invalid_bounds: usize,
    /// Distinct cells in the inverted index
    pub cells: usize,
    /// Total (cell, feature) entries
    pub postings: usize,
    /// Leaves in the R-tree, 0 when no tree was built
    pub tree_entries: usize,
    pub elapsed: Duration,
}

impl BuildStats {
    pub fn skipped(&self) -> usize {
        self.skipped_missing_geometry + self.skipped_invalid_bounds
    }
}

/// Everything a query needs: postings, bounds and the optional R-tree.
///
/// Self-describing: it records the strategy and resolution it was built
/// with, and queries validate against them.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub(crate) cells: InvertedCellIndex,
    pub(crate) bounds: BoundsStore,
    pub(crate) tree: Option<RangeIndex>,
    pub(crate) built_at: u64,
    pub(crate) feature_count: usize,
    pub(crate) skipped: usize,
}

impl IndexSnapshot {
    /// Run one build pass over `source`.
    ///
    /// Nothing is published until the pass completes: a covering error or a
    /// duplicate id aborts the build and the partial postings are dropped.
    /// The R-tree is always built for [`StrategyKind::TreeOnly`].
    pub fn build<S>(
        strategy: &S,
        resolution: u8,
        build_tree: bool,
        source: &dyn FeatureSource,
    ) -> Result<(Self, BuildStats)>
    where
        S: CoveringStrategy + ?Sized,
    {
        let start = Instant::now();
        let kind = strategy.kind();
        strategy.validate_resolution(resolution)?;
        let scope = CellScope::new(kind, resolution);

        let mut builder = CellIndexBuilder::new(scope);
        let mut bounds = BoundsStore::new();
        let mut stats = BuildStats::default();

        for feature in source.features() {
            stats.features_seen += 1;

            let Some(bbox) = feature.bbox else {
                log::debug!("feature {} has no geometry, skipping", feature.id);
                stats.skipped_missing_geometry += 1;
                continue;
            };
            if !bbox.is_finite() {
                log::debug!("feature {} has a non-finite bounding box, skipping", feature.id);
                stats.skipped_invalid_bounds += 1;
                continue;
            }

            if !bounds.insert(FeatureRecord::new(feature.id, bbox)) {
                return Err(GeocellError::DataSource(format!(
                    "duplicate feature id {}",
                    feature.id
                )));
            }
            builder.add(feature.id, strategy.cover(&bbox, resolution)?)?;
        }

        let cells = builder.finish();
        let tree = (build_tree || kind == StrategyKind::TreeOnly)
            .then(|| RangeIndex::from_entries(bounds.iter().map(|r| (r.id, r.bbox))));

        stats.features_indexed = bounds.len();
        stats.cells = cells.len();
        stats.postings = cells.postings();
        stats.tree_entries = tree.as_ref().map_or(0, RangeIndex::len);
        stats.elapsed = start.elapsed();

        log::info!(
            "built {scope} index: {} features, {} cells, {} postings in {:?}",
            stats.features_indexed,
            stats.cells,
            stats.postings,
            stats.elapsed
        );
        if stats.skipped() > 0 {
            log::warn!(
                "{scope} build skipped {} features ({} without geometry, {} with invalid bounds)",
                stats.skipped(),
                stats.skipped_missing_geometry,
                stats.skipped_invalid_bounds
            );
        }

        let snapshot = Self {
            cells,
            bounds,
            tree,
            built_at: unix_now(),
            feature_count: source.feature_count(),
            skipped: stats.skipped(),
        };
        Ok((snapshot, stats))
    }

    pub fn kind(&self) -> StrategyKind {
        self.cells.scope().kind
    }

    pub fn resolution(&self) -> u8 {
        self.cells.scope().resolution
    }

    pub fn scope(&self) -> CellScope {
        self.cells.scope()
    }

    pub fn cells(&self) -> &InvertedCellIndex {
        &self.cells
    }

    pub fn bounds(&self) -> &BoundsStore {
        &self.bounds
    }

    pub fn tree(&self) -> Option<&RangeIndex> {
        self.tree.as_ref()
    }

    /// Unix seconds at which the build pass finished.
    pub fn built_at(&self) -> u64 {
        self.built_at
    }

    /// Total features the source reported, indexed or not.
    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Features the build pass skipped for missing or invalid bounds.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Check the structural invariants a loaded snapshot must satisfy.
    pub fn validate(&self) -> Result<()> {
        let scope = self.scope();
        if !scope.kind.resolutions().contains(&scope.resolution) {
            return Err(format_error(format!(
                "resolution {} is out of range for {}",
                scope.resolution, scope.kind
            )));
        }

        for record in self.bounds.iter() {
            let bbox = record.bbox;
            if !bbox.is_finite() || bbox.min_x > bbox.max_x || bbox.min_y > bbox.max_y {
                return Err(format_error(format!(
                    "feature {} has an invalid bounding box",
                    record.id
                )));
            }
        }

        let mut seen = FxHashSet::default();
        for (key, ids) in self.cells.iter() {
            if !key.matches(scope.kind) {
                return Err(format_error(format!(
                    "cell key {key} is not a {} key",
                    scope.kind
                )));
            }
            if let Some(id) = ids.iter().find(|id| !self.bounds.contains(**id)) {
                return Err(format_error(format!(
                    "cell {key} references unknown feature {id}"
                )));
            }
            seen.clear();
            if let Some(id) = ids.iter().find(|id| !seen.insert(**id)) {
                return Err(format_error(format!("cell {key} lists feature {id} twice")));
            }
        }

        match &self.tree {
            Some(tree) => {
                let mut entries: Vec<_> = tree.entries().collect();
                entries.sort_by_key(|(id, _)| *id);
                let matches = entries.len() == self.bounds.len()
                    && entries
                        .iter()
                        .zip(self.bounds.iter())
                        .all(|((id, bbox), record)| *id == record.id && *bbox == record.bbox);
                if !matches {
                    return Err(format_error("tree entries differ from the bounds map"));
                }
            }
            None if scope.kind == StrategyKind::TreeOnly => {
                return Err(format_error("tree-only snapshot has no tree"));
            }
            None => {}
        }

        Ok(())
    }
}

fn format_error(message: impl Into<String>) -> GeocellError {
    GeocellError::Format(message.into())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
