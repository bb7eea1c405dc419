//! Two-phase query pipeline.
//!
//! 1. Cover the query rectangle and union the postings of the covered cells
//!    (the candidate set, a superset of the true overlap set).
//! 2. Optionally intersect with the R-tree hits.
//! 3. Optionally refine against the stored bounding boxes.
//!
//! Indexes built with the tree-only strategy skip step 1 and take the R-tree
//! hits as the candidate set.

use crate::compute::covering::{CellScope, CoveringStrategy};
use crate::config::QueryOptions;
use crate::error::{GeocellError, Result};
use crate::index::snapshot::IndexSnapshot;
use geocell_types::bbox::BoundingBox;
use geocell_types::config::StrategyKind;
use geocell_types::feature::FeatureId;
use rustc_hash::FxHashSet;
use std::time::{Duration, Instant};

/// Statistics about a query execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStats {
    /// Cell keys and descendant ranges looked up
    pub cells_examined: usize,

    /// Candidates produced by the cell lookup (or the tree, for tree-only)
    pub candidates_examined: usize,

    /// Candidates left after R-tree pruning
    pub after_tree: usize,

    /// Number of results returned
    pub results_returned: usize,

    /// Whether the R-tree took part in the query
    pub tree_used: bool,

    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Matching feature ids, in no particular order
    pub ids: FxHashSet<FeatureId>,
    pub stats: QueryStats,
}

fn check_scope<S>(strategy: &S, snapshot: &IndexSnapshot, options: &QueryOptions) -> Result<()>
where
    S: CoveringStrategy + ?Sized,
{
    let expected = snapshot.scope();
    let found = CellScope::new(
        strategy.kind(),
        options.resolution.unwrap_or(expected.resolution),
    );
    if found != expected {
        return Err(GeocellError::ResolutionMismatch { expected, found });
    }
    Ok(())
}

/// Run `bbox` through the pipeline against `snapshot`.
///
/// `strategy` must be the strategy the snapshot was built with, and
/// `options.resolution`, when set, must equal the snapshot's resolution.
pub fn execute<S>(
    strategy: &S,
    snapshot: &IndexSnapshot,
    bbox: &BoundingBox,
    options: &QueryOptions,
) -> Result<QueryResult>
where
    S: CoveringStrategy + ?Sized,
{
    let start = Instant::now();
    check_scope(strategy, snapshot, options)?;
    if !bbox.is_finite() {
        return Err(GeocellError::InvalidInput(format!(
            "query rectangle ({}, {}, {}, {}) has non-finite coordinates",
            bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
        )));
    }

    let mut stats = QueryStats::default();

    let mut candidates = if snapshot.kind() == StrategyKind::TreeOnly {
        let tree = snapshot
            .tree()
            .ok_or(GeocellError::NotBuilt(StrategyKind::TreeOnly))?;
        stats.tree_used = true;
        tree.query(bbox).collect::<FxHashSet<_>>()
    } else {
        let covering = strategy.cover_query(bbox, snapshot.resolution())?;
        stats.cells_examined = covering.len();
        snapshot.cells().lookup(&covering)?
    };
    stats.candidates_examined = candidates.len();

    if options.use_tree
        && !stats.tree_used
        && let Some(tree) = snapshot.tree()
    {
        stats.tree_used = true;
        candidates = tree.query(bbox).filter(|id| candidates.contains(id)).collect();
    }
    stats.after_tree = candidates.len();

    if options.exact {
        candidates = snapshot.bounds().refine(candidates, bbox);
    }

    stats.results_returned = candidates.len();
    stats.elapsed = start.elapsed();
    log::debug!(
        "{} query: {} cells, {} candidates, {} after tree, {} results in {:?}",
        snapshot.scope(),
        stats.cells_examined,
        stats.candidates_examined,
        stats.after_tree,
        stats.results_returned,
        stats.elapsed
    );

    Ok(QueryResult {
        ids: candidates,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::covering::{GridStepCovering, HexagonalCovering, TreeOnlyCovering};
    use crate::source::MemorySource;

    fn source() -> MemorySource {
        let mut source = MemorySource::new();
        source.push(1, BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        source.push(2, BoundingBox::new(5.0, 5.0, 6.0, 6.0));
        source
    }

    fn ids(result: &QueryResult) -> Vec<FeatureId> {
        let mut ids: Vec<_> = result.ids.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_pipeline_two_boxes() {
        let strategy = HexagonalCovering::new();
        let (snapshot, _) = IndexSnapshot::build(&strategy, 5, true, &source()).unwrap();
        let options = QueryOptions::default();

        let a = execute(&strategy, &snapshot, &BoundingBox::new(0.0, 0.0, 2.0, 2.0), &options).unwrap();
        assert_eq!(ids(&a), vec![1]);
        assert!(a.stats.tree_used);
        assert!(a.stats.cells_examined > 0);

        let b = execute(&strategy, &snapshot, &BoundingBox::new(4.0, 4.0, 7.0, 7.0), &options).unwrap();
        assert_eq!(ids(&b), vec![2]);

        let none = execute(&strategy, &snapshot, &BoundingBox::new(2.0, 2.0, 3.0, 3.0), &options).unwrap();
        assert!(none.ids.is_empty());
    }

    #[test]
    fn test_exact_refinement_is_subset() {
        let strategy = GridStepCovering::new();
        let (snapshot, _) = IndexSnapshot::build(&strategy, 5, false, &source()).unwrap();
        let query = BoundingBox::new(0.995, 0.995, 1.5, 1.5);

        let loose = execute(&strategy, &snapshot, &query, &QueryOptions::default().with_exact(false)).unwrap();
        let exact = execute(&strategy, &snapshot, &query, &QueryOptions::default()).unwrap();
        assert!(exact.ids.is_subset(&loose.ids));
        assert!(!loose.stats.tree_used);
    }

    #[test]
    fn test_tree_only() {
        let strategy = TreeOnlyCovering;
        let (snapshot, _) = IndexSnapshot::build(&strategy, 0, true, &source()).unwrap();

        let result = execute(
            &strategy,
            &snapshot,
            &BoundingBox::new(0.5, 0.5, 5.5, 5.5),
            &QueryOptions::default().with_tree(false),
        )
        .unwrap();
        assert_eq!(ids(&result), vec![1, 2]);
        assert_eq!(result.stats.cells_examined, 0);
        assert!(result.stats.tree_used);
    }

    #[test]
    fn test_scope_checks() {
        let strategy = GridStepCovering::new();
        let (snapshot, _) = IndexSnapshot::build(&strategy, 5, true, &source()).unwrap();
        let query = BoundingBox::new(0.0, 0.0, 1.0, 1.0);

        let wrong_resolution = QueryOptions::default().at_resolution(6);
        assert!(matches!(
            execute(&strategy, &snapshot, &query, &wrong_resolution),
            Err(GeocellError::ResolutionMismatch { .. })
        ));

        assert!(matches!(
            execute(&HexagonalCovering::new(), &snapshot, &query, &QueryOptions::default()),
            Err(GeocellError::ResolutionMismatch { .. })
        ));

        let stated = QueryOptions::default().at_resolution(5);
        assert!(execute(&strategy, &snapshot, &query, &stated).is_ok());
    }

    #[test]
    fn test_non_finite_query() {
        let strategy = GridStepCovering::new();
        let (snapshot, _) = IndexSnapshot::build(&strategy, 5, true, &source()).unwrap();
        let query = BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0);
        assert!(matches!(
            execute(&strategy, &snapshot, &query, &QueryOptions::default()),
            Err(GeocellError::InvalidInput(_))
        ));
    }
}
