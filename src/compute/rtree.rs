//! Secondary range index over feature bounding boxes.
//!
//! An R-tree of `(FeatureId, BoundingBox)` leaves, bulk-loaded once per
//! build. It answers rectangle-overlap queries exactly, so the query pipeline
//! can use it to prune cell candidates by intersection.

use geocell_types::bbox::BoundingBox;
use geocell_types::feature::FeatureId;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};

type Leaf = GeomWithData<Rectangle<[f64; 2]>, FeatureId>;

fn leaf(id: FeatureId, bbox: &BoundingBox) -> Leaf {
    GeomWithData::new(
        Rectangle::from_corners([bbox.min_x, bbox.min_y], [bbox.max_x, bbox.max_y]),
        id,
    )
}

fn envelope(bbox: &BoundingBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bbox.min_x, bbox.min_y], [bbox.max_x, bbox.max_y])
}

/// Bounding boxes keyed by feature id, answering overlap queries.
#[derive(Debug, Clone, Default)]
pub struct RangeIndex {
    tree: RTree<Leaf>,
}

impl RangeIndex {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load from `(id, bbox)` pairs.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (FeatureId, BoundingBox)>,
    {
        let leaves = entries
            .into_iter()
            .map(|(id, bbox)| leaf(id, &bbox))
            .collect();
        Self {
            tree: RTree::bulk_load(leaves),
        }
    }

    /// Ids whose stored box overlaps `bbox`, touching edges included.
    pub fn query<'a>(&'a self, bbox: &BoundingBox) -> impl Iterator<Item = FeatureId> + 'a {
        self.tree
            .locate_in_envelope_intersecting(&envelope(bbox))
            .map(|leaf| leaf.data)
    }

    /// All stored `(id, bbox)` pairs, in tree order.
    pub fn entries(&self) -> impl Iterator<Item = (FeatureId, BoundingBox)> + '_ {
        self.tree.iter().map(|leaf| {
            let lower = leaf.geom().lower();
            let upper = leaf.geom().upper();
            (leaf.data, BoundingBox::new(lower[0], lower[1], upper[0], upper[1]))
        })
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    fn sample() -> RangeIndex {
        RangeIndex::from_entries([
            (1, BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
            (2, BoundingBox::new(5.0, 5.0, 6.0, 6.0)),
            (3, BoundingBox::new(0.5, 0.5, 5.5, 5.5)),
        ])
    }

    #[test]
    fn test_query_overlaps() {
        let index = sample();
        let hits: FxHashSet<_> = index.query(&BoundingBox::new(0.0, 0.0, 2.0, 2.0)).collect();
        assert_eq!(hits, [1, 3].into_iter().collect());

        let none: Vec<_> = index.query(&BoundingBox::new(7.0, 7.0, 8.0, 8.0)).collect();
        assert!(none.is_empty());
    }

    #[test]
    fn test_touching_edges_overlap() {
        let index = sample();
        let hits: FxHashSet<_> = index.query(&BoundingBox::new(1.0, 1.0, 1.0, 1.0)).collect();
        assert!(hits.contains(&1));
    }

    #[test]
    fn test_entries_round_trip() {
        let index = sample();
        assert_eq!(index.len(), 3);

        let mut entries: Vec<_> = index.entries().collect();
        entries.sort_by_key(|(id, _)| *id);
        assert_eq!(entries[1], (2, BoundingBox::new(5.0, 5.0, 6.0, 6.0)));

        let rebuilt = RangeIndex::from_entries(entries);
        assert_eq!(rebuilt.len(), 3);
    }

    #[test]
    fn test_empty() {
        let index = RangeIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.query(&BoundingBox::new(0.0, 0.0, 1.0, 1.0)).count(), 0);
    }
}
