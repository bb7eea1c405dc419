//! Feature id to bounding box map used for exact refinement.

use geocell_types::bbox::BoundingBox;
use geocell_types::feature::{FeatureId, FeatureRecord};
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Bounding box of every indexed feature, ordered by id.
///
/// The authoritative record of what a snapshot holds: postings and tree
/// leaves must refer to ids present here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundsStore {
    records: BTreeMap<FeatureId, BoundingBox>,
}

impl BoundsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. Returns `false` and leaves the store unchanged when
    /// the id is already present.
    pub fn insert(&mut self, record: FeatureRecord) -> bool {
        match self.records.entry(record.id) {
            Entry::Vacant(slot) => {
                slot.insert(record.bbox);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Stored box for `id`, if indexed.
    pub fn get(&self, id: FeatureId) -> Option<&BoundingBox> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: FeatureId) -> bool {
        self.records.contains_key(&id)
    }

    /// Number of indexed features.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = FeatureRecord> + '_ {
        self.records
            .iter()
            .map(|(&id, &bbox)| FeatureRecord::new(id, bbox))
    }

    /// Indexed ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.records.keys().copied()
    }

    /// Keep only the candidates whose stored box overlaps `bbox`. Ids the
    /// store does not know are dropped.
    pub fn refine(&self, candidates: FxHashSet<FeatureId>, bbox: &BoundingBox) -> FxHashSet<FeatureId> {
        candidates
            .into_iter()
            .filter(|id| self.get(*id).is_some_and(|stored| stored.intersects(bbox)))
            .collect()
    }

    /// Linear scan over every record. The reference answer the indexes are
    /// measured against.
    pub fn scan(&self, bbox: &BoundingBox) -> FxHashSet<FeatureId> {
        self.records
            .iter()
            .filter(|(_, stored)| stored.intersects(bbox))
            .map(|(&id, _)| id)
            .collect()
    }

    pub(crate) fn as_map(&self) -> &BTreeMap<FeatureId, BoundingBox> {
        &self.records
    }

    pub(crate) fn from_map(records: BTreeMap<FeatureId, BoundingBox>) -> Self {
        Self { records }
    }
}
