//! Inverted index from cell key to the features whose covering contains it.

use crate::compute::covering::{CellKey, CellScope, Covering};
use crate::error::{GeocellError, Result};
use geocell_types::feature::FeatureId;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;

/// Frozen cell -> feature-id postings for one [`CellScope`].
///
/// Ordered so integer keys can be range-scanned for S2 descendant ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct InvertedCellIndex {
    scope: CellScope,
    cells: BTreeMap<CellKey, Vec<FeatureId>>,
}

impl InvertedCellIndex {
    pub fn empty(scope: CellScope) -> Self {
        Self {
            scope,
            cells: BTreeMap::new(),
        }
    }

    pub fn scope(&self) -> CellScope {
        self.scope
    }

    pub fn get(&self, key: &CellKey) -> Option<&[FeatureId]> {
        self.cells.get(key).map(Vec::as_slice)
    }

    /// Number of distinct cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Total number of (cell, feature) entries.
    pub fn postings(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &[FeatureId])> {
        self.cells.iter().map(|(key, ids)| (key, ids.as_slice()))
    }

    /// Union of the postings of every cell in `covering`. Cells absent from
    /// the index contribute nothing.
    ///
    /// Fails with [`GeocellError::ResolutionMismatch`] when the covering was
    /// produced for a different strategy or resolution.
    pub fn lookup(&self, covering: &Covering) -> Result<FxHashSet<FeatureId>> {
        if covering.scope() != self.scope {
            return Err(GeocellError::ResolutionMismatch {
                expected: self.scope,
                found: covering.scope(),
            });
        }

        let mut candidates = FxHashSet::default();
        for key in covering.cells() {
            if let Some(ids) = self.cells.get(key) {
                candidates.extend(ids.iter().copied());
            }
        }
        for &(lo, hi) in covering.ranges() {
            for ids in self
                .cells
                .range(CellKey::Int(lo)..=CellKey::Int(hi))
                .map(|(_, ids)| ids)
            {
                candidates.extend(ids.iter().copied());
            }
        }
        Ok(candidates)
    }

    pub(crate) fn as_map(&self) -> &BTreeMap<CellKey, Vec<FeatureId>> {
        &self.cells
    }

    pub(crate) fn from_map(scope: CellScope, cells: BTreeMap<CellKey, Vec<FeatureId>>) -> Self {
        Self { scope, cells }
    }
}

/// Build-time accumulator. Nothing is visible to queries until
/// [`CellIndexBuilder::finish`] hands over the completed index.
#[derive(Debug)]
pub struct CellIndexBuilder {
    scope: CellScope,
    cells: BTreeMap<CellKey, Vec<FeatureId>>,
}

impl CellIndexBuilder {
    pub fn new(scope: CellScope) -> Self {
        Self {
            scope,
            cells: BTreeMap::new(),
        }
    }

    /// Append `id` to every cell in `covering`.
    ///
    /// Each feature must be added once; the covering's cell set is already
    /// deduplicated, so no cell list receives the same id twice.
    pub fn add(&mut self, id: FeatureId, covering: Covering) -> Result<()> {
        if covering.scope() != self.scope {
            return Err(GeocellError::ResolutionMismatch {
                expected: self.scope,
                found: covering.scope(),
            });
        }
        for key in covering.into_cells() {
            self.cells.entry(key).or_default().push(id);
        }
        Ok(())
    }

    pub fn finish(self) -> InvertedCellIndex {
        InvertedCellIndex {
            scope: self.scope,
            cells: self.cells,
        }
    }
}
