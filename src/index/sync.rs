//! Thread-safe index handle for concurrent readers.
//!
//! Enable the `sync` feature to use this module:
//!
//! ```toml
//! [dependencies]
//! geocell = { version = "0.1", features = ["sync"] }
//! ```
//!
//! Readers take the read lock only long enough to clone the current
//! `Arc<IndexSnapshot>` and then query without holding it. A rebuild runs
//! without any lock and swaps the finished snapshot in under a short write
//! lock, so a reader sees either the old or the new snapshot, never a
//! partial one.

use super::snapshot::{BuildStats, IndexSnapshot};
use super::{CoveringIndex, check_snapshot_scope};
use crate::compute::covering::{CellScope, CoveringStrategy};
use crate::compute::query::{self, QueryResult};
use crate::config::QueryOptions;
use crate::error::{GeocellError, Result};
use crate::source::FeatureSource;
use crate::storage::{load_snapshot, save_snapshot};
use geocell_types::bbox::BoundingBox;
use geocell_types::feature::FeatureId;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct Shared<S> {
    strategy: S,
    resolution: u8,
    build_tree: bool,
    snapshot_path: Option<PathBuf>,
    current: RwLock<Option<Arc<IndexSnapshot>>>,
}

/// Cloneable handle around a [`CoveringIndex`]; clones share the snapshot.
pub struct SharedIndex<S> {
    inner: Arc<Shared<S>>,
}

impl<S> Clone for SharedIndex<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: CoveringStrategy> SharedIndex<S> {
    pub fn new(index: CoveringIndex<S>) -> Self {
        let (strategy, resolution, build_tree, snapshot_path, snapshot) = index.into_parts();
        Self {
            inner: Arc::new(Shared {
                strategy,
                resolution,
                build_tree,
                snapshot_path,
                current: RwLock::new(snapshot),
            }),
        }
    }

    pub fn scope(&self) -> CellScope {
        CellScope::new(self.inner.strategy.kind(), self.inner.resolution)
    }

    /// The snapshot queries currently run against.
    pub fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.inner.current.read().clone()
    }

    fn current(&self) -> Result<Arc<IndexSnapshot>> {
        self.snapshot()
            .ok_or(GeocellError::NotBuilt(self.inner.strategy.kind()))
    }

    fn publish(&self, snapshot: Arc<IndexSnapshot>) {
        *self.inner.current.write() = Some(snapshot);
    }

    /// Build a new snapshot and swap it in. Queries keep using the previous
    /// snapshot until the build has finished.
    pub fn build(&self, source: &dyn FeatureSource) -> Result<BuildStats> {
        let shared = &self.inner;
        let (snapshot, stats) =
            IndexSnapshot::build(&shared.strategy, shared.resolution, shared.build_tree, source)?;
        let snapshot = Arc::new(snapshot);

        if let Some(path) = &shared.snapshot_path {
            save_snapshot(&snapshot, path)?;
        }
        self.publish(snapshot);
        Ok(stats)
    }

    pub fn query_with_stats(&self, bbox: &BoundingBox, options: &QueryOptions) -> Result<QueryResult> {
        let snapshot = self.current()?;
        query::execute(&self.inner.strategy, &snapshot, bbox, options)
    }

    pub fn query(&self, bbox: &BoundingBox, options: &QueryOptions) -> Result<FxHashSet<FeatureId>> {
        Ok(self.query_with_stats(bbox, options)?.ids)
    }

    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let snapshot = load_snapshot(path)?;
        check_snapshot_scope(self.scope(), &snapshot)?;
        self.publish(Arc::new(snapshot));
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_snapshot(&*self.current()?, path)
    }
}

impl<S: CoveringStrategy> From<CoveringIndex<S>> for SharedIndex<S> {
    fn from(index: CoveringIndex<S>) -> Self {
        Self::new(index)
    }
}
