//! Snapshot persistence.
//!
//! One file per (strategy, resolution) snapshot. Files are written to a
//! temporary sibling and renamed into place, so a reader never sees a
//! half-written snapshot.

mod snapshot;

pub use snapshot::{
    SNAPSHOT_MAGIC, SNAPSHOT_VERSION, SnapshotFile, SnapshotRecord, load_snapshot, save_snapshot,
};
