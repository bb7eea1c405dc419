//! Compute layer: coverings, the secondary R-tree and the query pipeline.
//!
//! Nothing here touches the filesystem. Snapshots are read and written by
//! [`crate::storage`].

pub mod covering;
pub mod query;
pub mod rtree;
