//! Cell-covering spatial indexes for bounding-box overlap queries.
//!
//! A feature's bounding box is mapped to a set of discrete cells (geohash,
//! H3 or S2) and an inverted index from cell to features is built. Queries
//! cover the query rectangle the same way, union the postings, optionally
//! prune with an R-tree and finally refine against the stored boxes.
//!
//! ```rust
//! use geocell::prelude::*;
//!
//! let mut source = MemorySource::new();
//! source.push(1, BoundingBox::new(0.0, 0.0, 1.0, 1.0));
//! source.push(2, BoundingBox::new(5.0, 5.0, 6.0, 6.0));
//!
//! let mut index = IndexBuilder::new()
//!     .strategy(StrategyKind::S2)
//!     .resolution(10)
//!     .build()?;
//! index.build(&source)?;
//!
//! let hits = index.query(&BoundingBox::new(4.0, 4.0, 7.0, 7.0), &QueryOptions::default())?;
//! assert!(hits.contains(&2));
//! # Ok::<(), geocell::GeocellError>(())
//! ```

pub mod builder;
pub mod compute;
pub mod config;
pub mod error;
pub mod index;
pub mod source;
pub mod storage;

pub use builder::IndexBuilder;
pub use compute::covering::{
    CellKey, CellScope, Covering, CoveringStrategy, GridStepCovering, HexagonalCovering,
    SphericalCovering, TreeOnlyCovering,
};
pub use compute::query::{QueryResult, QueryStats};
pub use compute::rtree::RangeIndex;
pub use config::{IndexConfig, QueryOptions};
pub use error::{GeocellError, Result};
pub use index::bounds::BoundsStore;
pub use index::cells::InvertedCellIndex;
pub use index::snapshot::{BuildStats, IndexSnapshot};
#[cfg(feature = "sync")]
pub use index::sync::SharedIndex;
pub use index::{CoveringIndex, GeohashIndex, H3Index, RTreeIndex, S2Index, SpatialIndex};
#[cfg(feature = "geojson")]
pub use source::GeoJsonSource;
pub use source::{FeatureSource, MemorySource, SourceFeature};
pub use storage::{SnapshotFile, load_snapshot, save_snapshot};

pub use geocell_types::bbox::BoundingBox;
pub use geocell_types::config::{LevelPolicy, StrategyKind};
pub use geocell_types::feature::{FeatureId, FeatureRecord};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::{GeocellError, IndexBuilder, Result};

    pub use crate::{BoundingBox, FeatureId, FeatureRecord, LevelPolicy, StrategyKind};

    pub use crate::{GeohashIndex, H3Index, RTreeIndex, S2Index, SpatialIndex};

    pub use crate::{FeatureSource, MemorySource};

    #[cfg(feature = "geojson")]
    pub use crate::GeoJsonSource;

    #[cfg(feature = "sync")]
    pub use crate::SharedIndex;

    pub use crate::{IndexConfig, QueryOptions};
}
