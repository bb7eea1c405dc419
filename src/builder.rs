//! Runtime selection of an index backend from configuration.

use crate::compute::covering::{
    CoveringStrategy, GridStepCovering, HexagonalCovering, SphericalCovering, TreeOnlyCovering,
};
use crate::config::IndexConfig;
use crate::error::{GeocellError, Result};
use crate::index::{CoveringIndex, SpatialIndex};
use geocell_types::config::{LevelPolicy, StrategyKind};
use std::path::PathBuf;

/// Builder for an index whose strategy is chosen at runtime.
///
/// When a snapshot path is configured and the file exists, the returned
/// index is loaded from it; otherwise it starts empty and saves there after
/// its first build.
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    config: IndexConfig,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a complete configuration.
    pub fn config(mut self, config: IndexConfig) -> Self {
        self.config = config;
        self
    }

    pub fn strategy(mut self, kind: StrategyKind) -> Self {
        self.config.strategy = kind;
        self
    }

    pub fn resolution(mut self, resolution: u8) -> Self {
        self.config.resolution = Some(resolution);
        self
    }

    pub fn build_tree(mut self, build_tree: bool) -> Self {
        self.config.build_tree = build_tree;
        self
    }

    pub fn level_policy(mut self, policy: LevelPolicy) -> Self {
        self.config.level_policy = policy;
        self
    }

    /// Cap H3 and S2 coverings. Uncapped unless set.
    pub fn max_cells(mut self, max_cells: usize) -> Self {
        self.config.max_cells = Some(max_cells);
        self
    }

    /// Cap the geohash lattice walk. Uncapped unless set.
    pub fn max_lattice_samples(mut self, samples: usize) -> Self {
        self.config.max_lattice_samples = Some(samples);
        self
    }

    pub fn snapshot_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.snapshot_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<Box<dyn SpatialIndex>> {
        self.config.validate().map_err(GeocellError::InvalidInput)?;
        let config = &self.config;

        match config.strategy {
            StrategyKind::Geohash => {
                let strategy = config
                    .max_lattice_samples
                    .map_or_else(GridStepCovering::new, GridStepCovering::with_max_samples);
                open(strategy, config)
            }
            StrategyKind::H3 => {
                let strategy = config
                    .max_cells
                    .map_or_else(HexagonalCovering::new, HexagonalCovering::with_max_cells);
                open(strategy, config)
            }
            StrategyKind::S2 => {
                let mut strategy = SphericalCovering::new()
                    .with_level_policy(config.level_policy)
                    .with_coverer_max_cells(config.s2_max_cells);
                if let Some(max_cells) = config.max_cells {
                    strategy = strategy.with_max_cells(max_cells);
                }
                open(strategy, config)
            }
            StrategyKind::TreeOnly => open(TreeOnlyCovering, config),
        }
    }
}

fn open<S>(strategy: S, config: &IndexConfig) -> Result<Box<dyn SpatialIndex>>
where
    S: CoveringStrategy + 'static,
{
    let mut index = CoveringIndex::new(strategy, config.effective_resolution())?
        .with_build_tree(config.build_tree);

    if let Some(path) = &config.snapshot_path {
        index = index.with_snapshot_path(path.clone());
        if path.exists() {
            index.load(path)?;
        }
    }

    Ok(Box::new(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryOptions;
    use crate::source::MemorySource;
    use geocell_types::bbox::BoundingBox;
    use tempfile::TempDir;

    #[test]
    fn test_builder_default() {
        let index = IndexBuilder::new().build().unwrap();
        assert_eq!(index.kind(), StrategyKind::Geohash);
        assert_eq!(index.resolution(), 7);
        assert!(!index.is_built());
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = IndexBuilder::new()
            .strategy(StrategyKind::H3)
            .resolution(16)
            .build();
        assert!(matches!(result, Err(GeocellError::InvalidInput(_))));
    }

    #[test]
    fn test_every_strategy_builds() {
        let mut source = MemorySource::new();
        source.push(1, BoundingBox::new(10.0, 10.0, 10.2, 10.2));
        source.push(2, BoundingBox::new(12.0, 12.0, 12.2, 12.2));

        for (kind, resolution) in [
            (StrategyKind::Geohash, 5),
            (StrategyKind::H3, 6),
            (StrategyKind::S2, 10),
            (StrategyKind::TreeOnly, 0),
        ] {
            let mut index = IndexBuilder::new()
                .strategy(kind)
                .resolution(resolution)
                .build()
                .unwrap();
            index.build(&source).unwrap();

            let hits = index
                .query(&BoundingBox::new(9.0, 9.0, 11.0, 11.0), &QueryOptions::default())
                .unwrap();
            assert_eq!(hits, [1].into_iter().collect(), "{kind}");
        }
    }

    #[test]
    fn test_builder_loads_existing_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s2_10.snap");

        let mut source = MemorySource::new();
        source.push(1, BoundingBox::new(10.0, 10.0, 10.2, 10.2));

        let mut first = IndexBuilder::new()
            .strategy(StrategyKind::S2)
            .resolution(10)
            .snapshot_path(&path)
            .build()
            .unwrap();
        assert!(!first.is_built());
        first.build(&source).unwrap();

        let reopened = IndexBuilder::new()
            .strategy(StrategyKind::S2)
            .resolution(10)
            .snapshot_path(&path)
            .build()
            .unwrap();
        assert!(reopened.is_built());
        assert_eq!(reopened.snapshot().unwrap().bounds().len(), 1);
    }
}
