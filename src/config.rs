//! Index and query configuration.

use geocell_types::config::{LevelPolicy, StrategyKind};
use serde::de::Error;
use std::path::PathBuf;

/// How an index is built.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Cell resolution; the strategy's default when absent
    #[serde(default)]
    pub resolution: Option<u8>,

    /// Build the secondary R-tree. Always on for the tree-only strategy.
    #[serde(default = "IndexConfig::default_build_tree")]
    pub build_tree: bool,

    /// Query leveling for the S2 strategy
    #[serde(default)]
    pub level_policy: LevelPolicy,

    /// Cap on cells in one H3 or S2 covering; uncapped when absent
    #[serde(default)]
    pub max_cells: Option<usize>,

    /// Cap on lattice samples in one geohash covering; uncapped when absent
    #[serde(default)]
    pub max_lattice_samples: Option<usize>,

    /// `max_cells` hint for the S2 region coverer
    #[serde(default = "IndexConfig::default_s2_max_cells")]
    pub s2_max_cells: usize,

    /// Snapshot written after every build and loaded on open if present
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl IndexConfig {
    const fn default_build_tree() -> bool {
        true
    }

    const fn default_s2_max_cells() -> usize {
        8
    }

    pub fn new(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// The configured resolution, or the strategy default.
    pub fn effective_resolution(&self) -> u8 {
        self.resolution
            .unwrap_or_else(|| self.strategy.default_resolution())
    }

    pub fn with_resolution(mut self, resolution: u8) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn with_build_tree(mut self, build_tree: bool) -> Self {
        self.build_tree = build_tree;
        self
    }

    pub fn with_level_policy(mut self, policy: LevelPolicy) -> Self {
        self.level_policy = policy;
        self
    }

    /// Bound H3 and S2 coverings; larger ones fail with `CoveringTooLarge`.
    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = Some(max_cells);
        self
    }

    /// Bound the geohash lattice walk.
    pub fn with_max_lattice_samples(mut self, samples: usize) -> Self {
        self.max_lattice_samples = Some(samples);
        self
    }

    pub fn with_s2_max_cells(mut self, max_cells: usize) -> Self {
        self.s2_max_cells = max_cells;
        self
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        let resolution = self.effective_resolution();
        let range = self.strategy.resolutions();
        if !range.contains(&resolution) {
            return Err(format!(
                "Resolution {resolution} is outside {}..={} for the {} strategy",
                range.start(),
                range.end(),
                self.strategy
            ));
        }

        if self.max_cells == Some(0) {
            return Err("max_cells must be greater than zero".to_string());
        }
        if self.max_lattice_samples == Some(0) {
            return Err("max_lattice_samples must be greater than zero".to_string());
        }
        if self.s2_max_cells == 0 {
            return Err("s2_max_cells must be greater than zero".to_string());
        }

        if self.strategy == StrategyKind::TreeOnly && !self.build_tree {
            log::warn!("build_tree is ignored for the tree_only strategy");
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: IndexConfig = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: IndexConfig = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            resolution: None,
            build_tree: Self::default_build_tree(),
            level_policy: LevelPolicy::default(),
            max_cells: None,
            max_lattice_samples: None,
            s2_max_cells: Self::default_s2_max_cells(),
            snapshot_path: None,
        }
    }
}

/// Per-query switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryOptions {
    /// Intersect cell candidates with the R-tree when the index has one
    #[serde(default = "QueryOptions::default_true")]
    pub use_tree: bool,

    /// Drop candidates whose stored bounding box misses the query
    #[serde(default = "QueryOptions::default_true")]
    pub exact: bool,

    /// Resolution the caller assumes; checked against the index
    #[serde(default)]
    pub resolution: Option<u8>,
}

impl QueryOptions {
    const fn default_true() -> bool {
        true
    }

    pub fn with_tree(mut self, use_tree: bool) -> Self {
        self.use_tree = use_tree;
        self
    }

    pub fn with_exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    pub fn at_resolution(mut self, resolution: u8) -> Self {
        self.resolution = Some(resolution);
        self
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            use_tree: true,
            exact: true,
            resolution: None,
        }
    }
}
