use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// The covering strategy backing an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Grid-step sampling encoded as geohash strings.
    #[default]
    Geohash,
    /// Hexagonal H3 cells.
    H3,
    /// Spherical S2 quad-tree cells.
    S2,
    /// No cell covering; the R-tree is the only index.
    TreeOnly,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Geohash,
        StrategyKind::H3,
        StrategyKind::S2,
        StrategyKind::TreeOnly,
    ];

    /// Valid resolution (precision / level) range for this strategy.
    pub const fn resolutions(self) -> RangeInclusive<u8> {
        match self {
            StrategyKind::Geohash => 1..=12,
            StrategyKind::H3 => 0..=15,
            StrategyKind::S2 => 0..=30,
            StrategyKind::TreeOnly => 0..=0,
        }
    }

    pub const fn default_resolution(self) -> u8 {
        match self {
            StrategyKind::Geohash => 7,
            StrategyKind::H3 => 9,
            StrategyKind::S2 => 15,
            StrategyKind::TreeOnly => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Geohash => "geohash",
            StrategyKind::H3 => "h3",
            StrategyKind::S2 => "s2",
            StrategyKind::TreeOnly => "tree_only",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the spherical strategy picks the level of a query covering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LevelPolicy {
    /// Cover queries at exactly the index level.
    #[default]
    Exact,
    /// Derive a coarser level from the query rectangle's area.
    Auto,
}
