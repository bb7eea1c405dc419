//! Spherical quad-tree (S2) covering.
//!
//! Features are always covered at exactly the index level (min level = max
//! level = resolution). Query rectangles may instead be covered with coarser
//! cells under [`LevelPolicy::Auto`]; a query cell coarser than the index
//! level is looked up as the contiguous id range of its descendants, so the
//! candidate set stays a superset of the true overlap set.

use super::{CellKey, CellScope, Covering, CoveringStrategy, check_geographic, check_limit};
use crate::error::{GeocellError, Result};
use geocell_types::bbox::BoundingBox;
use geocell_types::config::{LevelPolicy, StrategyKind};
use s2::cellid::CellID;
use s2::region::RegionCoverer;
use s2::{r1, s1};
use std::collections::BTreeSet;
use std::f64::consts::PI;

/// Default `max_cells` hint passed to the region coverer.
pub const DEFAULT_COVERER_MAX_CELLS: usize = 8;

const MAX_LEVEL: u8 = 30;

/// Coarsest level whose cells are still about as wide as the rectangle's
/// longer side. Larger rectangles get coarser (numerically smaller) levels.
pub fn auto_level(bbox: &BoundingBox) -> u8 {
    let span = bbox.width().max(bbox.height());
    if span <= 0.0 {
        return MAX_LEVEL;
    }
    (90.0 / span).log2().floor().clamp(0.0, MAX_LEVEL as f64) as u8
}

/// Approximate number of level-`level` cells needed for `bbox`, from the
/// rectangle's area on the unit sphere and the mean cell area.
fn estimated_cells(bbox: &BoundingBox, level: u8) -> f64 {
    let lng_span = (bbox.max_x - bbox.min_x).to_radians();
    let area = lng_span * (bbox.max_y.to_radians().sin() - bbox.min_y.to_radians().sin());
    let cell_area = 4.0 * PI / (6.0 * 4f64.powi(level as i32));
    area / cell_area
}

fn s2_rect(bbox: &BoundingBox) -> s2::rect::Rect {
    s2::rect::Rect {
        lat: r1::interval::Interval::new(bbox.min_y.to_radians(), bbox.max_y.to_radians()),
        lng: s1::interval::Interval::new(bbox.min_x.to_radians(), bbox.max_x.to_radians()),
    }
}

#[derive(Debug, Clone)]
pub struct SphericalCovering {
    level_policy: LevelPolicy,
    coverer_max_cells: usize,
    max_cells: Option<usize>,
}

impl SphericalCovering {
    /// Exact-level coverings with no cap on their size.
    pub fn new() -> Self {
        Self {
            level_policy: LevelPolicy::Exact,
            coverer_max_cells: DEFAULT_COVERER_MAX_CELLS,
            max_cells: None,
        }
    }

    pub fn with_level_policy(mut self, policy: LevelPolicy) -> Self {
        self.level_policy = policy;
        self
    }

    pub fn with_coverer_max_cells(mut self, max_cells: usize) -> Self {
        self.coverer_max_cells = max_cells;
        self
    }

    /// Refuse coverings above `max_cells`, checked against an area estimate
    /// before the coverer runs and against its result afterwards.
    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = Some(max_cells);
        self
    }

    pub fn level_policy(&self) -> LevelPolicy {
        self.level_policy
    }

    /// Coarsest level a query covering may use for an index at `resolution`.
    pub fn query_level(&self, bbox: &BoundingBox, resolution: u8) -> u8 {
        match self.level_policy {
            LevelPolicy::Exact => resolution,
            LevelPolicy::Auto => resolution.min(auto_level(bbox)),
        }
    }

    fn cells_between(&self, bbox: &BoundingBox, min_level: u8, max_level: u8) -> Result<Vec<CellID>> {
        check_geographic(bbox)?;

        if let Some(limit) = self.max_cells {
            let estimate = estimated_cells(bbox, min_level);
            if estimate > limit as f64 {
                return Err(GeocellError::CoveringTooLarge {
                    cells: estimate as usize,
                    limit,
                });
            }
        }

        let coverer = RegionCoverer {
            min_level,
            max_level,
            level_mod: 1,
            max_cells: self.coverer_max_cells,
        };
        let cells = coverer.covering(&s2_rect(bbox)).0;
        check_limit(cells.len(), self.max_cells)?;
        Ok(cells)
    }
}

impl Default for SphericalCovering {
    fn default() -> Self {
        Self::new()
    }
}

impl CoveringStrategy for SphericalCovering {
    fn kind(&self) -> StrategyKind {
        StrategyKind::S2
    }

    fn cover(&self, bbox: &BoundingBox, resolution: u8) -> Result<Covering> {
        self.validate_resolution(resolution)?;
        let cells = self
            .cells_between(bbox, resolution, resolution)?
            .into_iter()
            .map(|cell| CellKey::Int(cell.0))
            .collect();
        Ok(Covering::new(CellScope::new(StrategyKind::S2, resolution), cells))
    }

    fn cover_query(&self, bbox: &BoundingBox, resolution: u8) -> Result<Covering> {
        self.validate_resolution(resolution)?;
        let level = self.query_level(bbox, resolution);
        if level == resolution {
            return self.cover(bbox, resolution);
        }

        log::debug!("s2 query covering from level {level} for index level {resolution}");
        let mut cells = BTreeSet::new();
        let mut ranges = Vec::new();
        for cell in self.cells_between(bbox, level, resolution)? {
            if cell.level() as u64 == resolution as u64 {
                cells.insert(CellKey::Int(cell.0));
            } else {
                ranges.push((cell.range_min().0, cell.range_max().0));
            }
        }

        Ok(Covering::with_ranges(
            CellScope::new(StrategyKind::S2, resolution),
            cells,
            ranges,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covers(covering: &Covering, id: u64) -> bool {
        covering.cells().contains(&CellKey::Int(id))
            || covering.ranges().iter().any(|&(lo, hi)| lo <= id && id <= hi)
    }

    #[test]
    fn test_auto_level_bounds() {
        assert_eq!(auto_level(&BoundingBox::new(10.0, 10.0, 10.0, 10.0)), 30);
        // 90 / 1 deg -> floor(log2(90)) = 6
        assert_eq!(auto_level(&BoundingBox::new(0.0, 0.0, 1.0, 1.0)), 6);
        assert_eq!(auto_level(&BoundingBox::new(-180.0, -90.0, 180.0, 90.0)), 0);
        assert_eq!(auto_level(&BoundingBox::new(0.0, 0.0, 1e-12, 1e-12)), 30);
    }

    #[test]
    fn test_larger_area_never_finer() {
        let small = BoundingBox::new(100.5, 25.3, 100.6, 25.4);
        let large = BoundingBox::new(100.0, 25.0, 102.0, 27.0);
        assert!(auto_level(&large) <= auto_level(&small));
    }

    #[test]
    fn test_cover_exact_level() {
        let strategy = SphericalCovering::new();
        let bbox = BoundingBox::new(100.546875, 25.3125, 101.25, 26.015625);

        let covering = strategy.cover(&bbox, 10).unwrap();
        assert!(!covering.is_empty());
        assert!(covering.ranges().is_empty());
        for key in covering.cells() {
            let CellKey::Int(id) = key else {
                panic!("s2 keys must be integers");
            };
            assert_eq!(CellID(*id).level(), 10);
        }
    }

    #[test]
    fn test_cell_estimate_limit() {
        let strategy = SphericalCovering::new().with_max_cells(1_000);
        let continent = BoundingBox::new(70.0, 15.0, 135.0, 55.0);
        assert!(matches!(
            strategy.cover(&continent, 15),
            Err(GeocellError::CoveringTooLarge { limit: 1_000, .. })
        ));
    }

    #[test]
    fn test_auto_query_small_box_stays_exact() {
        let strategy = SphericalCovering::new().with_level_policy(LevelPolicy::Auto);
        // auto level 16 is finer than the index, so the index level wins
        let bbox = BoundingBox::new(100.0, 25.0, 100.001, 25.001);
        let covering = strategy.cover_query(&bbox, 15).unwrap();
        assert!(covering.ranges().is_empty());
        assert_eq!(covering, strategy.cover(&bbox, 15).unwrap());
    }

    #[test]
    fn test_auto_query_uses_descendant_ranges() {
        let strategy = SphericalCovering::new().with_level_policy(LevelPolicy::Auto);
        let bbox = BoundingBox::new(100.0, 25.0, 101.0, 26.0);

        let coarse = strategy.cover_query(&bbox, 15).unwrap();
        assert!(!coarse.ranges().is_empty());
        assert!(coarse.len() < strategy.cover(&bbox, 15).unwrap().len());
        assert_eq!(coarse.scope(), CellScope::new(StrategyKind::S2, 15));

        // Index cells of points inside the box are all reachable
        for (lon, lat) in [(100.5, 25.5), (100.01, 25.99), (100.99, 25.01)] {
            let point = BoundingBox::new(lon, lat, lon, lat);
            for key in strategy.cover(&point, 15).unwrap().cells() {
                let CellKey::Int(id) = key else { unreachable!() };
                assert!(covers(&coarse, *id));
            }
        }
    }
}
