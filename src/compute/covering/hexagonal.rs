//! Hexagonal (H3) covering.
//!
//! The rectangle is treated as a polygon and handed to h3o's tiler in
//! `Covers` mode: every cell at the resolution whose boundary overlaps the
//! rectangle is returned, including the single enclosing cell of a rectangle
//! smaller than one cell.

use super::{CellKey, CellScope, Covering, CoveringStrategy, check_geographic, check_limit};
use crate::error::{GeocellError, Result};
use geo::Polygon;
use geocell_types::bbox::BoundingBox;
use geocell_types::config::StrategyKind;
use h3o::Resolution;
use h3o::geom::{ContainmentMode, TilerBuilder};
use std::collections::BTreeSet;

/// Half-width in degrees given to the collapsed axes of a point or line
/// rectangle, which the tiler rejects as an empty ring.
const DEGENERATE_PAD: f64 = 1e-9;

#[derive(Debug, Clone, Default)]
pub struct HexagonalCovering {
    max_cells: Option<usize>,
}

impl HexagonalCovering {
    /// A covering with no cap on its size.
    pub fn new() -> Self {
        Self::default()
    }

    /// A covering that fails with `CoveringTooLarge` above `max_cells`.
    pub fn with_max_cells(max_cells: usize) -> Self {
        Self {
            max_cells: Some(max_cells),
        }
    }

    pub fn max_cells(&self) -> Option<usize> {
        self.max_cells
    }
}

/// The rectangle as a closed (lng, lat) polygon, with collapsed axes padded.
fn rectangle_polygon(bbox: &BoundingBox) -> Polygon {
    let mut rect = *bbox;
    if rect.width() <= 0.0 {
        rect.min_x = (rect.min_x - DEGENERATE_PAD).max(-180.0);
        rect.max_x = (rect.max_x + DEGENERATE_PAD).min(180.0);
    }
    if rect.height() <= 0.0 {
        rect.min_y = (rect.min_y - DEGENERATE_PAD).max(-90.0);
        rect.max_y = (rect.max_y + DEGENERATE_PAD).min(90.0);
    }
    rect.to_rect().to_polygon()
}

impl CoveringStrategy for HexagonalCovering {
    fn kind(&self) -> StrategyKind {
        StrategyKind::H3
    }

    fn cover(&self, bbox: &BoundingBox, resolution: u8) -> Result<Covering> {
        self.validate_resolution(resolution)?;
        check_geographic(bbox)?;

        let res = Resolution::try_from(resolution)
            .map_err(|e| GeocellError::InvalidInput(format!("invalid H3 resolution: {e}")))?;

        let mut tiler = TilerBuilder::new(res)
            .containment_mode(ContainmentMode::Covers)
            .build();
        tiler.add(rectangle_polygon(bbox)).map_err(|e| {
            GeocellError::InvalidInput(format!(
                "cannot tile ({}, {}, {}, {}) with H3 cells: {e}",
                bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
            ))
        })?;

        let cells: BTreeSet<CellKey> = tiler
            .into_coverage()
            .map(|cell| CellKey::Int(u64::from(cell)))
            .collect();
        check_limit(cells.len(), self.max_cells)?;

        Ok(Covering::new(CellScope::new(StrategyKind::H3, resolution), cells))
    }
}
