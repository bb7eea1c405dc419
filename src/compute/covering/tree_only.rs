use super::{CellScope, Covering, CoveringStrategy};
use crate::error::Result;
use geocell_types::bbox::BoundingBox;
use geocell_types::config::StrategyKind;

/// Produces no cells. Indexes using it answer every query from the R-tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeOnlyCovering;

impl CoveringStrategy for TreeOnlyCovering {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TreeOnly
    }

    fn cover(&self, _bbox: &BoundingBox, resolution: u8) -> Result<Covering> {
        self.validate_resolution(resolution)?;
        Ok(Covering::empty(CellScope::new(StrategyKind::TreeOnly, resolution)))
    }
}
