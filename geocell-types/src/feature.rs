use crate::bbox::BoundingBox;
use serde::{Deserialize, Serialize};

/// Identifier of a feature, stable for the lifetime of a dataset snapshot.
pub type FeatureId = u64;

/// A feature identifier paired with its bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub id: FeatureId,
    pub bbox: BoundingBox,
}

impl FeatureRecord {
    pub fn new(id: FeatureId, bbox: BoundingBox) -> Self {
        Self { id, bbox }
    }
}
