//! Feature sources: where a build pass reads ids and bounding boxes from.

#[cfg(feature = "geojson")]
mod geojson;

#[cfg(feature = "geojson")]
pub use self::geojson::GeoJsonSource;

use geocell_types::bbox::BoundingBox;
use geocell_types::feature::{FeatureId, FeatureRecord};

/// One feature as reported by a source. `bbox` is `None` when the feature
/// has no geometry to take an envelope from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceFeature {
    pub id: FeatureId,
    pub bbox: Option<BoundingBox>,
}

impl SourceFeature {
    pub fn new(id: FeatureId, bbox: Option<BoundingBox>) -> Self {
        Self { id, bbox }
    }
}

impl From<FeatureRecord> for SourceFeature {
    fn from(record: FeatureRecord) -> Self {
        Self::new(record.id, Some(record.bbox))
    }
}

/// A dataset that can be walked once per build.
pub trait FeatureSource {
    /// Total features the source holds, including ones without geometry.
    fn feature_count(&self) -> usize;

    fn features(&self) -> Box<dyn Iterator<Item = SourceFeature> + '_>;
}

/// Vector-backed source.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    features: Vec<SourceFeature>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = FeatureRecord>,
    {
        records.into_iter().map(SourceFeature::from).collect()
    }

    pub fn push(&mut self, id: FeatureId, bbox: BoundingBox) {
        self.features.push(SourceFeature::new(id, Some(bbox)));
    }

    /// Add a feature with no geometry.
    pub fn push_empty(&mut self, id: FeatureId) {
        self.features.push(SourceFeature::new(id, None));
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FromIterator<SourceFeature> for MemorySource {
    fn from_iter<I: IntoIterator<Item = SourceFeature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl FeatureSource for MemorySource {
    fn feature_count(&self) -> usize {
        self.features.len()
    }

    fn features(&self) -> Box<dyn Iterator<Item = SourceFeature> + '_> {
        Box::new(self.features.iter().copied())
    }
}

impl<T: FeatureSource + ?Sized> FeatureSource for &T {
    fn feature_count(&self) -> usize {
        (**self).feature_count()
    }

    fn features(&self) -> Box<dyn Iterator<Item = SourceFeature> + '_> {
        (**self).features()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source() {
        let mut source = MemorySource::from_records([FeatureRecord::new(
            7,
            BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        )]);
        source.push_empty(8);

        assert_eq!(source.feature_count(), 2);
        let features: Vec<_> = source.features().collect();
        assert_eq!(features[0].bbox, Some(BoundingBox::new(0.0, 0.0, 1.0, 1.0)));
        assert_eq!(features[1], SourceFeature::new(8, None));
    }
}
