//! GeoJSON file source.

use super::{FeatureSource, SourceFeature};
use crate::error::{GeocellError, Result};
use ::geojson::{Feature, GeoJson, feature::Id};
use geo::BoundingRect;
use geocell_types::bbox::BoundingBox;
use geocell_types::feature::FeatureId;
use std::fs;
use std::path::{Path, PathBuf};

/// Features of a GeoJSON `FeatureCollection` (or a single `Feature`), read
/// eagerly on open.
///
/// A feature's id is its numeric `id` member (or a string holding a
/// non-negative integer). Features without one are numbered in document
/// order starting after the largest explicit id, so generated ids never
/// collide with explicit ones. In a collection with no explicit ids the
/// generated id equals the feature's position.
#[derive(Debug, Clone)]
pub struct GeoJsonSource {
    path: PathBuf,
    features: Vec<SourceFeature>,
}

impl GeoJsonSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&path).map_err(|e| {
            GeocellError::DataSource(format!("cannot read {}: {e}", path.display()))
        })?;
        let parsed = contents.parse::<GeoJson>().map_err(|e| {
            GeocellError::DataSource(format!("cannot parse {}: {e}", path.display()))
        })?;

        let raw = match parsed {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => {
                return Err(GeocellError::DataSource(format!(
                    "{} holds a bare geometry, expected features",
                    path.display()
                )));
            }
        };

        let ids = assign_ids(&raw)?;
        let features = raw
            .into_iter()
            .zip(ids)
            .map(|(feature, id)| convert(id, feature))
            .collect::<Result<Vec<_>>>()?;

        log::info!("opened {} with {} features", path.display(), features.len());
        Ok(Self { path, features })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn explicit_id(id: Option<&Id>) -> Option<FeatureId> {
    match id {
        Some(Id::Number(n)) => n.as_u64(),
        Some(Id::String(s)) => s.parse().ok(),
        None => None,
    }
}

fn assign_ids(features: &[Feature]) -> Result<Vec<FeatureId>> {
    let explicit: Vec<Option<FeatureId>> = features
        .iter()
        .map(|feature| explicit_id(feature.id.as_ref()))
        .collect();

    let mut next = match explicit.iter().flatten().max() {
        Some(&max) => max.checked_add(1).ok_or_else(|| {
            GeocellError::DataSource("no ids left for features without an id".to_string())
        })?,
        None => 0,
    };

    explicit
        .into_iter()
        .map(|id| match id {
            Some(id) => Ok(id),
            None => {
                let id = next;
                next = next.checked_add(1).ok_or_else(|| {
                    GeocellError::DataSource("no ids left for features without an id".to_string())
                })?;
                Ok(id)
            }
        })
        .collect()
}

fn convert(id: FeatureId, feature: Feature) -> Result<SourceFeature> {
    let Some(geometry) = feature.geometry else {
        return Ok(SourceFeature::new(id, None));
    };

    let geometry = geo::Geometry::<f64>::try_from(geometry).map_err(|e| {
        GeocellError::DataSource(format!("feature {id}: unsupported geometry: {e}"))
    })?;
    let bbox = geometry.bounding_rect().map(BoundingBox::from_rect);
    Ok(SourceFeature::new(id, bbox))
}

impl FeatureSource for GeoJsonSource {
    fn feature_count(&self) -> usize {
        self.features.len()
    }

    fn features(&self) -> Box<dyn Iterator<Item = SourceFeature> + '_> {
        Box::new(self.features.iter().copied())
    }
}
