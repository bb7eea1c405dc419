//! Grid-step sampling over geohash cells.
//!
//! A rectangle is covered by walking a regular lattice of sample points and
//! encoding every sample as a geohash at the requested precision. The lattice
//! step depends on the precision only, so the covering is **approximate**:
//!
//! - a cell the rectangle overlaps is missed when no sample lands in it
//!   (possible whenever the step is larger than the cell);
//! - boundary cells touched only by the max-extent samples are included.
//!
//! The error shrinks with the step relative to cell size but never vanishes.
//! Both extents are always sampled, so a rectangle covered twice yields the
//! same cells and a feature is always found by a query equal to its own box.

use super::{CellKey, CellScope, Covering, CoveringStrategy, check_geographic, check_limit};
use crate::error::{GeocellError, Result};
use geocell_types::bbox::BoundingBox;
use geocell_types::config::StrategyKind;
use geohash::encode;
use std::collections::BTreeSet;

/// Step used for precisions missing from the table.
pub const DEFAULT_LATTICE_STEP: f64 = 0.005;

/// Lattice step in degrees for a geohash precision.
///
/// | Precision | Step (deg) |
/// |-----------|------------|
/// | 5         | 0.01       |
/// | 6         | 0.001      |
/// | 7         | 0.0005     |
/// | 8         | 0.00025    |
/// | 9         | 0.0001     |
/// | 10        | 0.00005    |
/// | 11        | 0.000025   |
/// | 12        | 0.00001    |
/// | other     | 0.005      |
pub fn lattice_step(precision: u8) -> f64 {
    match precision {
        5 => 0.01,
        6 => 0.001,
        7 => 0.0005,
        8 => 0.00025,
        9 => 0.0001,
        10 => 0.00005,
        11 => 0.000025,
        12 => 0.00001,
        _ => DEFAULT_LATTICE_STEP,
    }
}

#[derive(Debug, Clone)]
pub struct GridStepCovering {
    max_samples: Option<usize>,
}

impl GridStepCovering {
    /// A covering with no cap on the lattice size.
    pub fn new() -> Self {
        Self { max_samples: None }
    }

    /// A covering that refuses rectangles needing more than `max_samples`
    /// lattice points.
    pub fn with_max_samples(max_samples: usize) -> Self {
        Self {
            max_samples: Some(max_samples),
        }
    }

    pub fn max_samples(&self) -> Option<usize> {
        self.max_samples
    }
}

impl Default for GridStepCovering {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample coordinates along one axis: `min + i * step` while `<= max`, then
/// `max` itself if the last lattice point fell short of it.
fn axis_samples(min: f64, max: f64, step: f64) -> Vec<f64> {
    let steps = ((max - min) / step).floor() as usize;
    let mut samples: Vec<f64> = (0..=steps)
        .map(|i| min + i as f64 * step)
        .filter(|v| *v <= max)
        .collect();

    if samples.last().is_none_or(|last| *last < max) {
        samples.push(max);
    }
    samples
}

fn sample_count_estimate(min: f64, max: f64, step: f64) -> usize {
    ((max - min) / step).floor() as usize + 2
}

fn encode_sample(lon: f64, lat: f64, precision: usize) -> Result<String> {
    encode(geohash::Coord { x: lon, y: lat }, precision).map_err(|e| {
        GeocellError::InvalidInput(format!("cannot encode ({lon}, {lat}) as geohash: {e}"))
    })
}

/// First sample of every geohash band along one axis. `samples` is sorted,
/// so samples sharing a band are adjacent.
fn band_representatives<F>(samples: &[f64], precision: usize, at: F) -> Result<Vec<f64>>
where
    F: Fn(f64) -> (f64, f64),
{
    let mut representatives = Vec::new();
    let mut last_hash: Option<String> = None;
    for &value in samples {
        let (lon, lat) = at(value);
        let hash = encode_sample(lon, lat, precision)?;
        if last_hash.as_ref() != Some(&hash) {
            representatives.push(value);
            last_hash = Some(hash);
        }
    }
    Ok(representatives)
}

impl CoveringStrategy for GridStepCovering {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Geohash
    }

    fn cover(&self, bbox: &BoundingBox, resolution: u8) -> Result<Covering> {
        self.validate_resolution(resolution)?;
        check_geographic(bbox)?;

        let step = lattice_step(resolution);
        let estimate = sample_count_estimate(bbox.min_x, bbox.max_x, step)
            .saturating_mul(sample_count_estimate(bbox.min_y, bbox.max_y, step));
        check_limit(estimate, self.max_samples)?;

        let precision = resolution as usize;
        let lons = axis_samples(bbox.min_x, bbox.max_x, step);
        let lats = axis_samples(bbox.min_y, bbox.max_y, step);

        // Geohash cells form a regular grid, so a sample's cell depends on its
        // longitude band and latitude band independently. One sample per band
        // on each axis yields the same cells as the full lattice.
        let lons = band_representatives(&lons, precision, |lon| (lon, lats[0]))?;
        let lats = band_representatives(&lats, precision, |lat| (lons[0], lat))?;

        let mut cells = BTreeSet::new();
        for &lat in &lats {
            for &lon in &lons {
                cells.insert(CellKey::Text(encode_sample(lon, lat, precision)?));
            }
        }

        Ok(Covering::new(
            CellScope::new(StrategyKind::Geohash, resolution),
            cells,
        ))
    }
}
