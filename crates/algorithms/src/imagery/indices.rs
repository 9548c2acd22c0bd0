//! Spectral vegetation indices

use crate::imagery::band_math::band_math_binary;
use greenup_core::profile::{IndexSource, SensorProfile};
use greenup_core::raster::Raster;
use greenup_core::scene::{Band, Scene};
use greenup_core::{Result, SceneStage};
use tracing::debug;

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1] for non-negative inputs. Pixels where the
/// sum is zero or either band is no-data are no-data (NaN) in the output,
/// so they never enter a mean as a number.
pub fn normalized_difference(band_a: &Band, band_b: &Band) -> Result<Raster<f64>> {
    band_math_binary(band_a, band_b, |a, b| {
        let sum = a + b;
        if sum == 0.0 {
            f64::NAN
        } else {
            (a - b) / sum
        }
    })
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
pub fn ndvi(nir: &Band, red: &Band) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// Scene stage attaching a computed index band
#[derive(Debug, Clone)]
pub struct IndexCalculator {
    nir: String,
    red: String,
    output: String,
}

impl IndexCalculator {
    pub fn new(nir: impl Into<String>, red: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            nir: nir.into(),
            red: red.into(),
            output: output.into(),
        }
    }

    /// `None` when the sensor ships its index precomputed
    pub fn from_profile(profile: &SensorProfile) -> Option<Self> {
        match &profile.index {
            IndexSource::Computed { nir, red, output } => Some(Self::new(nir, red, output)),
            IndexSource::Precomputed { .. } => None,
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }
}

impl SceneStage for IndexCalculator {
    fn name(&self) -> &'static str {
        "index"
    }

    fn apply(&self, scene: &Scene) -> Result<Scene> {
        let nir = scene.require_band(&self.nir)?;
        let red = scene.require_band(&self.red)?;
        let index = ndvi(nir, red)?;
        debug!("Scene {}: computed '{}'", scene.id(), self.output);
        scene.clone().with_band(self.output.as_str(), index)
    }
}
