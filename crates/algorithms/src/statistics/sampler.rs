//! Region sampling of processed scenes

use crate::statistics::region_mean::{RegionReducer, SamplingPlan};
use greenup_core::record::RegionAggregate;
use greenup_core::scene::Scene;
use greenup_core::{Error, Result};

/// Attaches scene metadata to the per-region means of a reducer.
///
/// The scene must already be annotated (it needs a `year`) and carry the
/// index band.
pub struct RegionSampler<'a, R: RegionReducer + ?Sized> {
    reducer: &'a R,
    plan: &'a SamplingPlan,
    index_band: String,
}

impl<'a, R: RegionReducer + ?Sized> RegionSampler<'a, R> {
    pub fn new(reducer: &'a R, plan: &'a SamplingPlan, index_band: impl Into<String>) -> Self {
        Self {
            reducer,
            plan,
            index_band: index_band.into(),
        }
    }

    pub fn resolution(&self) -> f64 {
        self.plan.resolution()
    }

    pub fn index_band(&self) -> &str {
        &self.index_band
    }

    /// One aggregate per region of the plan. The index value may be undefined.
    pub fn sample(&self, scene: &Scene) -> Result<Vec<RegionAggregate>> {
        let year = scene
            .year()
            .ok_or_else(|| Error::missing_band("year", scene.sensor()))?;
        scene.require_band(&self.index_band)?;

        let means = self.reducer.reduce_planned(scene, self.plan)?;
        let regions = self.plan.regions();

        Ok(means
            .into_iter()
            .map(|m| RegionAggregate {
                attributes: regions
                    .get(&m.region_id)
                    .map(|r| r.attributes().clone())
                    .unwrap_or_default(),
                region_id: m.region_id,
                scene_id: scene.id().to_string(),
                date: scene.date(),
                year,
                doy: scene.doy(),
                values: m.means,
            })
            .collect())
    }
}
