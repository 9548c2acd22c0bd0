//! # Greenup Algorithms
//!
//! Per-scene transforms and region sampling for Greenup.
//!
//! ## Available Algorithm Categories
//!
//! - **imagery**: band math, radiometric scaling, quality mask, NDVI
//! - **temporal**: year and day-of-year annotation
//! - **statistics**: per-region band means and the region sampler

pub(crate) mod maybe_rayon;

pub mod imagery;
pub mod statistics;
pub mod temporal;

use greenup_core::{SceneStage, SensorProfile};

/// Ordered per-scene stages for a sensor: scale/mask when the profile
/// declares band classes or quality bands, then annotate, then the index
/// when it is computed.
pub fn stages_for(profile: &SensorProfile) -> Vec<Box<dyn SceneStage>> {
    let mut stages: Vec<Box<dyn SceneStage>> = Vec::new();
    if profile.needs_scale_mask() {
        stages.push(Box::new(imagery::BandScalerMasker::from_profile(profile)));
    }
    stages.push(Box::new(temporal::TemporalAnnotator::from_profile(profile)));
    if let Some(calc) = imagery::IndexCalculator::from_profile(profile) {
        stages.push(Box::new(calc));
    }
    stages
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        band_math, band_math_binary, mask_band, mask_score, ndvi, normalized_difference,
        BandScalerMasker, IndexCalculator, MASK_BAND,
    };
    pub use crate::statistics::{GridMeanReducer, RegionReducer, RegionSampler, SamplingPlan};
    pub use crate::temporal::{date_from_year_doy, day_of_year, TemporalAnnotator};
    pub use crate::stages_for;
    pub use greenup_core::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_per_sensor() {
        let names: Vec<_> = stages_for(&SensorProfile::landsat8_c2_l2())
            .iter()
            .map(|s| s.name())
            .collect();
        assert_eq!(names, vec!["scale-mask", "annotate", "index"]);

        let names: Vec<_> = stages_for(&SensorProfile::modis_mod13q1())
            .iter()
            .map(|s| s.name())
            .collect();
        assert_eq!(names, vec!["annotate"]);
    }
}
