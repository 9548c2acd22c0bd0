//! Region statistics
//!
//! - Region mean: per-band mean over each sample region at a fixed resolution,
//!   with the sampling locations planned once per run
//! - Sampler: attaches scene date, year and doy to the region means

mod region_mean;
mod sampler;

pub use region_mean::{
    sample_locations, GridMeanReducer, RegionReducer, SamplingPlan, MAX_SAMPLES_PER_REGION,
};
pub use sampler::RegionSampler;
