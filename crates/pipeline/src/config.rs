//! Run configuration
//!
//! A run is described by one JSON document:
//!
//! ```json
//! {
//!   "sensorProfile": "landsat8-c2-l2",
//!   "dateRangeStart": "2015-01-01",
//!   "dateRangeEnd": "2020-01-01",
//!   "regions": [
//!     { "id": "0", "geometry": { "type": "Point", "coordinates": [500015.0, 5400015.0] } }
//!   ],
//!   "regionsCrs": { "epsg": 32613 },
//!   "outputDescription": "sampled-ndvi-Landsat-LC08-T1-L2"
//! }
//! ```
//!
//! Region coordinates are not reprojected. They must be given in the
//! reference of the scene grids (UTM zone 13N above) and tagged with
//! `regionsCrs`; scenes that carry a reference the regions do not share
//! are skipped and listed in the run report.

use crate::strategy::ProcessingMode;
use greenup_core::profile::{MaskPolicy, SensorProfile};
use greenup_core::region::{RegionSet, RegionSpec};
use greenup_core::{DateRange, Error, Result, CRS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A built-in profile name or a full inline profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileRef {
    Builtin(String),
    Inline(Box<SensorProfile>),
}

impl ProfileRef {
    pub fn resolve(&self) -> Result<SensorProfile> {
        match self {
            ProfileRef::Builtin(id) => SensorProfile::builtin(id).ok_or_else(|| {
                let known: Vec<String> =
                    SensorProfile::builtins().into_iter().map(|p| p.id).collect();
                Error::Config(format!(
                    "unknown sensor profile '{}' (built-in: {})",
                    id,
                    known.join(", ")
                ))
            }),
            ProfileRef::Inline(profile) => Ok(profile.as_ref().clone()),
        }
    }
}

/// Everything a run needs besides the catalog and the output location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub sensor_profile: ProfileRef,
    pub date_range_start: String,
    pub date_range_end: String,
    pub regions: Vec<RegionSpec>,
    /// Output table name; the profile's default description when empty
    #[serde(default)]
    pub output_description: String,
    /// Overrides the profile's mask policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_policy: Option<MaskPolicy>,
    /// Worker threads; every core when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    /// Reference system of the region coordinates. Without it the regions
    /// can only sample scenes whose grid carries no reference either.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions_crs: Option<CRS>,
}

impl RunConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Resolved and validated sensor profile, with the mask policy override applied
    pub fn profile(&self) -> Result<SensorProfile> {
        let mut profile = self.sensor_profile.resolve()?;
        if let Some(policy) = self.mask_policy {
            profile.mask_policy = policy;
        }
        profile.validate()?;
        Ok(profile)
    }

    pub fn date_range(&self) -> Result<DateRange> {
        DateRange::parse(&self.date_range_start, &self.date_range_end)
    }

    pub fn region_set(&self) -> Result<RegionSet> {
        Ok(RegionSet::from_specs(&self.regions)?.with_crs(self.regions_crs.clone()))
    }

    pub fn processing_mode(&self) -> Result<ProcessingMode> {
        ProcessingMode::from_threads(self.threads)
    }

    /// Output description, falling back to the profile default
    pub fn description(&self, profile: &SensorProfile) -> Result<String> {
        let description = match self.output_description.trim() {
            "" => profile.default_description.trim(),
            d => d,
        };
        if description.is_empty() {
            return Err(Error::Config("output description is empty".into()));
        }
        if description.contains(&['/', '\\'][..]) {
            return Err(Error::InvalidParameter {
                name: "outputDescription",
                value: description.to_string(),
                reason: "must not contain path separators".into(),
            });
        }
        Ok(description.to_string())
    }
}
