//! Sensor profiles: everything that differs between sensors, as data

use crate::error::{Error, Result};
use crate::selector::BandSelector;
use serde::{Deserialize, Serialize};

/// How the quality and saturation words turn into a mask score.
///
/// `FlagOnNonzero` raises the score for degraded pixels: a pixel counts as
/// quality-flagged when any of the configured quality bits is set, and as
/// saturated when its saturation word is nonzero. `FlagOnZero` inverts both
/// tests, which raises the score for clean pixels instead; it only exists to
/// reproduce older exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaskPolicy {
    #[default]
    FlagOnNonzero,
    FlagOnZero,
}

impl MaskPolicy {
    /// Advisory text when this policy differs from the default
    pub fn advisory(&self) -> Option<String> {
        match self {
            MaskPolicy::FlagOnNonzero => None,
            MaskPolicy::FlagOnZero => Some(
                "mask policy 'flag-on-zero' scores clean pixels higher than degraded ones; \
                 the default is 'flag-on-nonzero'"
                    .to_string(),
            ),
        }
    }
}

/// A class of bands sharing one linear rescale `value * scale + offset`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandClass {
    pub selector: BandSelector,
    pub scale: f64,
    pub offset: f64,
}

impl BandClass {
    pub fn new(selector: BandSelector, scale: f64, offset: f64) -> Self {
        Self { selector, scale, offset }
    }

    pub fn rescale(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }
}

fn default_qa_bits() -> u32 {
    0b11111
}

/// The raw bitmask bands of a sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityBands {
    /// Quality flag word (fill, dilated cloud, cirrus, cloud, cloud shadow, ...)
    pub qa_band: String,
    /// Radiometric saturation word
    pub saturation_band: String,
    /// Bits of the quality word that flag a pixel. Bits 0-4 by default.
    #[serde(default = "default_qa_bits")]
    pub qa_bits: u32,
}

/// Where the vegetation index of a scene comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum IndexSource {
    /// `(nir - red) / (nir + red)` computed per pixel into `output`
    Computed { nir: String, red: String, output: String },
    /// The scene already carries the index as `band`
    Precomputed { band: String },
}

impl IndexSource {
    /// Name of the index band in processed scenes and sample records
    pub fn band_name(&self) -> &str {
        match self {
            IndexSource::Computed { output, .. } => output,
            IndexSource::Precomputed { band } => band,
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, IndexSource::Computed { .. })
    }
}

/// Which temporal fields are attached to each scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemporalFields {
    YearAndDoy,
    YearOnly,
}

/// Per-sensor configuration driving every stage of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorProfile {
    pub id: String,
    pub collection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optical: Option<BandClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal: Option<BandClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityBands>,
    #[serde(default)]
    pub mask_policy: MaskPolicy,
    pub index: IndexSource,
    pub temporal: TemporalFields,
    /// Ground sampling distance used for region aggregation, in the linear
    /// units of the scene grid
    pub resolution: f64,
    #[serde(default)]
    pub default_description: String,
}

impl SensorProfile {
    /// Landsat 8 Collection 2 Level 2 surface reflectance
    pub fn landsat8_c2_l2() -> Self {
        Self {
            id: "landsat8-c2-l2".into(),
            collection_id: "LANDSAT/LC08/C02/T1_L2".into(),
            optical: Some(BandClass::new(BandSelector::regex("SR_B."), 0.0000275, -0.2)),
            thermal: Some(BandClass::new(BandSelector::regex("ST_B.*"), 0.00341802, 149.0)),
            quality: Some(QualityBands {
                qa_band: "QA_PIXEL".into(),
                saturation_band: "QA_RADSAT".into(),
                qa_bits: default_qa_bits(),
            }),
            mask_policy: MaskPolicy::FlagOnNonzero,
            index: IndexSource::Computed {
                nir: "SR_B5".into(),
                red: "SR_B4".into(),
                output: "ndvi".into(),
            },
            temporal: TemporalFields::YearAndDoy,
            resolution: 30.0,
            default_description: "sampled-ndvi-Landsat-LC08-T1-L2".into(),
        }
    }

    /// MODIS MOD13Q1 16-day vegetation indices, which ship NDVI precomputed
    pub fn modis_mod13q1() -> Self {
        Self {
            id: "modis-mod13q1".into(),
            collection_id: "MODIS/006/MOD13Q1".into(),
            optical: None,
            thermal: None,
            quality: None,
            mask_policy: MaskPolicy::FlagOnNonzero,
            index: IndexSource::Precomputed { band: "NDVI".into() },
            temporal: TemporalFields::YearOnly,
            resolution: 250.0,
            default_description: "sampled-ndvi-modis-MOD13Q1".into(),
        }
    }

    /// All built-in profiles
    pub fn builtins() -> Vec<SensorProfile> {
        vec![Self::landsat8_c2_l2(), Self::modis_mod13q1()]
    }

    /// Look up a built-in profile by id
    pub fn builtin(id: &str) -> Option<SensorProfile> {
        Self::builtins().into_iter().find(|p| p.id == id)
    }

    /// Whether the scale/mask stage has anything to do for this sensor
    pub fn needs_scale_mask(&self) -> bool {
        self.optical.is_some() || self.thermal.is_some() || self.quality.is_some()
    }

    pub fn index_band(&self) -> &str {
        self.index.band_name()
    }

    /// Check constants and patterns before any scene is touched
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Config("sensor profile id is empty".into()));
        }
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(Error::InvalidParameter {
                name: "resolution",
                value: self.resolution.to_string(),
                reason: "must be a positive finite number".into(),
            });
        }
        for class in self.optical.iter().chain(self.thermal.iter()) {
            if !(class.scale.is_finite() && class.offset.is_finite()) {
                return Err(Error::InvalidParameter {
                    name: "scale",
                    value: format!("{} / {}", class.scale, class.offset),
                    reason: "scale and offset must be finite".into(),
                });
            }
            class.selector.validate()?;
        }
        if let Some(q) = &self.quality {
            if q.qa_bits == 0 {
                return Err(Error::InvalidParameter {
                    name: "qaBits",
                    value: "0".into(),
                    reason: "at least one quality bit must be tested".into(),
                });
            }
        }
        if self.index_band().trim().is_empty() {
            return Err(Error::Config("index band name is empty".into()));
        }
        Ok(())
    }
}
