//! Per-region aggregates and the flat sample records exported from a run

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Mean of every band over one region, as returned by a region reducer.
///
/// `None` means the band had no valid pixel inside the region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMeans {
    pub region_id: String,
    pub means: BTreeMap<String, Option<f64>>,
}

/// Region means with the identifying metadata of their scene copied on
#[derive(Debug, Clone, PartialEq)]
pub struct RegionAggregate {
    pub region_id: String,
    /// Identifying attributes of the region, exported as columns
    pub attributes: BTreeMap<String, String>,
    pub scene_id: String,
    pub date: NaiveDate,
    pub year: i32,
    pub doy: Option<u32>,
    pub values: BTreeMap<String, Option<f64>>,
}

impl RegionAggregate {
    /// Whether `band` has a defined value
    pub fn is_defined(&self, band: &str) -> bool {
        matches!(self.values.get(band), Some(Some(v)) if v.is_finite())
    }
}

/// One exported row: a (scene, region) pair with a defined index value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRecord {
    pub region_id: String,
    pub attributes: BTreeMap<String, String>,
    pub scene_id: String,
    pub date: NaiveDate,
    pub year: i32,
    pub doy: Option<u32>,
    pub index_band: String,
    pub index: f64,
    /// Every other sampled band, including `mask`
    pub bands: BTreeMap<String, Option<f64>>,
}

impl SampleRecord {
    /// Convert an aggregate, failing with [`Error::UndefinedAggregate`] when
    /// the index band has no value.
    pub fn try_from_aggregate(mut agg: RegionAggregate, index_band: &str) -> Result<Self> {
        let index = match agg.values.remove(index_band) {
            Some(Some(v)) if v.is_finite() => v,
            _ => {
                return Err(Error::UndefinedAggregate {
                    region: agg.region_id,
                    scene: agg.scene_id,
                    band: index_band.to_string(),
                })
            }
        };

        Ok(Self {
            region_id: agg.region_id,
            attributes: agg.attributes,
            scene_id: agg.scene_id,
            date: agg.date,
            year: agg.year,
            doy: agg.doy,
            index_band: index_band.to_string(),
            index,
            bands: agg.values,
        })
    }

    /// Value of any sampled band, the index included
    pub fn value(&self, band: &str) -> Option<f64> {
        if band == self.index_band {
            return Some(self.index);
        }
        self.bands.get(band).copied().flatten()
    }
}

/// Drop aggregates whose index value is undefined.
///
/// Applying this twice gives the same result as applying it once.
pub fn drop_undefined(aggregates: Vec<RegionAggregate>, index_band: &str) -> Vec<RegionAggregate> {
    aggregates
        .into_iter()
        .filter(|a| a.is_defined(index_band))
        .collect()
}

/// Flatten per-scene aggregates into sample records.
///
/// Undefined-index pairs are dropped, not kept with a null value. The
/// result is ordered by region id, then date, then scene id. Returns the
/// records and the number of dropped pairs.
pub fn flatten_records(
    per_scene: Vec<Vec<RegionAggregate>>,
    index_band: &str,
) -> (Vec<SampleRecord>, usize) {
    let mut dropped = 0;
    let mut records: Vec<SampleRecord> = per_scene
        .into_iter()
        .flatten()
        .filter_map(|agg| match SampleRecord::try_from_aggregate(agg, index_band) {
            Ok(record) => Some(record),
            Err(_) => {
                dropped += 1;
                None
            }
        })
        .collect();

    records.sort_by(|a, b| {
        a.region_id
            .cmp(&b.region_id)
            .then(a.date.cmp(&b.date))
            .then_with(|| a.scene_id.cmp(&b.scene_id))
    });

    (records, dropped)
}
