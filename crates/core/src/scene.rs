//! Scenes: one acquisition of one sensor, with one raster per band

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};
use chrono::{NaiveDate, NaiveDateTime};
use geo::Rect;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A single band raster.
///
/// Raw quality and saturation words are unsigned integers; scaled
/// reflectance, temperature and index bands are `f64`; the mask score is `u8`.
#[derive(Debug, Clone, PartialEq)]
pub enum Band {
    U8(Raster<u8>),
    U16(Raster<u16>),
    F64(Raster<f64>),
}

impl Band {
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Band::U8(r) => r.shape(),
            Band::U16(r) => r.shape(),
            Band::F64(r) => r.shape(),
        }
    }

    /// Value at (row, col) as `f64`, `None` for no-data or out-of-bounds cells
    pub fn valid_f64(&self, row: usize, col: usize) -> Option<f64> {
        match self {
            Band::U8(r) => r.valid_f64(row, col),
            Band::U16(r) => r.valid_f64(row, col),
            Band::F64(r) => r.valid_f64(row, col),
        }
    }

    /// Whether the band holds integer words (a bitmask can be decoded from it)
    pub fn is_integer(&self) -> bool {
        !matches!(self, Band::F64(_))
    }

    pub fn transform(&self) -> &GeoTransform {
        match self {
            Band::U8(r) => r.transform(),
            Band::U16(r) => r.transform(),
            Band::F64(r) => r.transform(),
        }
    }

    /// Integer word at (row, col); `None` for float bands or no-data cells
    pub fn word(&self, row: usize, col: usize) -> Option<u32> {
        match self {
            Band::U8(r) => r.get(row, col).ok().filter(|v| !r.is_nodata(*v)).map(u32::from),
            Band::U16(r) => r.get(row, col).ok().filter(|v| !r.is_nodata(*v)).map(u32::from),
            Band::F64(_) => None,
        }
    }
}

impl From<Raster<u8>> for Band {
    fn from(r: Raster<u8>) -> Self {
        Band::U8(r)
    }
}

impl From<Raster<u16>> for Band {
    fn from(r: Raster<u16>) -> Self {
        Band::U16(r)
    }
}

impl From<Raster<f64>> for Band {
    fn from(r: Raster<f64>) -> Self {
        Band::F64(r)
    }
}

/// One satellite observation.
///
/// A `Scene` is never mutated once built: every `with_*` method consumes the
/// value and returns a new one, and band rasters are shared between the
/// input and output of a stage through `Arc`.
#[derive(Debug, Clone)]
pub struct Scene {
    id: String,
    sensor: String,
    acquired: NaiveDateTime,
    transform: GeoTransform,
    shape: (usize, usize),
    crs: Option<CRS>,
    bands: BTreeMap<String, Arc<Band>>,
    year: Option<i32>,
    doy: Option<u32>,
}

impl Scene {
    /// Create an empty scene on a `rows` x `cols` grid
    pub fn new(
        id: impl Into<String>,
        sensor: impl Into<String>,
        acquired: NaiveDateTime,
        transform: GeoTransform,
        shape: (usize, usize),
    ) -> Self {
        Self {
            id: id.into(),
            sensor: sensor.into(),
            acquired,
            transform,
            shape,
            crs: None,
            bands: BTreeMap::new(),
            year: None,
            doy: None,
        }
    }

    pub fn with_crs(mut self, crs: Option<CRS>) -> Self {
        self.crs = crs;
        self
    }

    /// Add or replace a band. The band must match the scene grid.
    pub fn with_band(mut self, name: impl Into<String>, band: impl Into<Band>) -> Result<Self> {
        let band = band.into();
        let (er, ec) = self.shape;
        let (ar, ac) = band.shape();
        if (er, ec) != (ar, ac) {
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        self.bands.insert(name.into(), Arc::new(band));
        Ok(self)
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_doy(mut self, doy: u32) -> Self {
        self.doy = Some(doy);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sensor(&self) -> &str {
        &self.sensor
    }

    pub fn acquired(&self) -> NaiveDateTime {
        self.acquired
    }

    pub fn date(&self) -> NaiveDate {
        self.acquired.date()
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn doy(&self) -> Option<u32> {
        self.doy
    }

    /// Bounding rectangle of the scene grid
    pub fn footprint(&self) -> Rect<f64> {
        self.transform.footprint(self.shape.0, self.shape.1)
    }

    pub fn band(&self, name: &str) -> Option<&Band> {
        self.bands.get(name).map(|b| b.as_ref())
    }

    /// Like [`Scene::band`], but a missing band is a [`Error::MissingBand`]
    pub fn require_band(&self, name: &str) -> Result<&Band> {
        self.band(name)
            .ok_or_else(|| Error::missing_band(name, self.sensor.as_str()))
    }

    /// Band names in sorted order
    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    pub fn bands(&self) -> impl Iterator<Item = (&str, &Band)> {
        self.bands.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acquired() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 7, 15)
            .unwrap()
            .and_hms_opt(18, 2, 11)
            .unwrap()
    }

    #[test]
    fn test_with_band_checks_grid() {
        let scene = Scene::new("s1", "landsat8-c2-l2", acquired(), GeoTransform::default(), (2, 2));
        let scene = scene.with_band("SR_B4", Raster::<u16>::new(2, 2)).unwrap();
        assert!(scene.band("SR_B4").is_some());

        let err = scene.with_band("SR_B5", Raster::<u16>::new(3, 2)).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { .. }));
    }

    #[test]
    fn test_stage_outputs_do_not_alias() {
        let base = Scene::new("s1", "landsat8-c2-l2", acquired(), GeoTransform::default(), (1, 1))
            .with_band("SR_B4", Raster::<u16>::filled(1, 1, 7))
            .unwrap();
        let next = base
            .clone()
            .with_band("SR_B4", Raster::<f64>::filled(1, 1, 0.5))
            .unwrap()
            .with_year(2019);

        assert!(matches!(base.band("SR_B4"), Some(Band::U16(_))));
        assert!(matches!(next.band("SR_B4"), Some(Band::F64(_))));
        assert_eq!(base.year(), None);
        assert_eq!(next.year(), Some(2019));
    }

    #[test]
    fn test_require_band() {
        let scene = Scene::new("s1", "modis-mod13q1", acquired(), GeoTransform::default(), (1, 1));
        match scene.require_band("NDVI") {
            Err(Error::MissingBand { band, sensor }) => {
                assert_eq!(band, "NDVI");
                assert_eq!(sensor, "modis-mod13q1");
            }
            other => panic!("expected MissingBand, got {:?}", other),
        }
    }
}
