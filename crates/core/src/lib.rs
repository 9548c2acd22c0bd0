//! # Greenup Core
//!
//! Core types and I/O for sampling vegetation-index time series from
//! multispectral scene collections.
//!
//! This crate provides:
//! - `Raster<T>` and `GeoTransform`: georeferenced band grids
//! - `Scene` / `Band`: one acquisition with one raster per band
//! - `Region` / `RegionSet`: the fixed sample geometries of a run
//! - `SensorProfile`: per-sensor band names, constants and index source
//! - `RegionAggregate` / `SampleRecord`: sampling results
//! - `SceneStage`: the per-scene transform capability
//! - GeoTIFF band I/O for local catalogs

pub mod crs;
pub mod date_range;
pub mod error;
pub mod io;
pub mod profile;
pub mod raster;
pub mod record;
pub mod region;
pub mod scene;
pub mod selector;

pub use crs::CRS;
pub use date_range::DateRange;
pub use error::{Error, Result};
pub use profile::{BandClass, IndexSource, MaskPolicy, QualityBands, SensorProfile, TemporalFields};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use record::{RegionAggregate, RegionMeans, SampleRecord};
pub use region::{GeometrySpec, Region, RegionSet, RegionSpec};
pub use scene::{Band, Scene};
pub use selector::BandSelector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::profile::SensorProfile;
    pub use crate::raster::{GeoTransform, Raster};
    pub use crate::region::{Region, RegionSet};
    pub use crate::scene::{Band, Scene};
    pub use crate::SceneStage;
}

/// A per-scene transform.
///
/// Stages take a scene by reference and hand back a new, fully described
/// scene; the input is left untouched. A pipeline is an ordered list of
/// stages applied one after the other.
pub trait SceneStage: Send + Sync {
    /// Short stage name used in logs
    fn name(&self) -> &'static str;

    /// Transform one scene
    fn apply(&self, scene: &Scene) -> Result<Scene>;
}
