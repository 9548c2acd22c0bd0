//! Scene sources

use geo::{Intersects, Rect};
use greenup_core::crs::check_sampling_crs;
use greenup_core::scene::Scene;
use greenup_core::{DateRange, Result, CRS};

/// A collection query: scenes of `collection_id` acquired within `dates`
/// whose footprint intersects `extent`.
#[derive(Debug, Clone, Copy)]
pub struct SceneQuery<'a> {
    pub collection_id: &'a str,
    /// Sensor profile id recorded on scenes built by the source
    pub sensor: &'a str,
    pub dates: &'a DateRange,
    /// Bounding extent of the region set, in region coordinates
    pub extent: Rect<f64>,
    /// Reference system of `extent`, when known
    pub crs: Option<&'a CRS>,
}

impl SceneQuery<'_> {
    /// Whether a scene passes the collection-level filter.
    ///
    /// The footprint test is only meaningful when the scene and the extent
    /// share a reference, so scenes in another reference pass through and
    /// are reported by the pipeline instead of vanishing here.
    pub fn matches(&self, scene: &Scene) -> bool {
        if !self.dates.contains(scene.date()) {
            return false;
        }
        check_sampling_crs(scene.crs(), self.crs).is_err()
            || scene.footprint().intersects(&self.extent)
    }
}

/// Provides the scenes of a collection
pub trait ImageSource: Send + Sync {
    /// Scenes matching `query`.
    ///
    /// Sources may return more than asked; the pipeline filters again.
    fn query(&self, query: &SceneQuery<'_>) -> Result<Vec<Scene>>;
}

/// An in-memory collection
#[derive(Debug, Clone)]
pub struct MemorySource {
    collection_id: String,
    scenes: Vec<Scene>,
}

impl MemorySource {
    pub fn new(collection_id: impl Into<String>, scenes: Vec<Scene>) -> Self {
        Self {
            collection_id: collection_id.into(),
            scenes,
        }
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

impl ImageSource for MemorySource {
    fn query(&self, query: &SceneQuery<'_>) -> Result<Vec<Scene>> {
        if query.collection_id != self.collection_id {
            return Ok(Vec::new());
        }
        Ok(self
            .scenes
            .iter()
            .filter(|s| query.matches(s))
            .cloned()
            .collect())
    }
}
