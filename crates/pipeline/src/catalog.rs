//! Local STAC catalog
//!
//! Reads a STAC ItemCollection (GeoJSON FeatureCollection) whose item
//! assets are local single-band GeoTIFF files, one asset per band with the
//! asset key as band name. Relative hrefs resolve against the directory of
//! the catalog file.

use crate::source::{ImageSource, SceneQuery};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use greenup_core::io::read_band;
use greenup_core::scene::Scene;
use greenup_core::{Error, Result, CRS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A STAC Item Collection (GeoJSON FeatureCollection).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemCollection {
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<StacItem>,
}

/// A single STAC Item (GeoJSON Feature).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItem {
    /// Unique item identifier.
    pub id: String,

    pub properties: StacItemProperties,

    pub assets: BTreeMap<String, StacAsset>,

    /// Collection this item belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl StacItem {
    /// EPSG code from the `proj:epsg` property, if available.
    pub fn epsg(&self) -> Option<u32> {
        self.properties
            .extra
            .get("proj:epsg")
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
    }

    /// Acquisition time from the `datetime` property.
    ///
    /// Accepts RFC 3339 timestamps (converted to UTC), naive timestamps and
    /// plain dates.
    pub fn acquired(&self) -> Option<NaiveDateTime> {
        let s = self.properties.datetime.as_deref()?.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.naive_utc());
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(dt);
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    /// Assets that are GeoTIFF files
    pub fn band_assets(&self) -> impl Iterator<Item = (&String, &StacAsset)> {
        self.assets.iter().filter(|(_, a)| a.is_geotiff())
    }
}

/// STAC Item properties.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemProperties {
    /// ISO 8601 datetime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// Platform name (e.g., "landsat-8").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// All other properties we don't model explicitly.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A single STAC Asset (file reference).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacAsset {
    /// Path to the asset file.
    pub href: String,

    /// Media type (e.g., `"image/tiff; application=geotiff"`).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// Roles: `["data"]`, `["thumbnail"]`, etc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

impl StacAsset {
    fn is_geotiff(&self) -> bool {
        let typed = self
            .type_
            .as_ref()
            .map(|t| t.contains("geotiff") || t.contains("geo+tiff"))
            .unwrap_or(false);
        let href = self.href.to_ascii_lowercase();
        typed || href.ends_with(".tif") || href.ends_with(".tiff")
    }
}

/// STAC catalog on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalCatalog {
    root: PathBuf,
    items: StacItemCollection,
}

impl LocalCatalog {
    /// Open a catalog file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let items: StacItemCollection = serde_json::from_str(&text)?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        debug!("Opened catalog {} with {} item(s)", path.display(), items.features.len());
        Ok(Self { root, items })
    }

    pub fn len(&self) -> usize {
        self.items.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.features.is_empty()
    }

    fn resolve(&self, href: &str) -> PathBuf {
        let href = href.strip_prefix("file://").unwrap_or(href);
        let p = Path::new(href);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    /// Read every band asset of an item into a scene.
    ///
    /// Any failure here (a missing or undecodable asset, bands on different
    /// grids) only concerns this item.
    fn load(&self, item: &StacItem, sensor: &str, acquired: NaiveDateTime) -> Result<Scene> {
        let mut bands = Vec::new();
        for (key, asset) in item.band_assets() {
            bands.push((key.clone(), read_band(self.resolve(&asset.href))?));
        }

        let Some((_, first)) = bands.first() else {
            return Err(Error::Other(format!("item '{}' has no GeoTIFF assets", item.id)));
        };
        let transform = *first.transform();
        let shape = first.shape();

        let mut scene = Scene::new(item.id.as_str(), sensor, acquired, transform, shape)
            .with_crs(item.epsg().map(CRS::from_epsg));
        for (name, band) in bands {
            scene = scene.with_band(name, band)?;
        }
        Ok(scene)
    }
}

impl ImageSource for LocalCatalog {
    fn query(&self, query: &SceneQuery<'_>) -> Result<Vec<Scene>> {
        let mut scenes = Vec::new();

        for item in &self.items.features {
            if item.collection.as_deref().is_some_and(|c| c != query.collection_id) {
                continue;
            }
            let Some(acquired) = item.acquired() else {
                warn!("Item {}: missing or unparseable datetime, skipped", item.id);
                continue;
            };
            if !query.dates.contains(acquired.date()) {
                continue;
            }

            match self.load(item, query.sensor, acquired) {
                Ok(scene) if query.matches(&scene) => scenes.push(scene),
                Ok(_) => debug!("Item {}: outside the region extent", item.id),
                Err(e) => warn!("Item {}: {}, skipped", item.id, e),
            }
        }

        debug!(
            "Catalog query {} {}: {} scene(s)",
            query.collection_id,
            query.dates,
            scenes.len()
        );
        Ok(scenes)
    }
}
