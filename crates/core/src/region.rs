//! Sample regions: the fixed set of points and polygons a run aggregates over

use crate::crs::CRS;
use crate::error::{Error, Result};
use geo::{Area, BoundingRect};
use geo_types::{coord, Coord, Geometry, LineString, MultiPoint, MultiPolygon, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// GeoJSON-shaped geometry as it appears in run configuration.
///
/// ```json
/// { "type": "Point", "coordinates": [-109.96, 53.853] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum GeometrySpec {
    Point([f64; 2]),
    MultiPoint(Vec<[f64; 2]>),
    Polygon(Vec<Vec<[f64; 2]>>),
    MultiPolygon(Vec<Vec<Vec<[f64; 2]>>>),
}

/// Configuration form of a region: identifier, geometry and free attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub id: String,
    pub geometry: GeometrySpec,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

/// A validated sample region
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    id: String,
    geometry: Geometry<f64>,
    attributes: BTreeMap<String, String>,
}

impl Region {
    /// Build a region, rejecting empty or malformed geometry
    pub fn new(id: impl Into<String>, geometry: Geometry<f64>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(geometry_error(&id, "region id is empty"));
        }
        validate_geometry(&id, &geometry)?;
        Ok(Self {
            id,
            geometry,
            attributes: BTreeMap::new(),
        })
    }

    /// Build a region from its configuration form
    pub fn from_spec(spec: &RegionSpec) -> Result<Self> {
        let geometry = to_geometry(&spec.id, &spec.geometry)?;
        let mut region = Self::new(spec.id.clone(), geometry)?;
        region.attributes = spec.attributes.clone();
        Ok(region)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn geometry(&self) -> &Geometry<f64> {
        &self.geometry
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// First attribute key that is one of `names`
    pub fn attribute_named(&self, names: &[&str]) -> Option<&str> {
        self.attributes
            .keys()
            .map(String::as_str)
            .find(|k| names.contains(k))
    }
}

/// Error for a region attribute that would shadow a record column
pub fn attribute_clash(region: &str, key: &str) -> Error {
    Error::InvalidParameter {
        name: "regions",
        value: key.to_string(),
        reason: format!("attribute of region '{}' clashes with an output column", region),
    }
}

/// Record columns that region attributes may not reuse
pub const RESERVED_ATTRIBUTES: [&str; 5] = ["region_id", "scene_id", "date", "year", "doy"];

/// The region set of a run.
///
/// Built once and shared read-only by every scene; there is no way to add,
/// remove or edit a region after construction.
#[derive(Debug, Clone)]
pub struct RegionSet {
    regions: Vec<Region>,
    extent: Rect<f64>,
    crs: Option<CRS>,
}

impl RegionSet {
    /// Build a region set. Fails on an empty set, duplicate ids or an
    /// attribute named like a record column.
    pub fn new(regions: Vec<Region>) -> Result<Self> {
        if regions.is_empty() {
            return Err(Error::InvalidParameter {
                name: "regions",
                value: "[]".into(),
                reason: "at least one region is required".into(),
            });
        }

        let mut seen = HashSet::new();
        for region in &regions {
            if !seen.insert(region.id.as_str()) {
                return Err(geometry_error(&region.id, "duplicate region id"));
            }
            if let Some(key) = region.attribute_named(&RESERVED_ATTRIBUTES) {
                return Err(attribute_clash(&region.id, key));
            }
        }

        let extent = regions
            .iter()
            .filter_map(|r| r.geometry.bounding_rect())
            .reduce(merge_rects)
            .ok_or_else(|| geometry_error(&regions[0].id, "region set has no extent"))?;

        Ok(Self {
            regions,
            extent,
            crs: None,
        })
    }

    /// Build a region set from configuration
    pub fn from_specs(specs: &[RegionSpec]) -> Result<Self> {
        let regions = specs.iter().map(Region::from_spec).collect::<Result<Vec<_>>>()?;
        Self::new(regions)
    }

    pub fn with_crs(mut self, crs: Option<CRS>) -> Self {
        self.crs = crs;
        self
    }

    /// Bounding rectangle of every region geometry
    pub fn extent(&self) -> Rect<f64> {
        self.extent
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn get(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn as_slice(&self) -> &[Region] {
        &self.regions
    }
}

fn geometry_error(id: &str, reason: impl Into<String>) -> Error {
    Error::RegionGeometry {
        id: id.to_string(),
        reason: reason.into(),
    }
}

fn merge_rects(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
        coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
    )
}

fn to_coord(c: &[f64; 2]) -> Coord<f64> {
    coord! { x: c[0], y: c[1] }
}

fn to_polygon(id: &str, rings: &[Vec<[f64; 2]>]) -> Result<Polygon<f64>> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| geometry_error(id, "polygon has no rings"))?;
    let ring = |r: &Vec<[f64; 2]>| LineString::from(r.iter().map(to_coord).collect::<Vec<_>>());
    Ok(Polygon::new(ring(exterior), interiors.iter().map(ring).collect()))
}

fn to_geometry(id: &str, spec: &GeometrySpec) -> Result<Geometry<f64>> {
    let geometry = match spec {
        GeometrySpec::Point(c) => Geometry::Point(Point(to_coord(c))),
        GeometrySpec::MultiPoint(cs) => {
            Geometry::MultiPoint(MultiPoint(cs.iter().map(|c| Point(to_coord(c))).collect()))
        }
        GeometrySpec::Polygon(rings) => Geometry::Polygon(to_polygon(id, rings)?),
        GeometrySpec::MultiPolygon(polys) => Geometry::MultiPolygon(MultiPolygon(
            polys
                .iter()
                .map(|rings| to_polygon(id, rings))
                .collect::<Result<Vec<_>>>()?,
        )),
    };
    Ok(geometry)
}

fn check_finite(id: &str, c: &Coord<f64>) -> Result<()> {
    if c.x.is_finite() && c.y.is_finite() {
        Ok(())
    } else {
        Err(geometry_error(id, format!("non-finite coordinate ({}, {})", c.x, c.y)))
    }
}

fn validate_polygon(id: &str, polygon: &Polygon<f64>) -> Result<()> {
    // A closed ring needs at least three distinct vertices plus the closing one.
    if polygon.exterior().0.len() < 4 {
        return Err(geometry_error(id, "polygon exterior needs at least 3 vertices"));
    }
    for c in polygon.exterior().coords() {
        check_finite(id, c)?;
    }
    if polygon.unsigned_area() <= 0.0 {
        return Err(geometry_error(id, "polygon has zero area"));
    }
    Ok(())
}

fn validate_geometry(id: &str, geometry: &Geometry<f64>) -> Result<()> {
    match geometry {
        Geometry::Point(p) => check_finite(id, &p.0),
        Geometry::MultiPoint(mp) => {
            if mp.0.is_empty() {
                return Err(geometry_error(id, "multipoint is empty"));
            }
            mp.0.iter().try_for_each(|p| check_finite(id, &p.0))
        }
        Geometry::Polygon(polygon) => validate_polygon(id, polygon),
        Geometry::MultiPolygon(mp) => {
            if mp.0.is_empty() {
                return Err(geometry_error(id, "multipolygon is empty"));
            }
            mp.0.iter().try_for_each(|p| validate_polygon(id, p))
        }
        _ => Err(geometry_error(
            id,
            "only Point, MultiPoint, Polygon and MultiPolygon regions are supported",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn point(id: &str, x: f64, y: f64) -> RegionSpec {
        RegionSpec {
            id: id.into(),
            geometry: GeometrySpec::Point([x, y]),
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_geojson_shape() {
        let json = r#"{"id": "0", "geometry": {"type": "Point", "coordinates": [-109.96, 53.853]}}"#;
        let spec: RegionSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.geometry, GeometrySpec::Point([-109.96, 53.853]));

        let region = Region::from_spec(&spec).unwrap();
        assert_eq!(region.id(), "0");
    }

    #[test]
    fn test_extent_covers_all_regions() {
        let set = RegionSet::from_specs(&[
            point("0", -109.96, 53.853),
            point("1", -109.92, 53.851),
            point("2", -109.94, 53.854),
        ])
        .unwrap();

        let extent = set.extent();
        assert_relative_eq!(extent.min().x, -109.96);
        assert_relative_eq!(extent.max().x, -109.92);
        assert_relative_eq!(extent.min().y, 53.851);
        assert_relative_eq!(extent.max().y, 53.854);
    }

    #[test]
    fn test_rejects_degenerate_polygon() {
        let spec = RegionSpec {
            id: "flat".into(),
            geometry: GeometrySpec::Polygon(vec![vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [0.0, 0.0]]]),
            attributes: BTreeMap::new(),
        };
        let err = Region::from_spec(&spec).unwrap_err();
        assert!(matches!(err, Error::RegionGeometry { ref id, .. } if id == "flat"));
    }

    #[test]
    fn test_rejects_empty_geometry() {
        let spec = RegionSpec {
            id: "none".into(),
            geometry: GeometrySpec::MultiPoint(vec![]),
            attributes: BTreeMap::new(),
        };
        assert!(matches!(Region::from_spec(&spec), Err(Error::RegionGeometry { .. })));

        let spec = RegionSpec {
            id: "ringless".into(),
            geometry: GeometrySpec::Polygon(vec![]),
            attributes: BTreeMap::new(),
        };
        assert!(matches!(Region::from_spec(&spec), Err(Error::RegionGeometry { .. })));
    }

    #[test]
    fn test_rejects_non_finite_point() {
        assert!(Region::from_spec(&point("nan", f64::NAN, 1.0)).is_err());
    }

    #[test]
    fn test_rejects_duplicates_and_empty_set() {
        let dup = RegionSet::from_specs(&[point("a", 0.0, 0.0), point("a", 1.0, 1.0)]);
        assert!(matches!(dup, Err(Error::RegionGeometry { .. })));

        assert!(RegionSet::from_specs(&[]).is_err());
    }

    #[test]
    fn test_rejects_attribute_named_like_a_column() {
        let mut spec = point("0", 0.0, 0.0);
        spec.attributes.insert("date".into(), "2019-07-15".into());
        let err = RegionSet::from_specs(&[spec]).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "regions", ref value, .. } if value == "date"));

        let mut spec = point("0", 0.0, 0.0);
        spec.attributes.insert("id".into(), "0".into());
        assert!(RegionSet::from_specs(&[spec]).is_ok());
    }
}
