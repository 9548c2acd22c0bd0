//! Mean of every scene band over each region
//!
//! Regions are sampled on a grid of the requested resolution: each sampling
//! location is mapped to the native pixel that contains it, and the band
//! values of those pixels are averaged, skipping no-data.

use crate::maybe_rayon::*;
use geo::{BoundingRect, Contains, Coord, Geometry, Point, Polygon};
use greenup_core::record::RegionMeans;
use greenup_core::crs::check_sampling_crs;
use greenup_core::region::{Region, RegionSet};
use greenup_core::scene::Scene;
use greenup_core::{Error, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Upper bound on sampling locations for a single region
pub const MAX_SAMPLES_PER_REGION: usize = 4_000_000;

/// Reduces every band of a scene to one mean per region
pub trait RegionReducer: Send + Sync {
    /// One [`RegionMeans`] per region, in region-set order
    fn reduce_mean(&self, scene: &Scene, regions: &RegionSet, resolution: f64)
        -> Result<Vec<RegionMeans>>;

    /// Same as [`reduce_mean`](Self::reduce_mean) over the regions and
    /// resolution of a plan built once per run. Reducers that place their
    /// own samples ignore the precomputed locations.
    fn reduce_planned(&self, scene: &Scene, plan: &SamplingPlan) -> Result<Vec<RegionMeans>> {
        self.reduce_mean(scene, plan.regions(), plan.resolution())
    }
}

/// Sampling locations of every region at one resolution.
///
/// Locations depend only on the regions and the resolution, so a run
/// computes them once, and an oversized region is rejected before any
/// scene is read.
#[derive(Debug, Clone)]
pub struct SamplingPlan {
    regions: RegionSet,
    resolution: f64,
    locations: Vec<Vec<Coord<f64>>>,
}

impl SamplingPlan {
    pub fn new(regions: RegionSet, resolution: f64) -> Result<Self> {
        check_resolution(resolution)?;
        let locations = regions
            .as_slice()
            .into_par_iter()
            .map(|region| sample_locations(region, resolution))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Sampling plan: {} region(s), {} location(s) at {}",
            regions.len(),
            locations.iter().map(Vec::len).sum::<usize>(),
            resolution
        );
        Ok(Self {
            regions,
            resolution,
            locations,
        })
    }

    pub fn regions(&self) -> &RegionSet {
        &self.regions
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Sampling locations of the region at `index` in region-set order
    pub fn locations(&self, index: usize) -> &[Coord<f64>] {
        self.locations.get(index).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// In-process reducer sampling each region on a regular grid
#[derive(Debug, Clone, Copy, Default)]
pub struct GridMeanReducer;

fn check_resolution(resolution: f64) -> Result<()> {
    if resolution.is_finite() && resolution > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name: "resolution",
            value: resolution.to_string(),
            reason: "must be a positive finite number".into(),
        })
    }
}

/// Centres of the `resolution` grid cells that fall inside `polygon`.
///
/// The grid is aligned to multiples of `resolution`, so two scenes with
/// different native grids are sampled at the same locations.
fn polygon_locations(region: &str, polygon: &Polygon<f64>, resolution: f64) -> Result<Vec<Coord<f64>>> {
    let Some(rect) = polygon.bounding_rect() else {
        return Ok(Vec::new());
    };

    let k0 = (rect.min().x / resolution).floor() as i64;
    let k1 = (rect.max().x / resolution).ceil() as i64;
    let m0 = (rect.min().y / resolution).floor() as i64;
    let m1 = (rect.max().y / resolution).ceil() as i64;

    let n = ((k1 - k0).max(0) as u128) * ((m1 - m0).max(0) as u128);
    if n > MAX_SAMPLES_PER_REGION as u128 {
        return Err(Error::InvalidParameter {
            name: "resolution",
            value: resolution.to_string(),
            reason: format!("region '{}' would need {} sampling locations", region, n),
        });
    }

    let half = resolution / 2.0;
    let mut out = Vec::new();
    for m in m0..m1 {
        let y = m as f64 * resolution + half;
        for k in k0..k1 {
            let x = k as f64 * resolution + half;
            if polygon.contains(&Point::new(x, y)) {
                out.push(Coord { x, y });
            }
        }
    }
    Ok(out)
}

/// Sampling locations of a region geometry at `resolution`.
///
/// Points sample themselves; polygons sample the centres of the aligned
/// grid cells inside them.
pub fn sample_locations(region: &Region, resolution: f64) -> Result<Vec<Coord<f64>>> {
    check_resolution(resolution)?;

    match region.geometry() {
        Geometry::Point(p) => Ok(vec![p.0]),
        Geometry::MultiPoint(mp) => Ok(mp.iter().map(|p| p.0).collect()),
        Geometry::Polygon(poly) => polygon_locations(region.id(), poly, resolution),
        Geometry::MultiPolygon(mp) => {
            let mut out = Vec::new();
            for poly in mp {
                out.extend(polygon_locations(region.id(), poly, resolution)?);
            }
            if out.len() > MAX_SAMPLES_PER_REGION {
                return Err(Error::InvalidParameter {
                    name: "resolution",
                    value: resolution.to_string(),
                    reason: format!("region '{}' would need {} sampling locations", region.id(), out.len()),
                });
            }
            Ok(out)
        }
        _ => Err(Error::RegionGeometry {
            id: region.id().to_string(),
            reason: "unsupported geometry type".into(),
        }),
    }
}

fn region_means(scene: &Scene, region: &Region, locations: &[Coord<f64>]) -> RegionMeans {
    let (rows, cols) = scene.shape();
    let transform = scene.transform();

    let pixels: Vec<(usize, usize)> = locations
        .iter()
        .filter_map(|c| transform.pixel_at(c.x, c.y, rows, cols))
        .collect();

    let means = scene
        .bands()
        .map(|(name, band)| {
            let (sum, count) = pixels
                .iter()
                .filter_map(|&(row, col)| band.valid_f64(row, col))
                .filter(|v| v.is_finite())
                .fold((0.0, 0_usize), |(s, n), v| (s + v, n + 1));
            let mean = (count > 0).then(|| sum / count as f64);
            (name.to_string(), mean)
        })
        .collect::<BTreeMap<_, _>>();

    RegionMeans {
        region_id: region.id().to_string(),
        means,
    }
}

impl RegionReducer for GridMeanReducer {
    fn reduce_mean(
        &self,
        scene: &Scene,
        regions: &RegionSet,
        resolution: f64,
    ) -> Result<Vec<RegionMeans>> {
        check_resolution(resolution)?;
        check_sampling_crs(scene.crs(), regions.crs())?;
        let plan = SamplingPlan::new(regions.clone(), resolution)?;
        self.reduce_planned(scene, &plan)
    }

    fn reduce_planned(&self, scene: &Scene, plan: &SamplingPlan) -> Result<Vec<RegionMeans>> {
        let regions = plan.regions();
        check_sampling_crs(scene.crs(), regions.crs())?;

        let slice = regions.as_slice();
        let results: Vec<RegionMeans> = (0..slice.len())
            .into_par_iter()
            .map(|i| region_means(scene, &slice[i], plan.locations(i)))
            .collect();

        debug!(
            "Scene {}: reduced {} band(s) over {} region(s) at {}",
            scene.id(),
            scene.band_names().count(),
            regions.len(),
            plan.resolution()
        );
        Ok(results)
    }
}
