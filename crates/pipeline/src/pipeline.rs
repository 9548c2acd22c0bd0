//! Collection pipeline
//!
//! Filter → Mask/Scale → Annotate → Index → Sample, then flatten and drop
//! records without an index value.

use crate::config::RunConfig;
use crate::source::{ImageSource, SceneQuery};
use crate::sink::TableSink;
use crate::strategy::{ParallelStrategy, ProcessingMode};
use greenup_algorithms::imagery::MASK_BAND;
use greenup_algorithms::stages_for;
use greenup_algorithms::statistics::{RegionReducer, RegionSampler, SamplingPlan};
use greenup_core::crs::check_sampling_crs;
use greenup_core::record::{flatten_records, RegionAggregate};
use greenup_core::region::{attribute_clash, RegionSet};
use greenup_core::scene::Scene;
use greenup_core::{DateRange, Error, Result, SceneStage, SensorProfile};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared cancellation signal, checked between stages
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A scene left out of the output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedScene {
    pub scene_id: String,
    /// Stage that failed
    pub stage: String,
    pub reason: String,
}

/// Summary of a completed run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub description: String,
    pub scenes_queried: usize,
    pub scenes_filtered: usize,
    pub scenes_processed: usize,
    pub skipped: Vec<SkippedScene>,
    /// Region aggregates produced, undefined ones included
    pub aggregates: usize,
    /// Aggregates dropped for an undefined index
    pub records_dropped: usize,
    pub records_exported: usize,
    pub warnings: Vec<String>,
}

/// A configured, validated run
pub struct CollectionPipeline {
    profile: SensorProfile,
    dates: DateRange,
    plan: SamplingPlan,
    description: String,
    mode: ProcessingMode,
    stages: Vec<Box<dyn SceneStage>>,
    warnings: Vec<String>,
    cancel: Option<CancelFlag>,
}

type SceneOutcome = std::result::Result<Vec<RegionAggregate>, (&'static str, Error)>;

impl CollectionPipeline {
    /// Build a pipeline from configuration. Every configuration error
    /// surfaces here, before any scene is read.
    pub fn new(config: &RunConfig) -> Result<Self> {
        let profile = config.profile()?;
        let description = config.description(&profile)?;
        let pipeline = Self::from_parts(
            profile,
            config.date_range()?,
            config.region_set()?,
            description,
        )?;
        Ok(pipeline.with_mode(config.processing_mode()?))
    }

    pub fn from_parts(
        profile: SensorProfile,
        dates: DateRange,
        regions: RegionSet,
        description: impl Into<String>,
    ) -> Result<Self> {
        profile.validate()?;
        let description = description.into();
        if description.trim().is_empty() {
            return Err(Error::Config("output description is empty".into()));
        }
        for region in regions.iter() {
            if let Some(key) = region.attribute_named(&[profile.index_band(), MASK_BAND]) {
                return Err(attribute_clash(region.id(), key));
            }
        }
        let plan = SamplingPlan::new(regions, profile.resolution)?;

        let mut warnings = Vec::new();
        if profile.quality.is_some() {
            if let Some(advisory) = profile.mask_policy.advisory() {
                warn!("{}", advisory);
                warnings.push(advisory);
            }
        }

        let stages = stages_for(&profile);
        debug!(
            "Pipeline for {}: stages [{}]",
            profile.id,
            stages.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
        );

        Ok(Self {
            profile,
            dates,
            plan,
            description,
            mode: ProcessingMode::default(),
            stages,
            warnings,
            cancel: None,
        })
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn profile(&self) -> &SensorProfile {
        &self.profile
    }

    pub fn date_range(&self) -> &DateRange {
        &self.dates
    }

    pub fn regions(&self) -> &RegionSet {
        self.plan.regions()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Names of the per-scene stages, in order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    /// Run every per-scene stage on one scene
    pub fn process_scene(&self, scene: &Scene) -> Result<Scene> {
        self.process(scene).map_err(|(_, e)| e)
    }

    fn process(&self, scene: &Scene) -> std::result::Result<Scene, (&'static str, Error)> {
        let mut current = scene.clone();
        for stage in &self.stages {
            self.check_cancelled().map_err(|e| (stage.name(), e))?;
            current = stage.apply(&current).map_err(|e| (stage.name(), e))?;
        }
        Ok(current)
    }

    fn sample_one<R: RegionReducer + ?Sized>(
        &self,
        scene: &Scene,
        sampler: &RegionSampler<'_, R>,
    ) -> SceneOutcome {
        let processed = self.process(scene)?;
        self.check_cancelled().map_err(|e| ("sample", e))?;
        sampler.sample(&processed).map_err(|e| ("sample", e))
    }

    /// Query, transform, sample and export.
    ///
    /// Scene-scoped failures skip the scene and are listed in the report;
    /// any other failure aborts the run before anything is exported.
    pub fn run<R: RegionReducer + ?Sized>(
        &self,
        source: &dyn ImageSource,
        reducer: &R,
        sink: &mut dyn TableSink,
    ) -> Result<RunReport> {
        self.check_cancelled()?;
        let regions = self.plan.regions();
        let query = SceneQuery {
            collection_id: &self.profile.collection_id,
            sensor: &self.profile.id,
            dates: &self.dates,
            extent: regions.extent(),
            crs: regions.crs(),
        };

        let queried = source.query(&query)?;
        let scenes_queried = queried.len();
        let mut skipped = Vec::new();
        let scenes: Vec<Scene> = queried
            .into_iter()
            .filter(|s| query.matches(s))
            .filter(|s| match check_sampling_crs(s.crs(), regions.crs()) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Skipping scene {} at filter: {}", s.id(), e);
                    skipped.push(SkippedScene {
                        scene_id: s.id().to_string(),
                        stage: "filter".to_string(),
                        reason: e.to_string(),
                    });
                    false
                }
            })
            .collect();
        info!(
            "{}: {} scene(s) in {}, {} after filtering",
            self.profile.collection_id,
            scenes_queried,
            self.dates,
            scenes.len()
        );

        let sampler = RegionSampler::new(reducer, &self.plan, self.profile.index_band());
        let outcomes = self
            .mode
            .par_map(0..scenes.len(), |i| self.sample_one(&scenes[i], &sampler))?;

        let mut per_scene = Vec::with_capacity(outcomes.len());
        for (scene, outcome) in scenes.iter().zip(outcomes) {
            match outcome {
                Ok(aggregates) => per_scene.push(aggregates),
                Err((_, Error::Cancelled)) => return Err(Error::Cancelled),
                Err((stage, e)) if e.is_scene_scoped() => {
                    warn!("Skipping scene {} at {}: {}", scene.id(), stage, e);
                    skipped.push(SkippedScene {
                        scene_id: scene.id().to_string(),
                        stage: stage.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err((_, e)) => return Err(e),
            }
        }

        let scenes_processed = per_scene.len();
        let aggregates: usize = per_scene.iter().map(Vec::len).sum();
        let (records, records_dropped) = flatten_records(per_scene, self.profile.index_band());
        debug!(
            "Dropped {} aggregate(s) with an undefined '{}'",
            records_dropped,
            self.profile.index_band()
        );

        self.check_cancelled()?;
        sink.append(&records)?;
        sink.finish(&self.description)?;

        info!(
            "Exported {} record(s) from {} scene(s), {} skipped",
            records.len(),
            scenes_processed,
            skipped.len()
        );

        Ok(RunReport {
            description: self.description.clone(),
            scenes_queried,
            scenes_filtered: scenes.len(),
            scenes_processed,
            skipped,
            aggregates,
            records_dropped,
            records_exported: records.len(),
            warnings: self.warnings.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenup_core::profile::MaskPolicy;
    use greenup_core::region::{GeometrySpec, RegionSpec};

    fn regions() -> RegionSet {
        RegionSet::from_specs(&[RegionSpec {
            id: "0".into(),
            geometry: GeometrySpec::Point([15.0, 15.0]),
            attributes: Default::default(),
        }])
        .unwrap()
    }

    #[test]
    fn test_advisory_for_flag_on_zero() {
        let mut profile = SensorProfile::landsat8_c2_l2();
        profile.mask_policy = MaskPolicy::FlagOnZero;
        let dates = DateRange::parse("2019-01-01", "2020-01-01").unwrap();

        let pipeline = CollectionPipeline::from_parts(profile, dates, regions(), "out").unwrap();
        assert_eq!(pipeline.warnings().len(), 1);
        assert_eq!(pipeline.stage_names(), vec!["scale-mask", "annotate", "index"]);
    }

    #[test]
    fn test_rejects_empty_description() {
        let dates = DateRange::parse("2019-01-01", "2020-01-01").unwrap();
        let result =
            CollectionPipeline::from_parts(SensorProfile::modis_mod13q1(), dates, regions(), " ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_oversized_region_fails_at_construction() {
        let dates = DateRange::parse("2019-01-01", "2020-01-01").unwrap();
        let huge = RegionSet::from_specs(&[RegionSpec {
            id: "huge".into(),
            geometry: GeometrySpec::Polygon(vec![vec![
                [0.0, 0.0],
                [1_000_000.0, 0.0],
                [1_000_000.0, 1_000_000.0],
                [0.0, 1_000_000.0],
                [0.0, 0.0],
            ]]),
            attributes: Default::default(),
        }])
        .unwrap();

        let result = CollectionPipeline::from_parts(SensorProfile::modis_mod13q1(), dates, huge, "out");
        assert!(matches!(result, Err(Error::InvalidParameter { name: "resolution", .. })));
    }

    #[test]
    fn test_rejects_attribute_named_like_a_band() {
        let dates = DateRange::parse("2019-01-01", "2020-01-01").unwrap();
        let mut attributes = std::collections::BTreeMap::new();
        attributes.insert("ndvi".to_string(), "high".to_string());
        let regions = RegionSet::from_specs(&[RegionSpec {
            id: "0".into(),
            geometry: GeometrySpec::Point([15.0, 15.0]),
            attributes,
        }])
        .unwrap();

        let result =
            CollectionPipeline::from_parts(SensorProfile::landsat8_c2_l2(), dates, regions, "out");
        assert!(matches!(result, Err(Error::InvalidParameter { ref value, .. }) if value == "ndvi"));
    }

    #[test]
    fn test_cancel_flag() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(!flag.is_cancelled());
        other.cancel();
        assert!(flag.is_cancelled());
    }
}
