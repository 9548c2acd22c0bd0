//! Year and day-of-year annotation

use chrono::{Datelike, NaiveDate};
use greenup_core::profile::{SensorProfile, TemporalFields};
use greenup_core::scene::Scene;
use greenup_core::{Result, SceneStage};

/// Day of year counted from 0 (January 1 is day 0)
pub fn day_of_year(date: NaiveDate) -> u32 {
    date.ordinal0()
}

/// Inverse of [`day_of_year`]; `None` past the end of the year
pub fn date_from_year_doy(year: i32, doy: u32) -> Option<NaiveDate> {
    NaiveDate::from_yo_opt(year, doy.checked_add(1)?)
}

/// Scene stage attaching `year` and, when requested, `doy`
#[derive(Debug, Clone, Copy)]
pub struct TemporalAnnotator {
    fields: TemporalFields,
}

impl TemporalAnnotator {
    pub fn new(fields: TemporalFields) -> Self {
        Self { fields }
    }

    pub fn from_profile(profile: &SensorProfile) -> Self {
        Self::new(profile.temporal)
    }

    pub fn fields(&self) -> TemporalFields {
        self.fields
    }
}

impl SceneStage for TemporalAnnotator {
    fn name(&self) -> &'static str {
        "annotate"
    }

    fn apply(&self, scene: &Scene) -> Result<Scene> {
        let date = scene.date();
        let annotated = scene.clone().with_year(date.year());
        Ok(match self.fields {
            TemporalFields::YearAndDoy => annotated.with_doy(day_of_year(date)),
            TemporalFields::YearOnly => annotated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenup_core::GeoTransform;

    fn scene_on(y: i32, m: u32, d: u32) -> Scene {
        let acquired = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        Scene::new("s", "sensor", acquired, GeoTransform::default(), (1, 1))
    }

    #[test]
    fn test_day_of_year_is_zero_based() {
        let jan1 = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        assert_eq!(day_of_year(jan1), 0);

        let d = NaiveDate::from_ymd_opt(2019, 7, 15).unwrap();
        assert_eq!(day_of_year(d), 195);
        assert_eq!(date_from_year_doy(2019, 195), Some(d));

        let leap_end = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
        assert_eq!(day_of_year(leap_end), 365);
        assert_eq!(date_from_year_doy(2019, 365), None);
    }

    #[test]
    fn test_annotates_year_and_doy() {
        let out = TemporalAnnotator::new(TemporalFields::YearAndDoy)
            .apply(&scene_on(2019, 7, 15))
            .unwrap();
        assert_eq!(out.year(), Some(2019));
        assert_eq!(out.doy(), Some(195));
    }

    #[test]
    fn test_year_only_still_returns_annotated_scene() {
        let out = TemporalAnnotator::new(TemporalFields::YearOnly)
            .apply(&scene_on(2016, 2, 18))
            .unwrap();
        assert_eq!(out.year(), Some(2016));
        assert_eq!(out.doy(), None);
    }
}
