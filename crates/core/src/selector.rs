//! Band selection by exact name, glob or regular expression

use crate::error::{Error, Result};
use crate::scene::Scene;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Selects a set of band names from a scene.
///
/// Regular expressions must match the whole band name (`SR_B.` selects
/// `SR_B4` but not `SR_B10` or `XSR_B4`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "lowercase")]
pub enum BandSelector {
    Name(String),
    Glob(String),
    Regex(String),
}

enum Matcher {
    Name(String),
    Glob(glob::Pattern),
    Regex(Regex),
}

impl Matcher {
    fn is_match(&self, name: &str) -> bool {
        match self {
            Matcher::Name(n) => n == name,
            Matcher::Glob(p) => p.matches(name),
            Matcher::Regex(re) => re.is_match(name),
        }
    }
}

impl BandSelector {
    pub fn regex(pattern: impl Into<String>) -> Self {
        BandSelector::Regex(pattern.into())
    }

    pub fn glob(pattern: impl Into<String>) -> Self {
        BandSelector::Glob(pattern.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        BandSelector::Name(name.into())
    }

    pub fn pattern(&self) -> &str {
        match self {
            BandSelector::Name(p) | BandSelector::Glob(p) | BandSelector::Regex(p) => p,
        }
    }

    fn matcher(&self) -> Result<Matcher> {
        let invalid = |reason: String| Error::InvalidParameter {
            name: "bandSelector",
            value: self.pattern().to_string(),
            reason,
        };
        Ok(match self {
            BandSelector::Name(n) => Matcher::Name(n.clone()),
            BandSelector::Glob(p) => {
                Matcher::Glob(glob::Pattern::new(p).map_err(|e| invalid(e.to_string()))?)
            }
            BandSelector::Regex(p) => Matcher::Regex(
                Regex::new(&format!("^(?:{})$", p)).map_err(|e| invalid(e.to_string()))?,
            ),
        })
    }

    /// Check that the pattern compiles
    pub fn validate(&self) -> Result<()> {
        self.matcher().map(|_| ())
    }

    /// Names from `names` this selector matches, in input order
    pub fn matching<'a, I>(&self, names: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let matcher = self.matcher()?;
        Ok(names
            .into_iter()
            .filter(|n| matcher.is_match(n))
            .map(str::to_string)
            .collect())
    }

    /// Sorted band names of `scene` matched by this selector.
    ///
    /// Zero matches is a [`Error::MissingBand`] naming the pattern.
    pub fn select(&self, scene: &Scene) -> Result<Vec<String>> {
        let names = self.matching(scene.band_names())?;
        if names.is_empty() {
            return Err(Error::missing_band(self.pattern(), scene.sensor()));
        }
        Ok(names)
    }
}

impl fmt::Display for BandSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandSelector::Name(p) => write!(f, "name:{}", p),
            BandSelector::Glob(p) => write!(f, "glob:{}", p),
            BandSelector::Regex(p) => write!(f, "regex:{}", p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANDSAT: [&str; 7] = ["QA_PIXEL", "QA_RADSAT", "SR_B4", "SR_B5", "ST_B10", "ST_QA", "SR_QA_AEROSOL"];

    #[test]
    fn test_regex_is_anchored() {
        let optical = BandSelector::regex("SR_B.").matching(LANDSAT).unwrap();
        assert_eq!(optical, vec!["SR_B4", "SR_B5"]);

        let thermal = BandSelector::regex("ST_B.*").matching(LANDSAT).unwrap();
        assert_eq!(thermal, vec!["ST_B10"]);
    }

    #[test]
    fn test_glob_and_name() {
        let qa = BandSelector::glob("QA_*").matching(LANDSAT).unwrap();
        assert_eq!(qa, vec!["QA_PIXEL", "QA_RADSAT"]);

        let one = BandSelector::name("SR_B4").matching(LANDSAT).unwrap();
        assert_eq!(one, vec!["SR_B4"]);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            BandSelector::regex("SR_B(").validate(),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_select_without_match_names_the_pattern() {
        use crate::raster::{GeoTransform, Raster};
        use chrono::NaiveDate;

        let acquired = NaiveDate::from_ymd_opt(2019, 7, 15).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let scene = Scene::new("A", "landsat8-c2-l2", acquired, GeoTransform::default(), (2, 2))
            .with_band("SR_B4", Raster::filled(2, 2, 8_000_u16))
            .unwrap()
            .with_band("SR_B5", Raster::filled(2, 2, 20_000_u16))
            .unwrap();

        assert_eq!(BandSelector::regex("SR_B.").select(&scene).unwrap(), vec!["SR_B4", "SR_B5"]);

        let err = BandSelector::regex("ST_B.*").select(&scene).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingBand { ref band, ref sensor } if band == "ST_B.*" && sensor == "landsat8-c2-l2"
        ));
    }

    #[test]
    fn test_serde_shape() {
        let s: BandSelector = serde_json::from_str(r#"{"kind": "regex", "pattern": "SR_B."}"#).unwrap();
        assert_eq!(s, BandSelector::regex("SR_B."));
    }
}
