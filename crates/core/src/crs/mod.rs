//! Coordinate reference system tags for scenes and region sets

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate reference system of a scene grid or a region set.
///
/// Only identity is tracked; no reprojection happens in this crate, so a
/// scene and the region set it is sampled with must share one reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CRS {
    /// EPSG code
    Epsg(u32),
    /// WKT or PROJ definition
    Definition(String),
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        CRS::Epsg(code)
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        match self {
            CRS::Epsg(code) => Some(*code),
            CRS::Definition(_) => None,
        }
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        match (self, other) {
            (CRS::Epsg(a), CRS::Epsg(b)) => a == b,
            (CRS::Definition(a), CRS::Definition(b)) => a.trim() == b.trim(),
            _ => false,
        }
    }

    /// Short identifier used in logs and errors
    pub fn identifier(&self) -> String {
        match self {
            CRS::Epsg(code) => format!("EPSG:{}", code),
            CRS::Definition(def) => format!("DEF:{}", def.chars().take(50).collect::<String>()),
        }
    }
}

/// Whether a scene in `scene` can be sampled with regions in `regions`.
///
/// An untagged scene grid is taken to share the region coordinates. A tagged
/// scene needs regions tagged with an equivalent reference; untagged regions
/// fail with [`Error::CrsMismatch`] instead of silently missing the grid.
pub fn check_sampling_crs(scene: Option<&CRS>, regions: Option<&CRS>) -> Result<()> {
    match (scene, regions) {
        (Some(a), Some(b)) if !a.is_equivalent(b) => {
            Err(Error::CrsMismatch(a.identifier(), b.identifier()))
        }
        (Some(a), None) => Err(Error::CrsMismatch(a.identifier(), "unspecified".into())),
        _ => Ok(()),
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(32612);
        assert_eq!(crs.epsg(), Some(32612));
        assert_eq!(crs.identifier(), "EPSG:32612");
    }

    #[test]
    fn test_crs_equivalence() {
        assert!(CRS::from_epsg(4326).is_equivalent(&CRS::wgs84()));
        assert!(!CRS::from_epsg(4326).is_equivalent(&CRS::Definition("+proj=longlat".into())));
    }

    #[test]
    fn test_sampling_crs() {
        let utm = CRS::from_epsg(32613);
        assert!(check_sampling_crs(None, None).is_ok());
        assert!(check_sampling_crs(None, Some(&utm)).is_ok());
        assert!(check_sampling_crs(Some(&utm), Some(&CRS::from_epsg(32613))).is_ok());

        let err = check_sampling_crs(Some(&utm), None).unwrap_err();
        assert_eq!(err.to_string(), "CRS mismatch: EPSG:32613 vs unspecified");
        assert!(matches!(
            check_sampling_crs(Some(&utm), Some(&CRS::wgs84())),
            Err(Error::CrsMismatch(..))
        ));
    }
}
