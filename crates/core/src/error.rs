//! Error types for Greenup

use thiserror::Error;

/// Main error type for Greenup operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Missing band '{band}' for sensor '{sensor}'")]
    MissingBand { band: String, sensor: String },

    #[error("Undefined '{band}' aggregate for region '{region}' in scene '{scene}'")]
    UndefinedAggregate {
        region: String,
        scene: String,
        band: String,
    },

    #[error("Invalid date range: start {start} must be strictly before end {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("Invalid geometry for region '{id}': {reason}")]
    RegionGeometry { id: String, reason: String },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error only invalidates the scene that produced it.
    ///
    /// Scene-scoped errors are logged and the scene is skipped; every other
    /// error aborts the run.
    pub fn is_scene_scoped(&self) -> bool {
        matches!(
            self,
            Error::MissingBand { .. }
                | Error::SizeMismatch { .. }
                | Error::CrsMismatch(..)
                | Error::InvalidDimensions { .. }
                | Error::IndexOutOfBounds { .. }
                | Error::UnsupportedDataType(_)
        )
    }

    pub fn missing_band(band: impl Into<String>, sensor: impl Into<String>) -> Self {
        Error::MissingBand {
            band: band.into(),
            sensor: sensor.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// Result type alias for Greenup operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_scope() {
        assert!(Error::missing_band("SR_B4", "landsat8-c2-l2").is_scene_scoped());
        assert!(!Error::Cancelled.is_scene_scoped());
        assert!(!Error::InvalidDateRange {
            start: "2020-01-01".into(),
            end: "2019-01-01".into()
        }
        .is_scene_scoped());
    }

    #[test]
    fn test_missing_band_message() {
        let e = Error::missing_band("SR_B4", "landsat8-c2-l2");
        assert_eq!(e.to_string(), "Missing band 'SR_B4' for sensor 'landsat8-c2-l2'");
    }
}
