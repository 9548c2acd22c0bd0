//! Temporal annotation of scenes

mod annotate;

pub use annotate::{date_from_year_doy, day_of_year, TemporalAnnotator};
