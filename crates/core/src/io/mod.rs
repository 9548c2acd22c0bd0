//! GeoTIFF band I/O for local catalogs

mod native;

pub use native::{read_band, write_band};
