//! Per-scene imagery transforms
//!
//! - Band math: unary and binary raster algebra over scene bands
//! - Scale/mask: radiometric rescaling and the quality mask score
//! - Indices: normalized difference and NDVI

mod band_math;
mod indices;
mod scale_mask;

pub use band_math::{band_math, band_math_binary};
pub use indices::{ndvi, normalized_difference, IndexCalculator};
pub use scale_mask::{mask_band, mask_score, BandScalerMasker, MASK_BAND, MASK_NODATA};
