//! Band math operations
//!
//! Element-wise raster algebra over scene bands. Every output is an `f64`
//! raster on the input grid with NaN as its no-data value.

use ndarray::Array2;
use crate::maybe_rayon::*;
use greenup_core::raster::Raster;
use greenup_core::scene::Band;
use greenup_core::{Error, Result};

/// Apply a unary function to every valid cell of a band.
///
/// No-data cells of the input stay no-data (NaN) in the output, whatever
/// the input sample type.
///
/// # Example
/// ```ignore
/// let reflectance = band_math(&raw, |v| v * 0.0000275 - 0.2)?;
/// ```
pub fn band_math<F>(band: &Band, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    let (rows, cols) = band.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, cell) in row_data.iter_mut().enumerate() {
                if let Some(v) = band.valid_f64(row, col) {
                    *cell = f(v);
                }
            }
            row_data
        })
        .collect();

    finish(band, rows, cols, data)
}

/// Apply a binary function cell by cell to two bands on the same grid.
///
/// A cell is no-data when either input is no-data, or when `f` returns a
/// non-finite value.
pub fn band_math_binary<F>(a: &Band, b: &Band, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    let (rows, cols) = a.shape();
    let (br, bc) = b.shape();
    if (rows, cols) != (br, bc) {
        return Err(Error::SizeMismatch { er: rows, ec: cols, ar: br, ac: bc });
    }

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, cell) in row_data.iter_mut().enumerate() {
                let (Some(va), Some(vb)) = (a.valid_f64(row, col), b.valid_f64(row, col)) else {
                    continue;
                };
                let v = f(va, vb);
                if v.is_finite() {
                    *cell = v;
                }
            }
            row_data
        })
        .collect();

    finish(a, rows, cols, data)
}

fn finish(template: &Band, rows: usize, cols: usize, data: Vec<f64>) -> Result<Raster<f64>> {
    let array =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(Raster::from_array(array)
        .with_transform(*template.transform())
        .with_nodata(Some(f64::NAN)))
}
