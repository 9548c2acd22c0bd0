//! Native single-band GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. Only the tags needed to place a band on its grid
//! are handled: ModelPixelScale, ModelTiepoint and GDAL_NODATA.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use crate::scene::Band;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;
use std::str::FromStr;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{ColorType, Gray16, Gray64Float, Gray8};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

fn tiff_err(context: &str) -> impl Fn(tiff::TiffError) -> Error + '_ {
    move |e| Error::Other(format!("{}: {}", context, e))
}

/// Read the first band of a GeoTIFF file.
///
/// 8- and 16-bit unsigned samples stay integer bands so quality words keep
/// their bits; every other sample format is widened to `f64`.
pub fn read_band<P: AsRef<Path>>(path: P) -> Result<Band> {
    let file = File::open(path.as_ref())?;
    decode_band(file)
}

fn build<T: RasterElement + FromStr>(
    data: Vec<T>,
    rows: usize,
    cols: usize,
    transform: Option<GeoTransform>,
    nodata: Option<&str>,
) -> Result<Raster<T>> {
    let mut raster = Raster::from_vec(data, rows, cols)?;
    if let Some(gt) = transform {
        raster.set_transform(gt);
    }
    raster.set_nodata(nodata.and_then(|s| s.trim().trim_end_matches('\0').parse().ok()));
    Ok(raster)
}

fn widen<V: Copy + Into<f64>>(buf: Vec<V>) -> Vec<f64> {
    buf.into_iter().map(Into::into).collect()
}

fn decode_band<R: Read + Seek>(reader: R) -> Result<Band> {
    let mut decoder = Decoder::new(reader).map_err(tiff_err("TIFF decode error"))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(tiff_err("Cannot read dimensions"))?;
    let (rows, cols) = (height as usize, width as usize);

    let transform = read_geotransform(&mut decoder);
    let nodata = decoder.get_tag_ascii_string(Tag::Unknown(GDAL_NODATA)).ok();
    let nodata = nodata.as_deref();

    let result = decoder
        .read_image()
        .map_err(tiff_err("Cannot read image data"))?;

    let band = match result {
        DecodingResult::U8(buf) => Band::U8(build(buf, rows, cols, transform, nodata)?),
        DecodingResult::U16(buf) => Band::U16(build(buf, rows, cols, transform, nodata)?),
        DecodingResult::U32(buf) => Band::F64(build(widen(buf), rows, cols, transform, nodata)?),
        DecodingResult::I8(buf) => Band::F64(build(widen(buf), rows, cols, transform, nodata)?),
        DecodingResult::I16(buf) => Band::F64(build(widen(buf), rows, cols, transform, nodata)?),
        DecodingResult::I32(buf) => Band::F64(build(widen(buf), rows, cols, transform, nodata)?),
        DecodingResult::F32(buf) => Band::F64(build(widen(buf), rows, cols, transform, nodata)?),
        DecodingResult::F64(buf) => Band::F64(build(buf, rows, cols, transform, nodata)?),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    Ok(band)
}

/// GeoTransform from ModelPixelScale + ModelTiepoint, if both are present
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT)).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// Write a band to a GeoTIFF file
pub fn write_band<P: AsRef<Path>>(band: &Band, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    encode_band(band, file)
}

fn encode_band<W: Write + Seek>(band: &Band, writer: W) -> Result<()> {
    match band {
        Band::U8(r) => encode::<Gray8, _, _>(r, writer),
        Band::U16(r) => encode::<Gray16, _, _>(r, writer),
        Band::F64(r) => encode::<Gray64Float, _, _>(r, writer),
    }
}

fn encode<C, T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    C: ColorType<Inner = T>,
    [T]: TiffValue,
    T: RasterElement + ToString,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer).map_err(tiff_err("TIFF encoder error"))?;
    let (rows, cols) = raster.shape();
    let data: Vec<T> = raster.data().iter().copied().collect();

    let mut image = encoder
        .new_image::<C>(cols as u32, rows as u32)
        .map_err(tiff_err("Cannot create TIFF image"))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &scale[..])
        .map_err(tiff_err("Cannot write scale tag"))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])
        .map_err(tiff_err("Cannot write tiepoint tag"))?;

    // Version 1.1.0 with GTModelType=Projected and GTRasterType=PixelIsArea
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &geokeys[..])
        .map_err(tiff_err("Cannot write geokey tag"))?;

    if let Some(nd) = raster.nodata() {
        image
            .encoder()
            .write_tag(Tag::Unknown(GDAL_NODATA), nd.to_string().as_str())
            .map_err(tiff_err("Cannot write nodata tag"))?;
    }

    image
        .write_data(&data)
        .map_err(tiff_err("Cannot write image data"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_u16_band_keeps_bits_and_grid() {
        let raster = Raster::from_vec(vec![0_u16, 1, 0b1_0000, 21824], 2, 2)
            .unwrap()
            .with_transform(GeoTransform::new(500_000.0, 6_000_000.0, 30.0, -30.0))
            .with_nodata(Some(1));

        let mut buf = Vec::new();
        encode_band(&Band::U16(raster.clone()), Cursor::new(&mut buf)).unwrap();
        let back = decode_band(Cursor::new(buf.as_slice())).unwrap();

        match back {
            Band::U16(r) => {
                assert_eq!(r.data(), raster.data());
                assert_eq!(r.transform(), raster.transform());
                assert_eq!(r.nodata(), Some(1));
            }
            other => panic!("expected a u16 band, got {:?}", other),
        }
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ndvi.tif");
        let raster = Raster::filled(3, 4, 0.25_f64);

        write_band(&Band::F64(raster), &path).unwrap();
        let back = read_band(&path).unwrap();

        assert_eq!(back.shape(), (3, 4));
        assert_eq!(back.valid_f64(2, 3), Some(0.25));
    }
}
