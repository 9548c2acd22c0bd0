//! Radiometric rescaling and pixel quality masking
//!
//! Turns the raw integer words of a scene into physical units and adds a
//! per-pixel `mask` score derived from the quality and saturation words.

use crate::imagery::band_math::band_math;
use crate::maybe_rayon::*;
use greenup_core::profile::{BandClass, MaskPolicy, QualityBands, SensorProfile};
use greenup_core::raster::Raster;
use greenup_core::scene::{Band, Scene};
use greenup_core::{Error, Result, SceneStage};
use ndarray::Array2;
use tracing::debug;

/// Name of the band holding the mask score
pub const MASK_BAND: &str = "mask";

/// No-data value of the mask band (cells where a quality word is missing)
pub const MASK_NODATA: u8 = u8::MAX;

/// Mask score of one pixel: quality-flagged (0/1) plus saturated (0/1).
///
/// `qa_bits` selects which bits of the quality word are tested.
pub fn mask_score(qa: u32, saturation: u32, qa_bits: u32, policy: MaskPolicy) -> u8 {
    let (flagged, saturated) = match policy {
        MaskPolicy::FlagOnNonzero => (qa & qa_bits != 0, saturation != 0),
        MaskPolicy::FlagOnZero => (qa & qa_bits == 0, saturation == 0),
    };
    flagged as u8 + saturated as u8
}

/// Compute the mask band from a quality word band and a saturation band.
///
/// Both bands must hold integer words on the same grid.
pub fn mask_band(
    qa: &Band,
    saturation: &Band,
    qa_bits: u32,
    policy: MaskPolicy,
) -> Result<Raster<u8>> {
    for band in [qa, saturation] {
        if !band.is_integer() {
            return Err(Error::UnsupportedDataType(
                "quality bands must hold integer words".into(),
            ));
        }
    }

    let (rows, cols) = qa.shape();
    let (sr, sc) = saturation.shape();
    if (rows, cols) != (sr, sc) {
        return Err(Error::SizeMismatch { er: rows, ec: cols, ar: sr, ac: sc });
    }

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![MASK_NODATA; cols];
            for (col, cell) in row_data.iter_mut().enumerate() {
                if let (Some(q), Some(s)) = (qa.word(row, col), saturation.word(row, col)) {
                    *cell = mask_score(q, s, qa_bits, policy);
                }
            }
            row_data
        })
        .collect();

    let array =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(Raster::from_array(array)
        .with_transform(*qa.transform())
        .with_nodata(Some(MASK_NODATA)))
}

/// Scene stage rescaling optical and thermal bands and adding the mask.
///
/// The mask is computed from the raw input bands; the quality words
/// themselves are left untouched.
#[derive(Debug, Clone)]
pub struct BandScalerMasker {
    optical: Option<BandClass>,
    thermal: Option<BandClass>,
    quality: Option<QualityBands>,
    policy: MaskPolicy,
}

impl BandScalerMasker {
    pub fn from_profile(profile: &SensorProfile) -> Self {
        Self {
            optical: profile.optical.clone(),
            thermal: profile.thermal.clone(),
            quality: profile.quality.clone(),
            policy: profile.mask_policy,
        }
    }

    pub fn with_policy(mut self, policy: MaskPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MaskPolicy {
        self.policy
    }

    fn rescale(scene: &Scene, class: &BandClass, mut out: Scene) -> Result<Scene> {
        let names = class.selector.select(scene)?;
        debug!(
            "Scene {}: rescaling {} band(s) matching {}",
            scene.id(),
            names.len(),
            class.selector
        );
        for name in names {
            let band = scene.require_band(&name)?;
            let scaled = band_math(band, |v| class.rescale(v))?;
            out = out.with_band(name, scaled)?;
        }
        Ok(out)
    }
}

impl SceneStage for BandScalerMasker {
    fn name(&self) -> &'static str {
        "scale-mask"
    }

    fn apply(&self, scene: &Scene) -> Result<Scene> {
        let mut out = scene.clone();

        if let Some(q) = &self.quality {
            let qa = scene.require_band(&q.qa_band)?;
            let sat = scene.require_band(&q.saturation_band)?;
            let mask = mask_band(qa, sat, q.qa_bits, self.policy)?;
            out = out.with_band(MASK_BAND, mask)?;
        }
        if let Some(class) = &self.optical {
            out = Self::rescale(scene, class, out)?;
        }
        if let Some(class) = &self.thermal {
            out = Self::rescale(scene, class, out)?;
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use greenup_core::GeoTransform;

    const BITS: u32 = 0b11111;

    #[test]
    fn test_mask_score_flag_on_nonzero() {
        assert_eq!(mask_score(0, 0, BITS, MaskPolicy::FlagOnNonzero), 0);
        // cloud bit only
        assert_eq!(mask_score(0b1000, 0, BITS, MaskPolicy::FlagOnNonzero), 1);
        assert_eq!(mask_score(0, 4, BITS, MaskPolicy::FlagOnNonzero), 1);
        assert_eq!(mask_score(0b1, 4, BITS, MaskPolicy::FlagOnNonzero), 2);
        // bits above 4 are not tested
        assert_eq!(mask_score(0b100000, 0, BITS, MaskPolicy::FlagOnNonzero), 0);
    }

    #[test]
    fn test_mask_score_flag_on_zero_inverts() {
        assert_eq!(mask_score(0, 0, BITS, MaskPolicy::FlagOnZero), 2);
        assert_eq!(mask_score(0b1, 4, BITS, MaskPolicy::FlagOnZero), 0);
    }

    fn raw_scene() -> Scene {
        let gt = GeoTransform::new(0.0, 60.0, 30.0, -30.0);
        let acquired = NaiveDate::from_ymd_opt(2019, 7, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let qa = Raster::from_vec(vec![21824_u16, 0b1000, 1, 21824], 2, 2)
            .unwrap()
            .with_transform(gt)
            .with_nodata(Some(1));
        let sat = Raster::from_vec(vec![0_u16, 0, 0, 2], 2, 2).unwrap().with_transform(gt);
        let red = Raster::from_vec(vec![10_000_u16, 12_000, 0, 9_000], 2, 2)
            .unwrap()
            .with_transform(gt)
            .with_nodata(Some(0));

        Scene::new("LC08_A", "landsat8-c2-l2", acquired, gt, (2, 2))
            .with_band("QA_PIXEL", qa)
            .unwrap()
            .with_band("QA_RADSAT", sat)
            .unwrap()
            .with_band("SR_B4", red)
            .unwrap()
    }

    #[test]
    fn test_stage_scales_and_masks() {
        let stage = BandScalerMasker::from_profile(&SensorProfile::landsat8_c2_l2());
        let input = raw_scene();
        let out = stage.apply(&input).unwrap();

        let mask = out.band(MASK_BAND).unwrap();
        // 21824 = clear land, bits 0-4 unset
        assert_eq!(mask.valid_f64(0, 0), Some(0.0));
        assert_eq!(mask.valid_f64(0, 1), Some(1.0));
        assert_eq!(mask.valid_f64(1, 0), None);
        assert_eq!(mask.valid_f64(1, 1), Some(1.0));

        let red = out.band("SR_B4").unwrap();
        assert_relative_eq!(red.valid_f64(0, 0).unwrap(), 0.075, epsilon = 1e-12);
        assert_eq!(red.valid_f64(1, 0), None);

        let thermal = out.band("ST_B10").unwrap();
        assert_relative_eq!(thermal.valid_f64(0, 0).unwrap(), 40_000.0 * 0.00341802 + 149.0);

        // quality words are left raw and the input scene is untouched
        assert!(out.band("QA_PIXEL").unwrap().is_integer());
        assert!(input.band(MASK_BAND).is_none());
        assert!(input.band("SR_B4").unwrap().is_integer());
    }

    #[test]
    fn test_missing_quality_band_names_band_and_sensor() {
        let stage = BandScalerMasker::from_profile(&SensorProfile::landsat8_c2_l2());
        let gt = GeoTransform::default();
        let acquired = NaiveDate::from_ymd_opt(2019, 7, 15).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let scene = Scene::new("x", "landsat8-c2-l2", acquired, gt, (1, 1))
            .with_band("QA_PIXEL", Raster::filled(1, 1, 0_u16))
            .unwrap();

        let err = stage.apply(&scene).unwrap_err();
        match err {
            Error::MissingBand { band, sensor } => {
                assert_eq!(band, "QA_RADSAT");
                assert_eq!(sensor, "landsat8-c2-l2");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_scene_without_thermal_bands_is_rejected() {
        let stage = BandScalerMasker::from_profile(&SensorProfile::landsat8_c2_l2());
        let err = stage.apply(&raw_optical_scene()).unwrap_err();

        assert!(matches!(err, Error::MissingBand { ref band, .. } if band == "ST_B.*"));
        assert!(err.is_scene_scoped());
    }

    #[test]
    fn test_mask_band_rejects_float_words() {
        let qa = Band::F64(Raster::filled(1, 1, 0.0));
        let sat = Band::U16(Raster::filled(1, 1, 0));
        let result = mask_band(&qa, &sat, BITS, MaskPolicy::FlagOnNonzero);
        assert!(matches!(result, Err(Error::UnsupportedDataType(_))));
    }
}
