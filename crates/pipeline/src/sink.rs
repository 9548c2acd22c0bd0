//! Output tables
//!
//! A sink receives the flat sample records of a run, then persists them
//! under the run's description.

use greenup_core::record::SampleRecord;
use greenup_core::{Error, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Destination of the sample records of a run
pub trait TableSink {
    /// Accumulate records
    fn append(&mut self, records: &[SampleRecord]) -> Result<()>;

    /// Persist everything appended so far under `description`
    fn finish(&mut self, description: &str) -> Result<()>;
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<SampleRecord>,
    description: Option<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    /// Description passed to `finish`, if the run completed
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl TableSink for MemorySink {
    fn append(&mut self, records: &[SampleRecord]) -> Result<()> {
        self.records.extend_from_slice(records);
        Ok(())
    }

    fn finish(&mut self, description: &str) -> Result<()> {
        self.description = Some(description.to_string());
        Ok(())
    }
}

/// Writes `<dir>/<description>.csv`.
///
/// Columns: `region_id`, the region attributes, `scene_id`, `date`, `year`,
/// `doy`, then one column per sampled band in name order (the index band
/// included). Undefined values are empty cells.
#[derive(Debug)]
pub struct CsvSink {
    dir: PathBuf,
    records: Vec<SampleRecord>,
    written: Option<PathBuf>,
}

fn csv_err(e: csv::Error) -> Error {
    Error::Other(format!("CSV error: {}", e))
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            records: Vec::new(),
            written: None,
        }
    }

    /// Path of the table for `description`
    pub fn path_for(&self, description: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", description))
    }

    /// Path of the written table, once `finish` succeeded
    pub fn written(&self) -> Option<&Path> {
        self.written.as_deref()
    }

    fn columns(&self) -> (Vec<String>, Vec<String>) {
        let mut attributes = BTreeSet::new();
        let mut bands = BTreeSet::new();
        for r in &self.records {
            attributes.extend(r.attributes.keys().cloned());
            bands.insert(r.index_band.clone());
            bands.extend(r.bands.keys().cloned());
        }
        (attributes.into_iter().collect(), bands.into_iter().collect())
    }
}

fn cell(v: Option<f64>) -> String {
    match v {
        Some(v) if v.is_finite() => v.to_string(),
        _ => String::new(),
    }
}

impl TableSink for CsvSink {
    fn append(&mut self, records: &[SampleRecord]) -> Result<()> {
        self.records.extend_from_slice(records);
        Ok(())
    }

    fn finish(&mut self, description: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(description);
        let (attributes, bands) = self.columns();
        if let Some(clash) = attributes.iter().find(|a| bands.contains(a)) {
            return Err(Error::Config(format!(
                "region attribute '{}' clashes with a band column",
                clash
            )));
        }

        let mut writer = csv::Writer::from_path(&path).map_err(csv_err)?;

        let header = std::iter::once("region_id".to_string())
            .chain(attributes.iter().cloned())
            .chain(["scene_id", "date", "year", "doy"].map(String::from))
            .chain(bands.iter().cloned());
        writer.write_record(header).map_err(csv_err)?;

        for r in &self.records {
            let row = std::iter::once(r.region_id.clone())
                .chain(
                    attributes
                        .iter()
                        .map(|k| r.attributes.get(k).cloned().unwrap_or_default()),
                )
                .chain([
                    r.scene_id.clone(),
                    r.date.to_string(),
                    r.year.to_string(),
                    r.doy.map(|d| d.to_string()).unwrap_or_default(),
                ])
                .chain(bands.iter().map(|b| cell(r.value(b))));
            writer.write_record(row).map_err(csv_err)?;
        }
        writer.flush()?;

        info!("Wrote {} record(s) to {}", self.records.len(), path.display());
        self.written = Some(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn record(region: &str, ndvi: f64, b4: Option<f64>) -> SampleRecord {
        let mut bands = BTreeMap::new();
        bands.insert("SR_B4".to_string(), b4);
        bands.insert("mask".to_string(), Some(0.5));
        let mut attributes = BTreeMap::new();
        attributes.insert("site".to_string(), format!("site-{}", region));
        SampleRecord {
            region_id: region.into(),
            attributes,
            scene_id: "LC08_A".into(),
            date: NaiveDate::from_ymd_opt(2019, 7, 15).unwrap(),
            year: 2019,
            doy: Some(195),
            index_band: "ndvi".into(),
            index: ndvi,
            bands,
        }
    }

    #[test]
    fn test_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path().join("out"));
        sink.append(&[record("0", 0.25, Some(0.1)), record("1", 0.5, None)]).unwrap();
        sink.finish("sampled-ndvi").unwrap();

        let path = sink.written().unwrap().to_path_buf();
        assert_eq!(path, dir.path().join("out").join("sampled-ndvi.csv"));

        let text = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "region_id,site,scene_id,date,year,doy,SR_B4,mask,ndvi");
        assert_eq!(lines[1], "0,site-0,LC08_A,2019-07-15,2019,195,0.1,0.5,0.25");
        assert_eq!(lines[2], "1,site-1,LC08_A,2019-07-15,2019,195,,0.5,0.5");
    }

    #[test]
    fn test_attribute_named_like_a_band_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path());
        let mut r = record("0", 0.25, Some(0.1));
        r.attributes.insert("SR_B4".into(), "x".into());
        sink.append(&[r]).unwrap();

        assert!(matches!(sink.finish("sampled-ndvi"), Err(Error::Config(_))));
        assert!(sink.written().is_none());
        assert!(!sink.path_for("sampled-ndvi").exists());
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.append(&[record("0", 0.25, None)]).unwrap();
        assert_eq!(sink.description(), None);
        sink.finish("d").unwrap();
        assert_eq!(sink.records().len(), 1);
        assert_eq!(sink.description(), Some("d"));
    }
}
