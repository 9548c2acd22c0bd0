//! # Greenup Pipeline
//!
//! Collection-level orchestration for Greenup.
//!
//! This crate provides:
//! - `RunConfig`: JSON run configuration
//! - `ImageSource`: scene catalogs (in-memory and local STAC)
//! - `TableSink`: record export (in-memory and CSV)
//! - `ProcessingMode`: sequential or parallel scene mapping
//! - `CollectionPipeline`: the filter, transform, sample and export run

pub mod catalog;
pub mod config;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod strategy;

pub use catalog::LocalCatalog;
pub use config::{ProfileRef, RunConfig};
pub use pipeline::{CancelFlag, CollectionPipeline, RunReport, SkippedScene};
pub use sink::{CsvSink, MemorySink, TableSink};
pub use source::{ImageSource, MemorySource, SceneQuery};
pub use strategy::{ParallelStrategy, ProcessingMode};
