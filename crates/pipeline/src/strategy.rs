//! Scene-level parallel processing strategies

use greenup_core::{Error, Result};
use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// How scenes of a run are mapped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Mode for an optional thread count from configuration.
    ///
    /// `None` uses every core, `Some(1)` runs sequentially.
    pub fn from_threads(threads: Option<usize>) -> Result<Self> {
        match threads {
            None => Ok(ProcessingMode::Parallel),
            Some(0) => Err(Error::InvalidParameter {
                name: "threads",
                value: "0".into(),
                reason: "must be at least 1".into(),
            }),
            Some(1) => Ok(ProcessingMode::Sequential),
            Some(n) => Ok(ProcessingMode::ParallelWith(n)),
        }
    }
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Map a function over indices and collect results in index order
    fn par_map<T, F>(&self, range: Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;
}

#[cfg(feature = "parallel")]
impl ParallelStrategy for ProcessingMode {
    fn par_map<T, F>(&self, range: Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => Ok(range.map(f).collect()),
            ProcessingMode::Parallel => Ok(range.into_par_iter().map(f).collect()),
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(*threads)
                    .build()
                    .map_err(|e| Error::Other(format!("Failed to build thread pool: {}", e)))?;
                Ok(pool.install(|| range.into_par_iter().map(f).collect()))
            }
        }
    }
}

#[cfg(not(feature = "parallel"))]
impl ParallelStrategy for ProcessingMode {
    fn par_map<T, F>(&self, range: Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        Ok(range.map(f).collect())
    }
}

/// Get the number of available CPU cores
#[cfg(feature = "parallel")]
pub fn num_cpus() -> usize {
    rayon::current_num_threads()
}

/// Get the number of available CPU cores
#[cfg(not(feature = "parallel"))]
pub fn num_cpus() -> usize {
    1
}
