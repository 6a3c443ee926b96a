//! Processing strategies for the point scans
//!
//! When the `parallel` feature is enabled the outer loop of each scan is
//! split across rayon workers. When disabled (e.g. for WASM builds) every
//! mode falls back to a sequential loop with the same API.
//!
//! Results always come back in index order, so a fold over them is
//! reproducible whatever the mode or thread count.

use serde::{Deserialize, Serialize};
use spatassoc_core::{Error, Result};
use std::ops::Range;

/// Processing mode for the neighbor and pair scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on the global rayon pool
    #[default]
    Parallel,
    /// Parallel with a dedicated pool of the given number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Map `f` over `range` and collect the results in index order.
    pub fn map_indexed<T, F>(&self, range: Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match *self {
            ProcessingMode::Sequential => Ok(range.map(f).collect()),
            ProcessingMode::Parallel => Ok(par_map(range, f)),
            ProcessingMode::ParallelWith(0) => Err(Error::InvalidParameter {
                name: "threads",
                value: "0".into(),
                reason: "thread count must be > 0".into(),
            }),
            ProcessingMode::ParallelWith(threads) => map_in_pool(threads, range, f),
        }
    }
}

/// Number of worker threads a `Parallel` scan will use
pub fn available_threads() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}

#[cfg(feature = "parallel")]
fn par_map<T, F>(range: Range<usize>, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    use rayon::prelude::*;
    range.into_par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn par_map<T, F>(range: Range<usize>, f: F) -> Vec<T>
where
    F: Fn(usize) -> T,
{
    range.map(f).collect()
}

#[cfg(feature = "parallel")]
fn map_in_pool<T, F>(threads: usize, range: Range<usize>, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| Error::Algorithm(format!("Failed to build thread pool: {}", e)))?;
    Ok(pool.install(|| par_map(range, f)))
}

#[cfg(not(feature = "parallel"))]
fn map_in_pool<T, F>(_threads: usize, range: Range<usize>, f: F) -> Result<Vec<T>>
where
    F: Fn(usize) -> T,
{
    Ok(range.map(f).collect())
}
