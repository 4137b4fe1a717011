//! Energy counter sources
//!
//! A counter source exposes one zone's monotonically non-decreasing
//! cumulative energy counter by point-in-time sampling. The production
//! implementation reads a powercap `energy_uj` file; tests substitute
//! in-memory sources through the `CounterSource` trait.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EdpError, Result};

/// One zone's cumulative energy counter, sampled by value
pub trait CounterSource: fmt::Debug + Send {
    /// Read the current counter value in microjoules.
    fn read(&self) -> Result<u64>;
}

/// Counter backed by a powercap `energy_uj` sysfs file
#[derive(Debug, Clone)]
pub struct PowercapCounter {
    path: PathBuf,
}

impl PowercapCounter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CounterSource for PowercapCounter {
    fn read(&self) -> Result<u64> {
        let raw = fs::read_to_string(&self.path).map_err(|source| EdpError::CounterRead {
            path: self.path.clone(),
            source,
        })?;
        raw.trim().parse().map_err(|_| EdpError::CounterParse {
            path: self.path.clone(),
            raw: raw.trim().to_string(),
        })
    }
}
