//! Error taxonomy for configuration discovery and counter sampling
//!
//! Configuration errors are fatal at construction time, before any
//! measurement begins. Read errors during steady-state sampling are
//! propagated to the adapter layer, which decides whether to abort the
//! hosting process. A stale (non-advancing) counter is normal control
//! flow, not an error, and never appears here.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EdpError>;

#[derive(Debug, Error)]
pub enum EdpError {
    /// Required environment variable absent at startup
    #[error("{var} environment variable not set")]
    MissingEnv { var: &'static str },

    /// Zone count present but not a positive integer
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidZoneCount { var: &'static str, value: String },

    /// A configured zone's backing counter file is absent at startup
    #[error("powercap file {} doesn't exist", path.display())]
    MissingCounter { path: PathBuf },

    /// Counter file could not be opened or read during sampling
    #[error("cannot read file {}: {source}", path.display())]
    CounterRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Counter file contents are not a decimal microjoule value
    #[error("counter {} holds non-numeric value {raw:?}", path.display())]
    CounterParse { path: PathBuf, raw: String },
}
