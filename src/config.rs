//! Configuration discovery for powercap zones and output sinks
//!
//! The zone count comes from `KEDP_NUM_POWER_ZONES` (required). Two optional
//! overrides exist so the hook can be pointed at a fake powercap tree and a
//! scratch output directory under test: `KEDP_POWERCAP_ROOT` and
//! `KEDP_OUTPUT_DIR`.
//!
//! Zone order is index order `0..n` and never changes after construction;
//! the energy columns in both CSV sinks follow this order.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{EdpError, Result};

/// Number of powercap zones to sample (required, positive integer)
pub const NUM_ZONES_VAR: &str = "KEDP_NUM_POWER_ZONES";

/// Base directory of the powercap hierarchy (optional override)
pub const POWERCAP_ROOT_VAR: &str = "KEDP_POWERCAP_ROOT";

/// Directory receiving the CSV sinks (optional, defaults to cwd)
pub const OUTPUT_DIR_VAR: &str = "KEDP_OUTPUT_DIR";

const DEFAULT_POWERCAP_ROOT: &str = "/sys/devices/virtual/powercap/intel-rapl";

/// Resolved configuration: ordered zone counter paths plus the output directory
#[derive(Debug, Clone)]
pub struct Config {
    zone_paths: Vec<PathBuf>,
    output_dir: PathBuf,
}

impl Config {
    /// Discover configuration from the process environment.
    ///
    /// Fails if the zone count is missing or invalid, or if any zone's
    /// `energy_uj` file does not exist.
    pub fn from_env() -> Result<Self> {
        let raw = env::var(NUM_ZONES_VAR).map_err(|_| EdpError::MissingEnv {
            var: NUM_ZONES_VAR,
        })?;
        let num_zones: usize = match raw.trim().parse() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(EdpError::InvalidZoneCount {
                    var: NUM_ZONES_VAR,
                    value: raw,
                })
            }
        };

        let root = env::var(POWERCAP_ROOT_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_POWERCAP_ROOT));
        let output_dir = env::var(OUTPUT_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        Self::with_root(num_zones, &root, output_dir)
    }

    /// Build a configuration against an explicit powercap root.
    ///
    /// Validates that every zone's counter file exists; a missing file is a
    /// fatal construction-time error, not a recoverable one.
    pub fn with_root(num_zones: usize, root: &Path, output_dir: PathBuf) -> Result<Self> {
        let mut zone_paths = Vec::with_capacity(num_zones);
        for i in 0..num_zones {
            let path = root.join(format!("intel-rapl:{i}")).join("energy_uj");
            if !path.exists() {
                return Err(EdpError::MissingCounter { path });
            }
            zone_paths.push(path);
        }
        Ok(Self {
            zone_paths,
            output_dir,
        })
    }

    /// Zone counter paths in configured (index) order
    pub fn zone_paths(&self) -> &[PathBuf] {
        &self.zone_paths
    }

    pub fn num_zones(&self) -> usize {
        self.zone_paths.len()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fake_powercap(zones: &[u64]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (i, uj) in zones.iter().enumerate() {
            let zone_dir = dir.path().join(format!("intel-rapl:{i}"));
            fs::create_dir(&zone_dir).unwrap();
            fs::write(zone_dir.join("energy_uj"), format!("{uj}\n")).unwrap();
        }
        dir
    }

    #[test]
    fn test_with_root_resolves_zone_paths_in_order() {
        let tree = fake_powercap(&[100, 200, 300]);
        let config = Config::with_root(3, tree.path(), PathBuf::from(".")).unwrap();

        assert_eq!(config.num_zones(), 3);
        for (i, path) in config.zone_paths().iter().enumerate() {
            assert!(path.ends_with(format!("intel-rapl:{i}/energy_uj")));
        }
    }

    #[test]
    fn test_with_root_missing_zone_is_fatal() {
        let tree = fake_powercap(&[100]);
        let err = Config::with_root(2, tree.path(), PathBuf::from(".")).unwrap_err();

        match err {
            EdpError::MissingCounter { path } => {
                assert!(path.ends_with("intel-rapl:1/energy_uj"));
            }
            other => panic!("expected MissingCounter, got {other:?}"),
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_requires_zone_count() {
        std::env::remove_var(NUM_ZONES_VAR);
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, EdpError::MissingEnv { var } if var == NUM_ZONES_VAR));
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_rejects_bad_zone_count() {
        for bad in ["0", "-1", "two", ""] {
            std::env::set_var(NUM_ZONES_VAR, bad);
            let err = Config::from_env().unwrap_err();
            assert!(
                matches!(err, EdpError::InvalidZoneCount { .. }),
                "value {bad:?} should be rejected"
            );
        }
        std::env::remove_var(NUM_ZONES_VAR);
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_honors_overrides() {
        let tree = fake_powercap(&[100, 200]);
        std::env::set_var(NUM_ZONES_VAR, "2");
        std::env::set_var(POWERCAP_ROOT_VAR, tree.path());
        std::env::set_var(OUTPUT_DIR_VAR, "/tmp/out");

        let config = Config::from_env().unwrap();
        assert_eq!(config.num_zones(), 2);
        assert_eq!(config.output_dir(), Path::new("/tmp/out"));

        std::env::remove_var(NUM_ZONES_VAR);
        std::env::remove_var(POWERCAP_ROOT_VAR);
        std::env::remove_var(OUTPUT_DIR_VAR);
    }
}
