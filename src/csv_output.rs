//! CSV sample sinks for per-quantum and whole-run measurements
//!
//! Two tabular sinks, truncated fresh at construction with headers written
//! eagerly. Energy columns are zero-indexed and follow configured zone
//! order. Kernel names are written single-quoted, matching the row shape
//! other tooling in this area already parses.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::error;

use crate::engine::{QuantumSample, RunSample};

/// Per-quantum sink file name
pub const KERNEL_CSV: &str = "joulehook.kernel.csv";

/// Whole-run sink file name
pub const GLOBAL_CSV: &str = "joulehook.global.csv";

/// Owns both CSV sinks and appends one row per sample.
///
/// Row-write failures are logged and swallowed: by the time a sample
/// reaches the writer the measurement is complete, and losing a row must
/// not take down the hosting process.
#[derive(Debug)]
pub struct SampleWriter {
    kernel_sink: BufWriter<File>,
    global_sink: BufWriter<File>,
}

impl SampleWriter {
    /// Create both sinks under `dir` and write their headers.
    pub fn create(dir: &Path, num_zones: usize) -> Result<Self> {
        let kernel_path = dir.join(KERNEL_CSV);
        let kernel_file = File::create(&kernel_path)
            .with_context(|| format!("cannot create {}", kernel_path.display()))?;
        let mut kernel_sink = BufWriter::new(kernel_file);
        writeln!(kernel_sink, "{}", Self::kernel_header(num_zones))
            .with_context(|| format!("cannot write header to {}", kernel_path.display()))?;
        kernel_sink.flush()?;

        let global_path = dir.join(GLOBAL_CSV);
        let global_file = File::create(&global_path)
            .with_context(|| format!("cannot create {}", global_path.display()))?;
        let mut global_sink = BufWriter::new(global_file);
        writeln!(global_sink, "{}", Self::global_header(num_zones))
            .with_context(|| format!("cannot write header to {}", global_path.display()))?;
        global_sink.flush()?;

        Ok(Self {
            kernel_sink,
            global_sink,
        })
    }

    /// Header row for the per-quantum sink
    fn kernel_header(num_zones: usize) -> String {
        let mut header = String::from("kernel_name,count,time_ms");
        for i in 0..num_zones {
            header.push_str(&format!(",energy_uj{i}"));
        }
        header
    }

    /// Header row for the whole-run sink
    fn global_header(num_zones: usize) -> String {
        let mut header = String::from("time_ms");
        for i in 0..num_zones {
            header.push_str(&format!(",energy_uj{i}"));
        }
        header
    }

    fn format_quantum_row(sample: &QuantumSample) -> String {
        let mut row = format!(
            "'{}',{},{}",
            sample.kernel_name, sample.count, sample.time_ms
        );
        for energy in &sample.energy_uj {
            row.push(',');
            row.push_str(&energy.to_string());
        }
        row
    }

    fn format_run_row(sample: &RunSample) -> String {
        let mut row = sample.time_ms.to_string();
        for energy in &sample.energy_uj {
            row.push(',');
            row.push_str(&energy.to_string());
        }
        row
    }

    /// Append one closed quantum's row and flush it.
    pub fn write_quantum(&mut self, sample: &QuantumSample) {
        let row = Self::format_quantum_row(sample);
        if let Err(err) = writeln!(self.kernel_sink, "{row}").and_then(|()| self.kernel_sink.flush())
        {
            error!(%err, "failed to append quantum row");
        }
    }

    /// Append the whole-run row and flush it.
    pub fn write_run(&mut self, sample: &RunSample) {
        let row = Self::format_run_row(sample);
        if let Err(err) = writeln!(self.global_sink, "{row}").and_then(|()| self.global_sink.flush())
        {
            error!(%err, "failed to append whole-run row");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_kernel_header_one_column_per_zone() {
        assert_eq!(
            SampleWriter::kernel_header(3),
            "kernel_name,count,time_ms,energy_uj0,energy_uj1,energy_uj2"
        );
    }

    #[test]
    fn test_global_header_one_column_per_zone() {
        assert_eq!(SampleWriter::global_header(2), "time_ms,energy_uj0,energy_uj1");
    }

    #[test]
    fn test_quantum_row_quotes_name_and_orders_zones() {
        let sample = QuantumSample {
            kernel_name: "axpy".to_string(),
            count: 4,
            time_ms: 12.5,
            energy_uj: vec![100, 600],
        };
        assert_eq!(
            SampleWriter::format_quantum_row(&sample),
            "'axpy',4,12.5,100,600"
        );
    }

    #[test]
    fn test_run_row_has_no_name_or_count() {
        let sample = RunSample {
            time_ms: 1500.25,
            energy_uj: vec![42],
        };
        assert_eq!(SampleWriter::format_run_row(&sample), "1500.25,42");
    }

    #[test]
    fn test_create_truncates_and_writes_headers() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(KERNEL_CSV), "stale content\n").unwrap();

        let _writer = SampleWriter::create(dir.path(), 2).unwrap();

        let kernel = fs::read_to_string(dir.path().join(KERNEL_CSV)).unwrap();
        assert_eq!(kernel, "kernel_name,count,time_ms,energy_uj0,energy_uj1\n");
        let global = fs::read_to_string(dir.path().join(GLOBAL_CSV)).unwrap();
        assert_eq!(global, "time_ms,energy_uj0,energy_uj1\n");
    }

    #[test]
    fn test_rows_appear_after_header() {
        let dir = TempDir::new().unwrap();
        let mut writer = SampleWriter::create(dir.path(), 1).unwrap();

        writer.write_quantum(&QuantumSample {
            kernel_name: "dot".to_string(),
            count: 2,
            time_ms: 3.0,
            energy_uj: vec![77],
        });
        writer.write_run(&RunSample {
            time_ms: 10.0,
            energy_uj: vec![123],
        });

        let kernel = fs::read_to_string(dir.path().join(KERNEL_CSV)).unwrap();
        assert!(kernel.ends_with("'dot',2,3,77\n"));
        let global = fs::read_to_string(dir.path().join(GLOBAL_CSV)).unwrap();
        assert!(global.ends_with("10,123\n"));
    }
}
