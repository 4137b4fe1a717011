//! Joulehook - Kokkos Tools energy/time profiling hook
//!
//! This library attributes wall-clock duration and RAPL energy consumption
//! (read from Linux powercap cumulative counters) to batches of consecutive,
//! same-named Kokkos kernel launches. Powercap counters update on a coarse
//! hardware interval, far slower than kernel launch frequency, so launches
//! are coalesced into measurement quanta until every configured zone's
//! counter has advanced.

pub mod config;
pub mod counter;
pub mod csv_output;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod kernel;
