//! Kokkos Tools callback surface
//!
//! Thin adapter mapping the Kokkos profiling callback ABI onto the quantum
//! engine. The profiler instance is constructed in `kokkosp_init_library`,
//! owned by this module for the duration of the run, and torn down in
//! `kokkosp_finalize_library`; every callback borrows it through the slot
//! below rather than touching engine state ambiently.
//!
//! Error policy: the engine reports failures as values; this layer decides
//! what they mean for the host. Configuration and counter-read failures are
//! unrecoverable environment faults, so the process is aborted after
//! logging — a silently skipped sample would corrupt the accounting
//! invariant that every closed quantum carries all zones' deltas. Nothing
//! panics or unwinds across the C boundary.

use std::ffi::CStr;
use std::sync::{Mutex, PoisonError};

use libc::{c_char, c_int, c_uint, c_void};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::counter::{CounterSource, PowercapCounter};
use crate::csv_output::SampleWriter;
use crate::engine::QuantumEngine;

/// Engine plus its output sinks, owned across callbacks
#[derive(Debug)]
struct Profiler {
    engine: QuantumEngine,
    writer: SampleWriter,
}

static PROFILER: Mutex<Option<Profiler>> = Mutex::new(None);

fn with_profiler<F: FnOnce(&mut Profiler)>(f: F) {
    let mut slot = PROFILER.lock().unwrap_or_else(PoisonError::into_inner);
    // Callbacks arriving before init or after finalize are ignored.
    if let Some(profiler) = slot.as_mut() {
        f(profiler);
    }
}

fn build_profiler() -> anyhow::Result<Profiler> {
    let config = Config::from_env()?;
    let sources: Vec<Box<dyn CounterSource>> = config
        .zone_paths()
        .iter()
        .cloned()
        .map(|path| Box::new(PowercapCounter::new(path)) as Box<dyn CounterSource>)
        .collect();
    let writer = SampleWriter::create(config.output_dir(), config.num_zones())?;
    Ok(Profiler {
        engine: QuantumEngine::new(sources),
        writer,
    })
}

fn init_tracing() {
    // The host process may already have a subscriber installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Library load: construct the profiler and open the whole-run window.
#[no_mangle]
pub extern "C" fn kokkosp_init_library(
    load_seq: c_int,
    interface_ver: u64,
    dev_info_count: u32,
    _device_info: *mut c_void,
) {
    init_tracing();
    let mut profiler = match build_profiler() {
        Ok(profiler) => profiler,
        Err(err) => {
            error!(%err, "joulehook initialization failed");
            std::process::abort();
        }
    };
    if let Err(err) = profiler.engine.global_tick() {
        error!(%err, "whole-run baseline read failed");
        std::process::abort();
    }
    info!(
        load_seq,
        interface_ver,
        dev_info_count,
        zones = profiler.engine.num_zones(),
        "joulehook initialized"
    );
    *PROFILER.lock().unwrap_or_else(PoisonError::into_inner) = Some(profiler);
}

/// Library unload: close the whole-run window, emit its row, drop the
/// profiler. The run row is always emitted, even with zero launches.
#[no_mangle]
pub extern "C" fn kokkosp_finalize_library() {
    let profiler = PROFILER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(mut profiler) = profiler {
        if let Err(err) = profiler.engine.global_tock() {
            error!(%err, "whole-run final read failed");
            std::process::abort();
        }
        profiler.writer.write_run(&profiler.engine.run_sample());
        info!("joulehook finalized");
    }
}

/// Kernel launch begin: shift kernel identity, open a quantum if due.
#[no_mangle]
pub extern "C" fn kokkosp_begin_parallel_for(
    name: *const c_char,
    _dev_id: c_uint,
    _kernel_id: *mut u64,
) {
    let name = if name.is_null() {
        String::new()
    } else {
        // SAFETY: non-null `name` points to a NUL-terminated string owned
        // by the Kokkos runtime for the duration of this callback.
        unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned()
    };
    with_profiler(|profiler| profiler.engine.begin_kernel(&name));
}

/// Kernel launch end: count the launch and, if the quantum closed on this
/// call, emit its row.
#[no_mangle]
pub extern "C" fn kokkosp_end_parallel_for(_kernel_id: u64) {
    with_profiler(|profiler| match profiler.engine.tock() {
        Ok(()) => {
            if profiler.engine.has_valid_measure() {
                profiler
                    .writer
                    .write_quantum(&profiler.engine.quantum_sample());
            }
        }
        Err(err) => {
            error!(%err, "energy counter read failed mid-run");
            std::process::abort();
        }
    });
}

// Scan and reduce launches are deliberately excluded from measurement; the
// symbols exist so the Kokkos runtime finds a complete tool surface.

#[no_mangle]
pub extern "C" fn kokkosp_begin_parallel_scan(
    _name: *const c_char,
    _dev_id: c_uint,
    _kernel_id: *mut u64,
) {
}

#[no_mangle]
pub extern "C" fn kokkosp_end_parallel_scan(_kernel_id: u64) {}

#[no_mangle]
pub extern "C" fn kokkosp_begin_parallel_reduce(
    _name: *const c_char,
    _dev_id: c_uint,
    _kernel_id: *mut u64,
) {
}

#[no_mangle]
pub extern "C" fn kokkosp_end_parallel_reduce(_kernel_id: u64) {}
