//! Quantum accounting engine
//!
//! Powercap counters advance on a hardware-driven interval (tens of
//! milliseconds), vastly coarser than kernel launch frequency, which can be
//! sub-millisecond. Attributing energy to individual launches would mostly
//! produce zero or stale deltas, so the engine coalesces consecutive
//! same-named launches into one measurement window (a "quantum"): the window
//! opens on the first launch and only closes on the launch-end whose sampling
//! finds that every configured zone's counter has advanced. Counter
//! resolution governs quantum length, not wall-clock time or launch count.
//!
//! The engine assumes strictly sequential callback invocation from one
//! logical control thread; it carries no locking of its own. A launch that
//! never reports its end leaves the quantum permanently open, which is an
//! acceptable degenerate state (it simply never emits).

use std::time::Instant;

use tracing::{debug, warn};

use crate::counter::CounterSource;
use crate::error::Result;
use crate::kernel::KernelTracker;

/// Per-zone sampling state: the counter source handle plus the values
/// captured at quantum open/close and run open/close.
#[derive(Debug)]
struct ZoneDescriptor {
    source: Box<dyn CounterSource>,
    tick: u64,
    tock: u64,
    global_tick: u64,
    global_tock: u64,
}

impl ZoneDescriptor {
    fn new(source: Box<dyn CounterSource>) -> Self {
        Self {
            source,
            tick: 0,
            tock: 0,
            global_tick: 0,
            global_tock: 0,
        }
    }
}

/// Quantum open/close and run open/close timestamps, updated in lock-step
/// with the zone descriptors.
#[derive(Debug, Clone, Copy)]
struct TimeDescriptor {
    tick: Instant,
    tock: Instant,
    global_tick: Instant,
    global_tock: Instant,
}

impl TimeDescriptor {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            tick: now,
            tock: now,
            global_tick: now,
            global_tock: now,
        }
    }
}

/// One closed quantum's measurement: kernel name, number of coalesced
/// launches, elapsed wall time, and one energy delta per zone in
/// configured order.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantumSample {
    pub kernel_name: String,
    pub count: u64,
    pub time_ms: f64,
    pub energy_uj: Vec<u64>,
}

/// The whole-run measurement spanning library load to unload
#[derive(Debug, Clone, PartialEq)]
pub struct RunSample {
    pub time_ms: f64,
    pub energy_uj: Vec<u64>,
}

/// Owns quantum lifecycle: open on launch-begin, extend across launches
/// whose end-sampling finds a stale counter, close when every zone moved.
#[derive(Debug)]
pub struct QuantumEngine {
    zones: Vec<ZoneDescriptor>,
    time: TimeDescriptor,
    kernels: KernelTracker,
    should_create_quantum: bool,
    quantum_size: u64,
}

impl QuantumEngine {
    /// Build an engine over the given counter sources, one per zone.
    /// Zone order is preserved everywhere: sampling order, delta order,
    /// output column order.
    pub fn new(sources: Vec<Box<dyn CounterSource>>) -> Self {
        Self {
            zones: sources.into_iter().map(ZoneDescriptor::new).collect(),
            time: TimeDescriptor::new(),
            kernels: KernelTracker::new(),
            // Opens the very first quantum even if the first kernel's name
            // equals the tracker's empty initial state.
            should_create_quantum: true,
            quantum_size: 0,
        }
    }

    /// Launch-begin event: record the kernel identity, then tick.
    pub fn begin_kernel(&mut self, name: &str) {
        self.kernels.shift(name);
        self.tick();
    }

    /// Open a new quantum if the previous one closed or the kernel identity
    /// changed; otherwise the in-flight quantum continues to accumulate.
    ///
    /// A name change abandons a still-open quantum without emitting it: its
    /// counters never all advanced, so there is nothing sound to report.
    /// That batch's launches go unattributed (visible only in the whole-run
    /// totals).
    pub fn tick(&mut self) {
        if !(self.should_create_quantum || self.kernels.changed()) {
            return;
        }
        for zone in &mut self.zones {
            // Read failures at open are not propagated; the degraded zero
            // baseline surfaces later as an oversized delta.
            zone.tick = match zone.source.read() {
                Ok(value) => value,
                Err(err) => {
                    warn!(%err, "counter read failed at quantum open");
                    0
                }
            };
        }
        self.time.tick = Instant::now();
        self.quantum_size = 0;
        debug!(kernel = self.kernels.current(), "quantum opened");
    }

    /// Launch-end event: count the launch, then try to close the quantum.
    ///
    /// Zones are examined in configured order. The first zone whose counter
    /// equals its open baseline keeps the quantum open and short-circuits
    /// the remaining zones; requiring all zones to move avoids emitting a
    /// zero delta for a slow-updating zone and avoids double-counting a
    /// fast one. A failed read is fatal to the measurement and propagates.
    pub fn tock(&mut self) -> Result<()> {
        self.quantum_size += 1;
        self.should_create_quantum = true;
        for zone in &mut self.zones {
            let value = zone.source.read()?;
            if value == zone.tick {
                // Stale counter: normal outcome, quantum stays open.
                self.should_create_quantum = false;
                return Ok(());
            }
            zone.tock = value;
        }
        self.time.tock = Instant::now();
        debug!(
            kernel = self.kernels.current(),
            launches = self.quantum_size,
            "quantum closed"
        );
        Ok(())
    }

    /// Did the last `tock` close the quantum? The caller must check this
    /// before emitting, or it would emit incomplete deltas for a quantum
    /// that is still open.
    pub fn has_valid_measure(&self) -> bool {
        self.should_create_quantum
    }

    /// Launches coalesced into the current quantum so far
    pub fn quantum_size(&self) -> u64 {
        self.quantum_size
    }

    pub fn num_zones(&self) -> usize {
        self.zones.len()
    }

    /// Open the whole-run window. Called once at library load; a failed
    /// read is fatal.
    pub fn global_tick(&mut self) -> Result<()> {
        for zone in &mut self.zones {
            zone.global_tick = zone.source.read()?;
        }
        self.time.global_tick = Instant::now();
        Ok(())
    }

    /// Close the whole-run window. Called once at library unload. Unlike
    /// `tock` there is no staleness check: the run sample is always emitted
    /// and a zero delta is itself valid information.
    pub fn global_tock(&mut self) -> Result<()> {
        for zone in &mut self.zones {
            zone.global_tock = zone.source.read()?;
        }
        self.time.global_tock = Instant::now();
        Ok(())
    }

    /// Assemble the sample for the quantum just closed.
    ///
    /// Only meaningful when `has_valid_measure()` is true.
    pub fn quantum_sample(&self) -> QuantumSample {
        QuantumSample {
            kernel_name: self.kernels.current().to_string(),
            count: self.quantum_size,
            time_ms: self.time.tock.duration_since(self.time.tick).as_secs_f64() * 1e3,
            // Counters wrap at max_energy_range_uj, so subtraction wraps too.
            energy_uj: self
                .zones
                .iter()
                .map(|zone| zone.tock.wrapping_sub(zone.tick))
                .collect(),
        }
    }

    /// Assemble the whole-run sample spanning load to unload
    pub fn run_sample(&self) -> RunSample {
        RunSample {
            time_ms: self
                .time
                .global_tock
                .duration_since(self.time.global_tick)
                .as_secs_f64()
                * 1e3,
            energy_uj: self
                .zones
                .iter()
                .map(|zone| zone.global_tock.wrapping_sub(zone.global_tick))
                .collect(),
        }
    }
}
