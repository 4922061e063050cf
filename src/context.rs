//! Per-invocation execution contexts.
//!
//! A context is built from exactly one policy at the start of a dispatch
//! call and destroyed when the call returns. It snapshots the resolved
//! capability (instruction-set ceiling or device queue) so kernels cannot
//! re-resolve mid-call, and it lazily owns the communicator shared by every
//! collective operation within the call.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Once;

use crate::communicator::{Communicator, CommunicatorProvider};
use crate::cpu::{detect_top_cpu_extension, CpuExtension};
use crate::device::DeviceQueue;
use crate::policy::{DataParallelPolicy, HostPolicy, SpmdDataParallelPolicy, SpmdHostPolicy};

static GLOBAL_INIT: Once = Once::new();
static GLOBAL_INIT_RUNS: AtomicU32 = AtomicU32::new(0);

/// Process-wide setup shared by every CPU context ever constructed.
///
/// Runs at most once regardless of how many threads race to build the first
/// context; all racers observe fully initialized state before returning.
/// A panic in the closure poisons the `Once` and fails every later
/// construction.
fn global_init() {
    GLOBAL_INIT.call_once(|| {
        // Warm the process-wide hardware probe so dispatch never pays for
        // detection on a hot path.
        let _ = detect_top_cpu_extension();
        GLOBAL_INIT_RUNS.fetch_add(1, Ordering::Relaxed);
    });
}

/// Number of times global init actually ran. At most 1 per process.
#[cfg(test)]
pub(crate) fn global_init_runs() -> u32 {
    GLOBAL_INIT_RUNS.load(Ordering::Relaxed)
}

/// Resolved execution state for a CPU kernel invocation.
#[derive(Debug)]
pub struct CpuContext {
    extensions: CpuExtension,
    communicator: CommunicatorProvider,
}

impl CpuContext {
    /// Context for a single-node host call.
    #[must_use]
    pub fn new(policy: &HostPolicy) -> Self {
        global_init();
        Self {
            extensions: policy.enabled_cpu_extensions(),
            communicator: CommunicatorProvider::empty(),
        }
    }

    /// Context for a distributed host call; carries the policy's
    /// communicator.
    #[must_use]
    pub fn from_spmd(policy: &SpmdHostPolicy) -> Self {
        global_init();
        Self {
            extensions: policy.local().enabled_cpu_extensions(),
            communicator: CommunicatorProvider::seeded(policy.communicator().clone()),
        }
    }

    /// Context built from a bare communicator, using the process-wide
    /// default instruction-set ceiling.
    ///
    /// Used by collective callbacks that have a communicator in hand but no
    /// originating policy.
    #[must_use]
    pub fn from_communicator(communicator: Communicator) -> Self {
        global_init();
        Self {
            extensions: detect_top_cpu_extension(),
            communicator: CommunicatorProvider::seeded(communicator),
        }
    }

    /// The instruction-set ceiling resolved for this call. Immutable for
    /// the call's duration.
    #[must_use]
    pub fn enabled_cpu_extensions(&self) -> CpuExtension {
        self.extensions
    }

    /// The communicator for this call; the empty group for single-node
    /// contexts, created on first access and cached.
    #[must_use]
    pub fn communicator(&self) -> &Communicator {
        self.communicator.get()
    }
}

impl Default for CpuContext {
    fn default() -> Self {
        Self::new(&HostPolicy::default())
    }
}

/// Resolved execution state for a GPU kernel invocation.
///
/// Performs no feature detection; the queue snapshot is the whole resolved
/// capability.
#[derive(Debug)]
pub struct GpuContext {
    queue: DeviceQueue,
    communicator: CommunicatorProvider,
}

impl GpuContext {
    /// Context for a single-node data-parallel call.
    #[must_use]
    pub fn new(policy: &DataParallelPolicy) -> Self {
        Self {
            queue: policy.queue().clone(),
            communicator: CommunicatorProvider::empty(),
        }
    }

    /// Context for a distributed data-parallel call; carries the policy's
    /// communicator so the kernel's internal collectives can run.
    #[must_use]
    pub fn from_spmd(policy: &SpmdDataParallelPolicy) -> Self {
        Self {
            queue: policy.local().queue().clone(),
            communicator: CommunicatorProvider::seeded(policy.communicator().clone()),
        }
    }

    /// The queue this call executes on.
    #[must_use]
    pub fn queue(&self) -> &DeviceQueue {
        &self.queue
    }

    /// The communicator for this call; the empty group for single-node
    /// contexts, created on first access and cached.
    #[must_use]
    pub fn communicator(&self) -> &Communicator {
        self.communicator.get()
    }
}
