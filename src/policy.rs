//! Execution policies: where a dispatched call should run.
//!
//! A policy is an opaque, read-only description of intended placement and
//! scale. It performs no I/O and no validation; whether the requested
//! combination is actually supported is decided at dispatch time.

use crate::communicator::Communicator;
use crate::cpu::{detect_top_cpu_extension, CpuExtension};
use crate::device::DeviceQueue;

/// Single-node execution on the host CPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPolicy {
    extensions: CpuExtension,
}

impl HostPolicy {
    /// The instruction-set ceiling this policy allows.
    #[must_use]
    pub fn enabled_cpu_extensions(&self) -> CpuExtension {
        self.extensions
    }

    /// Caps the policy's instruction-set ceiling.
    ///
    /// Useful for pinning a call to a lower tier than the hardware supports,
    /// typically in tests or when chasing tier-specific behavior.
    #[must_use]
    pub fn with_cpu_extensions(mut self, ceiling: CpuExtension) -> Self {
        self.extensions = ceiling;
        self
    }
}

impl Default for HostPolicy {
    fn default() -> Self {
        Self { extensions: detect_top_cpu_extension() }
    }
}

/// Single-node execution on a device queue (typically a GPU).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataParallelPolicy {
    queue: DeviceQueue,
}

impl DataParallelPolicy {
    /// The queue the call should execute on.
    #[must_use]
    pub fn queue(&self) -> &DeviceQueue {
        &self.queue
    }
}

/// Multi-node (SPMD) execution across host CPUs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpmdHostPolicy {
    local: HostPolicy,
    communicator: Communicator,
}

impl SpmdHostPolicy {
    /// The per-node local policy.
    #[must_use]
    pub fn local(&self) -> &HostPolicy {
        &self.local
    }

    /// The communicator binding this node into the group.
    #[must_use]
    pub fn communicator(&self) -> &Communicator {
        &self.communicator
    }
}

/// Multi-node (SPMD) execution across device queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpmdDataParallelPolicy {
    local: DataParallelPolicy,
    communicator: Communicator,
}

impl SpmdDataParallelPolicy {
    /// The per-node local policy.
    #[must_use]
    pub fn local(&self) -> &DataParallelPolicy {
        &self.local
    }

    /// The communicator binding this node into the group.
    #[must_use]
    pub fn communicator(&self) -> &Communicator {
        &self.communicator
    }
}

/// Creates a host policy with the detected instruction-set ceiling.
#[must_use]
pub fn host_policy() -> HostPolicy {
    HostPolicy::default()
}

/// Creates a single-node data-parallel policy bound to `queue`.
#[must_use]
pub fn data_parallel_policy(queue: DeviceQueue) -> DataParallelPolicy {
    DataParallelPolicy { queue }
}

/// Wraps a local host policy into a distributed group.
#[must_use]
pub fn spmd_host_policy(local: HostPolicy, communicator: Communicator) -> SpmdHostPolicy {
    SpmdHostPolicy { local, communicator }
}

/// Wraps a local data-parallel policy into a distributed group.
#[must_use]
pub fn spmd_data_parallel_policy(
    local: DataParallelPolicy,
    communicator: Communicator,
) -> SpmdDataParallelPolicy {
    SpmdDataParallelPolicy { local, communicator }
}
