//! Device model and the device router.
//!
//! A [`DeviceQueue`] is the opaque execution-queue handle a data-parallel
//! policy binds to. The router classifies the queue's device as host-like,
//! CPU-like, or GPU-like and branches to the matching callable; anything
//! else is rejected with [`DispatchError::UnsupportedDevice`].

use std::fmt;

use crate::error::{DispatchError, Result};
use crate::policy::DataParallelPolicy;

/// Kind of compute device a queue is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceKind {
    /// The host itself exposed as a device.
    Host,
    /// A CPU exposed through the device runtime.
    Cpu,
    /// A GPU device.
    Gpu,
    /// A non-GPU accelerator (FPGA, NPU, ...). Not routable.
    Accelerator,
    /// A kind the runtime could not classify. Not routable.
    Other,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Host => "host",
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
            Self::Accelerator => "accelerator",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// A compute device visible to the dispatch layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    kind: DeviceKind,
    name: String,
}

impl Device {
    /// Creates a device of the given kind with a generic name.
    #[must_use]
    pub fn new(kind: DeviceKind) -> Self {
        Self { kind, name: kind.to_string() }
    }

    /// Creates a device with a runtime-reported name.
    #[must_use]
    pub fn named(kind: DeviceKind, name: impl Into<String>) -> Self {
        Self { kind, name: name.into() }
    }

    /// The device's classified kind.
    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// The device's reported name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An execution queue bound to one device.
///
/// Queues are opaque to the dispatch layer; kernels receive the queue
/// through their [`GpuContext`](crate::context::GpuContext) and submit work
/// however their runtime requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceQueue {
    device: Device,
}

impl DeviceQueue {
    /// Creates a queue bound to `device`.
    #[must_use]
    pub fn new(device: Device) -> Self {
        Self { device }
    }

    /// The device this queue is bound to.
    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }
}

/// Routes a data-parallel policy to its CPU or GPU branch.
///
/// Host-like and CPU-like devices take `cpu_branch`; GPU devices take
/// `gpu_branch`. Exactly one branch is invoked and receives the forwarded
/// `args`. Any other device kind fails with
/// [`DispatchError::UnsupportedDevice`] carrying the reported kind.
///
/// Branches that are invalid for a given algorithm are written as branches
/// that unconditionally return an error, so the return type stays uniform
/// across the router.
pub fn dispatch_by_device<A, T>(
    policy: &DataParallelPolicy,
    args: A,
    cpu_branch: impl FnOnce(A) -> Result<T>,
    gpu_branch: impl FnOnce(A) -> Result<T>,
) -> Result<T> {
    match policy.queue().device().kind() {
        DeviceKind::Host | DeviceKind::Cpu => cpu_branch(args),
        DeviceKind::Gpu => gpu_branch(args),
        other => Err(DispatchError::UnsupportedDevice(other)),
    }
}
