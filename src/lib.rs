//! # Trueno-Dispatch
//!
//! Heterogeneous kernel dispatch: selects and invokes the concrete
//! implementation of an algorithm step that matches the caller's execution
//! policy (single-node CPU, single-node GPU, or multi-node SPMD CPU/GPU)
//! and, within CPU execution, the best SIMD instruction-set variant detected
//! at runtime.
//!
//! The selection problem has three axes:
//!
//! - **Device kind**: host/CPU-like devices versus GPUs, classified by the
//!   [device router](device::dispatch_by_device).
//! - **Distribution mode**: local versus SPMD, expressed by the four
//!   [policy](policy) types and resolved at compile time through
//!   [`Dispatch`](dispatcher::Dispatch) impls.
//! - **Instruction-set level**: the runtime [capability ladder](cpu) picks
//!   the highest compiled-in tier the hardware and policy allow.
//!
//! Unsupported combinations fail with a typed [`DispatchError`] instead of
//! silently computing on the wrong hardware; combinations an algorithm never
//! declared do not compile at all.
//!
//! ## Quick Start
//!
//! ```rust
//! use trueno_dispatch::prelude::*;
//!
//! struct Train;
//!
//! impl CpuKernel<Vec<f64>> for Train {
//!     type Output = f64;
//!
//!     fn execute(&self, _ctx: &CpuContext, args: Vec<f64>) -> f64 {
//!         args.iter().sum()
//!     }
//! }
//!
//! let dispatcher = KernelDispatcher::cpu_only(Train);
//! let result = dispatcher.dispatch(&host_policy(), vec![1.0, 2.0])?;
//! assert_eq!(result, 3.0);
//! # Ok::<(), trueno_dispatch::DispatchError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cpu-ssse3`, `cpu-sse42`, `cpu-avx`, `cpu-avx2`, `cpu-avx512`: which
//!   instruction-set tiers the build compiles kernel variants for (all on by
//!   default; baseline is always built)
//! - `serde`: serde derives for capability and device descriptors
//! - `gpu-wgpu`: classify wgpu adapters into dispatch device kinds

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only - banned in production code
#![cfg_attr(test, allow(clippy::unwrap_used))]

// ============================================================================
// Core Modules
// ============================================================================

/// Communicator handles for multi-node execution.
pub mod communicator;

/// CPU instruction-set ladder and capability tags.
pub mod cpu;

/// Device model and the device router.
pub mod device;

/// Execution policies describing intended placement.
pub mod policy;

// ============================================================================
// Dispatch Modules
// ============================================================================

/// Per-invocation execution contexts.
pub mod context;

/// Policy-indexed kernel selection.
pub mod dispatcher;

// ============================================================================
// Optional Integration Modules
// ============================================================================

/// Ecosystem integrations (wgpu adapter classification).
pub mod interop;

// ============================================================================
// Error Types
// ============================================================================

/// Error types for dispatch operations.
pub mod error;

pub use error::{DispatchError, Result};

// ============================================================================
// Prelude
// ============================================================================

/// Commonly used types and traits for convenient imports.
///
/// ```rust
/// use trueno_dispatch::prelude::*;
/// ```
pub mod prelude {
    pub use crate::communicator::Communicator;
    pub use crate::context::{CpuContext, GpuContext};
    pub use crate::cpu::{
        detect_top_cpu_extension, dispatch_by_cpu, selected_cpu_tier, CpuExtension, CpuOperation,
    };
    pub use crate::device::{dispatch_by_device, Device, DeviceKind, DeviceQueue};
    pub use crate::dispatcher::{
        dispatch, CpuKernel, Dispatch, GpuKernel, KernelDispatcher, KernelSpec, SingleNodeCpu,
        SingleNodeGpu, UniversalSpmdGpu,
    };
    pub use crate::error::{DispatchError, Result};
    pub use crate::policy::{
        data_parallel_policy, host_policy, spmd_data_parallel_policy, spmd_host_policy,
        DataParallelPolicy, HostPolicy, SpmdDataParallelPolicy, SpmdHostPolicy,
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn test_prelude_covers_call_surface() {
        // Smoke test: the documented surface is reachable from the prelude.
        let _ = host_policy();
        let _ = detect_top_cpu_extension();
        let _ = Communicator::default();
    }
}
