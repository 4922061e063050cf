//! Policy-indexed kernel selection.
//!
//! An algorithm declares the placements it implements as a *kernel spec
//! set*: an ordered list of ([placement marker](SingleNodeCpu),
//! kernel type) pairs. [`KernelDispatcher`] is specialized per declared set
//! through the [`Dispatch`] trait, one impl per (spec set, policy type)
//! combination the algorithm supports. A combination with no impl does not
//! compile; there is no runtime fallback between placement categories, only
//! within the CPU instruction-set ladder.
//!
//! Kernel arguments pass through the dispatcher unchanged and are otherwise
//! opaque to this layer.

use std::marker::PhantomData;

use crate::context::{CpuContext, GpuContext};
use crate::device::dispatch_by_device;
use crate::error::{DispatchError, Result};
use crate::policy::{DataParallelPolicy, HostPolicy, SpmdDataParallelPolicy, SpmdHostPolicy};

/// A CPU kernel: one algorithm step implemented for host execution.
///
/// Implementations typically run the instruction-set ladder internally via
/// [`dispatch_by_cpu`](crate::cpu::dispatch_by_cpu).
pub trait CpuKernel<Args> {
    /// Result type of the kernel.
    type Output;

    /// Executes the kernel on the calling thread.
    fn execute(&self, ctx: &CpuContext, args: Args) -> Self::Output;
}

/// A GPU kernel: one algorithm step implemented for device execution.
///
/// Universal SPMD kernels additionally consult
/// [`GpuContext::communicator`] for their internal collective behavior.
pub trait GpuKernel<Args> {
    /// Result type of the kernel.
    type Output;

    /// Executes the kernel against the context's queue.
    fn execute(&self, ctx: &GpuContext, args: Args) -> Self::Output;
}

/// Placement marker: CPU kernel for single-node execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleNodeCpu;

/// Placement marker: GPU kernel for single-node execution only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleNodeGpu;

/// Placement marker: universal GPU kernel supporting both single-node and
/// SPMD operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniversalSpmdGpu;

/// Pairs a placement marker with the concrete kernel implementing it.
#[derive(Debug, Clone, Copy)]
pub struct KernelSpec<Placement, K> {
    kernel: K,
    _placement: PhantomData<Placement>,
}

impl<Placement, K> KernelSpec<Placement, K> {
    /// Declares `kernel` for the `Placement` category.
    #[must_use]
    pub fn new(kernel: K) -> Self {
        Self { kernel, _placement: PhantomData }
    }

    fn kernel(&self) -> &K {
        &self.kernel
    }
}

/// Selects and invokes the kernel matching a policy, per declared spec set.
///
/// Construct with [`cpu_only`](Self::cpu_only),
/// [`cpu_gpu`](KernelDispatcher::cpu_gpu), or
/// [`cpu_spmd_gpu`](KernelDispatcher::cpu_spmd_gpu), then call
/// [`Dispatch::dispatch`] with a policy and the kernel arguments.
#[derive(Debug, Clone, Copy)]
pub struct KernelDispatcher<Specs> {
    specs: Specs,
}

/// Dispatches kernel arguments under one policy type.
///
/// Implemented per (kernel spec set, policy type) pair. Every failure is a
/// typed [`DispatchError`]; success carries the kernel's result unchanged.
pub trait Dispatch<Policy, Args> {
    /// Result type, shared by all placement branches of one spec set.
    type Output;

    /// Builds a context from `policy`, selects the matching kernel, and
    /// invokes it with `args`.
    fn dispatch(&self, policy: &Policy, args: Args) -> Result<Self::Output>;
}

/// Selects and invokes the kernel for `policy` via `dispatcher`.
///
/// Free-function form of [`Dispatch::dispatch`].
pub fn dispatch<D, Policy, Args>(
    dispatcher: &D,
    policy: &Policy,
    args: Args,
) -> Result<D::Output>
where
    D: Dispatch<Policy, Args>,
{
    dispatcher.dispatch(policy, args)
}

// ============================================================================
// Spec set: CPU only, single node
// ============================================================================

impl<C> KernelDispatcher<KernelSpec<SingleNodeCpu, C>> {
    /// Declares a single-node CPU kernel and nothing else.
    #[must_use]
    pub fn cpu_only(cpu: C) -> Self {
        Self { specs: KernelSpec::new(cpu) }
    }
}

impl<C, Args> Dispatch<HostPolicy, Args> for KernelDispatcher<KernelSpec<SingleNodeCpu, C>>
where
    C: CpuKernel<Args>,
{
    type Output = C::Output;

    fn dispatch(&self, policy: &HostPolicy, args: Args) -> Result<C::Output> {
        Ok(self.specs.kernel().execute(&CpuContext::new(policy), args))
    }
}

impl<C, Args> Dispatch<SpmdHostPolicy, Args> for KernelDispatcher<KernelSpec<SingleNodeCpu, C>>
where
    C: CpuKernel<Args>,
{
    type Output = C::Output;

    fn dispatch(&self, _policy: &SpmdHostPolicy, _args: Args) -> Result<C::Output> {
        Err(DispatchError::SpmdNotImplemented)
    }
}

impl<C, Args> Dispatch<DataParallelPolicy, Args> for KernelDispatcher<KernelSpec<SingleNodeCpu, C>>
where
    C: CpuKernel<Args>,
{
    type Output = C::Output;

    fn dispatch(&self, policy: &DataParallelPolicy, args: Args) -> Result<C::Output> {
        dispatch_by_device(
            policy,
            args,
            |args| Ok(self.specs.kernel().execute(&CpuContext::default(), args)),
            |_args| Err(DispatchError::NotImplementedForDevice),
        )
    }
}

impl<C, Args> Dispatch<SpmdDataParallelPolicy, Args>
    for KernelDispatcher<KernelSpec<SingleNodeCpu, C>>
where
    C: CpuKernel<Args>,
{
    type Output = C::Output;

    fn dispatch(&self, _policy: &SpmdDataParallelPolicy, _args: Args) -> Result<C::Output> {
        Err(DispatchError::SpmdNotImplemented)
    }
}

// ============================================================================
// Spec set: CPU + single-node GPU
// ============================================================================

type CpuGpuSpecs<C, G> = (KernelSpec<SingleNodeCpu, C>, KernelSpec<SingleNodeGpu, G>);

impl<C, G> KernelDispatcher<CpuGpuSpecs<C, G>> {
    /// Declares a single-node CPU kernel and a single-node GPU kernel.
    #[must_use]
    pub fn cpu_gpu(cpu: C, gpu: G) -> Self {
        Self { specs: (KernelSpec::new(cpu), KernelSpec::new(gpu)) }
    }
}

impl<C, G, Args> Dispatch<DataParallelPolicy, Args> for KernelDispatcher<CpuGpuSpecs<C, G>>
where
    C: CpuKernel<Args>,
    G: GpuKernel<Args, Output = C::Output>,
{
    type Output = C::Output;

    fn dispatch(&self, policy: &DataParallelPolicy, args: Args) -> Result<C::Output> {
        dispatch_by_device(
            policy,
            args,
            |args| Ok(self.specs.0.kernel().execute(&CpuContext::default(), args)),
            |args| Ok(self.specs.1.kernel().execute(&GpuContext::new(policy), args)),
        )
    }
}

impl<C, G, Args> Dispatch<SpmdDataParallelPolicy, Args> for KernelDispatcher<CpuGpuSpecs<C, G>>
where
    C: CpuKernel<Args>,
    G: GpuKernel<Args, Output = C::Output>,
{
    type Output = C::Output;

    fn dispatch(&self, _policy: &SpmdDataParallelPolicy, _args: Args) -> Result<C::Output> {
        // The declared GPU kernel is single-node only.
        Err(DispatchError::SpmdNotImplemented)
    }
}

// ============================================================================
// Spec set: CPU + universal SPMD GPU
// ============================================================================

type CpuSpmdGpuSpecs<C, G> = (KernelSpec<SingleNodeCpu, C>, KernelSpec<UniversalSpmdGpu, G>);

impl<C, G> KernelDispatcher<CpuSpmdGpuSpecs<C, G>> {
    /// Declares a single-node CPU kernel and a universal GPU kernel that
    /// supports both single-node and SPMD operation.
    #[must_use]
    pub fn cpu_spmd_gpu(cpu: C, gpu: G) -> Self {
        Self { specs: (KernelSpec::new(cpu), KernelSpec::new(gpu)) }
    }
}

impl<C, G, Args> Dispatch<DataParallelPolicy, Args> for KernelDispatcher<CpuSpmdGpuSpecs<C, G>>
where
    C: CpuKernel<Args>,
    G: GpuKernel<Args, Output = C::Output>,
{
    type Output = C::Output;

    fn dispatch(&self, policy: &DataParallelPolicy, args: Args) -> Result<C::Output> {
        dispatch_by_device(
            policy,
            args,
            |args| Ok(self.specs.0.kernel().execute(&CpuContext::default(), args)),
            |args| Ok(self.specs.1.kernel().execute(&GpuContext::new(policy), args)),
        )
    }
}

impl<C, G, Args> Dispatch<SpmdDataParallelPolicy, Args> for KernelDispatcher<CpuSpmdGpuSpecs<C, G>>
where
    C: CpuKernel<Args>,
    G: GpuKernel<Args, Output = C::Output>,
{
    type Output = C::Output;

    fn dispatch(&self, policy: &SpmdDataParallelPolicy, args: Args) -> Result<C::Output> {
        // The universal kernel requires a GPU device; a CPU-classified local
        // device never falls back to the CPU kernel in SPMD mode.
        dispatch_by_device(
            policy.local(),
            args,
            |_args| Err(DispatchError::SpmdNotImplementedForDevice),
            |args| Ok(self.specs.1.kernel().execute(&GpuContext::from_spmd(policy), args)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communicator::Communicator;
    use crate::device::{Device, DeviceKind, DeviceQueue};
    use crate::policy::{
        data_parallel_policy, host_policy, spmd_data_parallel_policy, spmd_host_policy,
    };

    struct SumCpu;

    impl CpuKernel<Vec<f64>> for SumCpu {
        type Output = f64;

        fn execute(&self, _ctx: &CpuContext, args: Vec<f64>) -> f64 {
            args.iter().sum()
        }
    }

    struct SumGpu;

    impl GpuKernel<Vec<f64>> for SumGpu {
        type Output = f64;

        fn execute(&self, ctx: &GpuContext, args: Vec<f64>) -> f64 {
            assert_eq!(ctx.queue().device().kind(), DeviceKind::Gpu);
            args.iter().sum::<f64>()
        }
    }

    fn gpu_queue() -> DeviceQueue {
        DeviceQueue::new(Device::new(DeviceKind::Gpu))
    }

    #[test]
    fn test_cpu_only_host_dispatch_runs_kernel() {
        let dispatcher = KernelDispatcher::cpu_only(SumCpu);
        let result = dispatcher.dispatch(&host_policy(), vec![1.0, 2.0, 3.0]);
        assert_eq!(result, Ok(6.0));
    }

    #[test]
    fn test_cpu_only_rejects_spmd_host() {
        let dispatcher = KernelDispatcher::cpu_only(SumCpu);
        let policy = spmd_host_policy(host_policy(), Communicator::new(0, 2));
        let result = dispatcher.dispatch(&policy, vec![1.0]);
        assert_eq!(result, Err(DispatchError::SpmdNotImplemented));
    }

    #[test]
    fn test_cpu_only_rejects_gpu_device() {
        let dispatcher = KernelDispatcher::cpu_only(SumCpu);
        let result = dispatcher.dispatch(&data_parallel_policy(gpu_queue()), vec![1.0]);
        assert_eq!(result, Err(DispatchError::NotImplementedForDevice));
    }

    #[test]
    fn test_cpu_only_runs_on_cpu_classified_device() {
        let dispatcher = KernelDispatcher::cpu_only(SumCpu);
        let queue = DeviceQueue::new(Device::new(DeviceKind::Cpu));
        let result = dispatcher.dispatch(&data_parallel_policy(queue), vec![2.0, 2.0]);
        assert_eq!(result, Ok(4.0));
    }

    #[test]
    fn test_cpu_gpu_routes_by_device() {
        let dispatcher = KernelDispatcher::cpu_gpu(SumCpu, SumGpu);
        let result = dispatcher.dispatch(&data_parallel_policy(gpu_queue()), vec![1.0, 2.0]);
        assert_eq!(result, Ok(3.0));
    }

    #[test]
    fn test_cpu_gpu_rejects_spmd() {
        let dispatcher = KernelDispatcher::cpu_gpu(SumCpu, SumGpu);
        let policy =
            spmd_data_parallel_policy(data_parallel_policy(gpu_queue()), Communicator::new(0, 2));
        let result = dispatcher.dispatch(&policy, vec![1.0]);
        assert_eq!(result, Err(DispatchError::SpmdNotImplemented));
    }

    #[test]
    fn test_universal_spmd_runs_on_gpu_group() {
        let dispatcher = KernelDispatcher::cpu_spmd_gpu(SumCpu, SumGpu);
        let policy =
            spmd_data_parallel_policy(data_parallel_policy(gpu_queue()), Communicator::new(1, 4));
        let result = dispatcher.dispatch(&policy, vec![1.0, 4.0]);
        assert_eq!(result, Ok(5.0));
    }

    #[test]
    fn test_universal_spmd_rejects_cpu_device_without_fallback() {
        let dispatcher = KernelDispatcher::cpu_spmd_gpu(SumCpu, SumGpu);
        let queue = DeviceQueue::new(Device::new(DeviceKind::Cpu));
        let policy =
            spmd_data_parallel_policy(data_parallel_policy(queue), Communicator::new(0, 2));
        let result = dispatcher.dispatch(&policy, vec![1.0]);
        assert_eq!(result, Err(DispatchError::SpmdNotImplementedForDevice));
    }

    #[test]
    fn test_free_function_form() {
        let dispatcher = KernelDispatcher::cpu_only(SumCpu);
        assert_eq!(dispatch(&dispatcher, &host_policy(), vec![1.5, 1.5]), Ok(3.0));
    }
}
