//! Classify wgpu adapters into dispatch device kinds.
//!
//! 100% safe Rust: uses wgpu's safe adapter-enumeration API only. Lets a
//! caller seed a [`DataParallelPolicy`](crate::policy::data_parallel_policy)
//! from whatever adapter wgpu found, with software rasterizers correctly
//! classified as CPU-like so they route to the CPU kernel.

use ::wgpu::{AdapterInfo, DeviceType};

use crate::device::{Device, DeviceKind, DeviceQueue};

/// Maps a wgpu device type onto the dispatch-layer taxonomy.
#[must_use]
pub fn device_kind(device_type: DeviceType) -> DeviceKind {
    match device_type {
        DeviceType::Cpu => DeviceKind::Cpu,
        DeviceType::IntegratedGpu | DeviceType::DiscreteGpu | DeviceType::VirtualGpu => {
            DeviceKind::Gpu
        }
        _ => DeviceKind::Other,
    }
}

/// Builds a dispatch-layer device from a wgpu adapter description.
#[must_use]
pub fn device_from_adapter(info: &AdapterInfo) -> Device {
    Device::named(device_kind(info.device_type), info.name.clone())
}

/// Builds a queue bound to the device described by a wgpu adapter.
#[must_use]
pub fn queue_from_adapter(info: &AdapterInfo) -> DeviceQueue {
    DeviceQueue::new(device_from_adapter(info))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_variants_classify_as_gpu() {
        for ty in [DeviceType::IntegratedGpu, DeviceType::DiscreteGpu, DeviceType::VirtualGpu] {
            assert_eq!(device_kind(ty), DeviceKind::Gpu);
        }
    }

    #[test]
    fn test_software_rasterizer_classifies_as_cpu() {
        assert_eq!(device_kind(DeviceType::Cpu), DeviceKind::Cpu);
    }

    #[test]
    fn test_unknown_adapter_is_not_routable() {
        assert_eq!(device_kind(DeviceType::Other), DeviceKind::Other);
    }
}
