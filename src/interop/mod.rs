//! Ecosystem integrations.
//!
//! Adapters that turn third-party runtime handles into dispatch-layer
//! device descriptors. Each integration is feature-gated so the core stays
//! dependency-free.

/// WGPU adapter classification.
#[cfg(feature = "gpu-wgpu")]
#[cfg_attr(docsrs, doc(cfg(feature = "gpu-wgpu")))]
pub mod wgpu;
