//! Error types for dispatch operations.
//!
//! Every failure is reported synchronously at the dispatch call site as a
//! typed error, never as a sentinel value. Callers should treat these as
//! fatal to the requested call and retry with a different, supported policy.

use thiserror::Error;

use crate::device::DeviceKind;

/// Result type alias using [`DispatchError`].
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Errors that can occur while selecting and invoking a kernel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The policy requested a distributed execution mode the algorithm never
    /// declared a kernel for.
    #[error("SPMD version of the algorithm is not implemented")]
    SpmdNotImplemented,

    /// The policy resolved to a device kind that has no matching declared
    /// kernel.
    #[error("algorithm is not implemented for this device")]
    NotImplementedForDevice,

    /// The distributed policy resolved to a device kind the declared SPMD
    /// kernel cannot run on.
    #[error("SPMD version of the algorithm is not implemented for this device")]
    SpmdNotImplementedForDevice,

    /// The device reports a kind the router does not recognize.
    #[error("unsupported device kind: {0}")]
    UnsupportedDevice(DeviceKind),
}
