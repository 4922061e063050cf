//! Communicator handles for multi-node (SPMD) execution.
//!
//! A [`Communicator`] identifies this process within a distributed group.
//! The collective operations themselves (allreduce, broadcast, ...) live in
//! the kernels that consume the handle; this module only carries identity.

use std::sync::OnceLock;

/// Identity of one process within a distributed execution group.
///
/// The default communicator is the *empty group*: rank 0 of a group of size
/// 0. Single-node contexts hand the empty group to kernels that ask for a
/// communicator, so kernel code can treat single-node and multi-node
/// uniformly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Communicator {
    rank: u32,
    size: u32,
}

impl Communicator {
    /// Creates a communicator for `rank` within a group of `size` processes.
    #[must_use]
    pub fn new(rank: u32, size: u32) -> Self {
        Self { rank, size }
    }

    /// This process's rank within the group.
    #[must_use]
    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// Number of processes in the group.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Returns `true` for the empty (single-node) group.
    #[must_use]
    pub fn is_empty_group(&self) -> bool {
        self.size == 0
    }
}

/// Lazily materializes at most one communicator per context.
///
/// A provider seeded from a distributed policy returns that policy's
/// communicator. A provider constructed empty default-constructs the empty
/// group on first access and caches it for the provider's lifetime.
#[derive(Debug, Default)]
pub(crate) struct CommunicatorProvider {
    comm: OnceLock<Communicator>,
}

impl CommunicatorProvider {
    /// Provider that materializes the empty group on first access.
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    /// Provider seeded with a policy's communicator.
    pub(crate) fn seeded(comm: Communicator) -> Self {
        let cell = OnceLock::new();
        // A fresh cell cannot already hold a value.
        let _ = cell.set(comm);
        Self { comm: cell }
    }

    /// The communicator for this context, created on first access.
    pub(crate) fn get(&self) -> &Communicator {
        self.comm.get_or_init(Communicator::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty_group() {
        let comm = Communicator::default();
        assert_eq!(comm.rank(), 0);
        assert_eq!(comm.size(), 0);
        assert!(comm.is_empty_group());
    }

    #[test]
    fn test_seeded_provider_returns_original() {
        let provider = CommunicatorProvider::seeded(Communicator::new(3, 8));
        assert_eq!(provider.get().rank(), 3);
        assert_eq!(provider.get().size(), 8);
    }

    #[test]
    fn test_empty_provider_materializes_once() {
        let provider = CommunicatorProvider::empty();
        let first = provider.get() as *const Communicator;
        let second = provider.get() as *const Communicator;
        assert_eq!(first, second);
        assert!(provider.get().is_empty_group());
    }
}
