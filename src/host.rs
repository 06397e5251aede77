//! Host-facing (USB CDC-ACM) port contract.
//!
//! The USB stack is an external collaborator. Like the serial backend, its
//! capabilities are split by owner:
//!
//! - [`HostService`] + [`HostTx`]: Context A (stack bookkeeping, device→host)
//! - [`HostRx`]: Context B (host→device)
//!
//! Control-line changes arrive through the stack's own callback while
//! `service()` runs; see [`crate::flow`].

/// Stack bookkeeping. Must run often: write capacity and control-line
/// updates are only observed here.
pub trait HostService {
    fn service(&mut self);
}

/// Host → device direction.
pub trait HostRx {
    /// The host has sent bytes not yet read.
    fn available(&mut self) -> bool;

    /// Read up to `buf.len()` bytes; returns how many were read.
    fn read(&mut self, buf: &mut [u8]) -> usize;
}

/// Device → host direction.
pub trait HostTx {
    /// The stack accepts more bytes right now.
    fn write_available(&mut self) -> bool;

    /// Queue bytes for the host.
    fn write(&mut self, data: &[u8]);

    /// Push queued bytes out now instead of waiting for a full packet.
    fn flush(&mut self);
}
