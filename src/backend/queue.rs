//! Lock-free single-producer single-consumer byte queue.
//!
//! Carries received bytes from an interrupt handler to the context that
//! owns the RX half. Same index scheme as [`crate::logging::LogStream`].

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

use super::fifo::RxQueue;

pub struct ByteQueue<const N: usize> {
    bytes: UnsafeCell<[u8; N]>,
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    overruns: AtomicU32,
}

// SAFETY: one producer and one consumer. A slot is written only while it
// lies outside [read, write) and read only while inside; the Release store
// of the owning index publishes the hand-over.
unsafe impl<const N: usize> Sync for ByteQueue<N> {}
unsafe impl<const N: usize> Send for ByteQueue<N> {}

impl<const N: usize> ByteQueue<N> {
    const MASK: usize = N - 1;

    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "queue size must be power of 2");

        Self {
            bytes: UnsafeCell::new([0; N]),
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            overruns: AtomicU32::new(0),
        }
    }

    /// Producer side. Returns `false` and counts an overrun when full.
    #[inline]
    pub fn push(&self, byte: u8) -> bool {
        let write = self.write_idx.load(Ordering::Relaxed);
        let read = self.read_idx.load(Ordering::Acquire);

        if write.wrapping_sub(read) >= N as u32 {
            self.overruns.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // SAFETY: slot is outside [read, write); only this producer writes it
        unsafe { (*self.bytes.get())[(write as usize) & Self::MASK] = byte };

        self.write_idx.store(write.wrapping_add(1), Ordering::Release);
        true
    }

    /// Consumer side.
    #[inline]
    pub fn pop(&self) -> Option<u8> {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);

        if read == write {
            return None;
        }

        // SAFETY: slot is inside [read, write); the producer leaves it alone
        let byte = unsafe { (*self.bytes.get())[(read as usize) & Self::MASK] };

        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(byte)
    }

    pub fn is_empty(&self) -> bool {
        self.read_idx.load(Ordering::Relaxed) == self.write_idx.load(Ordering::Acquire)
    }

    /// Bytes lost because the consumer fell behind, since boot (wrapping).
    pub fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Default for ByteQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RxQueue for &ByteQueue<N> {
    #[inline]
    fn pop(&mut self) -> Option<u8> {
        ByteQueue::pop(self)
    }
}
