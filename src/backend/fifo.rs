//! Serial halves over a driver-managed byte FIFO.
//!
//! A hardware UART driver exposes queues, not the four byte-level
//! operations of the backend contract. These adapters bridge the two:
//!
//! | Queue op        | Backend contract                    |
//! |-----------------|-------------------------------------|
//! | `pop`           | `byte_available` / `read_byte`      |
//! | `free`          | `write_capacity` (`free() > 0`)     |
//! | `push`          | `write_byte`                        |
//!
//! TX never holds a byte back: capacity is the queue's own free space, so
//! a byte accepted by `write_byte` is already in the queue the line drains.

use super::{SerialRx, SerialTx};

/// Receive queue filled by the line.
pub trait RxQueue {
    /// Take the oldest received byte, if any. Never blocks.
    fn pop(&mut self) -> Option<u8>;
}

/// Transmit queue drained by the line.
pub trait TxQueue {
    /// Bytes the queue can take right now.
    fn free(&mut self) -> usize;
    /// Append one byte. Returns `false` if the queue was full.
    fn push(&mut self, byte: u8) -> bool;
}

/// RX half over an [`RxQueue`].
///
/// Keeps a one-byte slot so `byte_available` can answer without a
/// separate "how many bytes" query.
pub struct FifoRx<Q> {
    queue: Q,
    pending: Option<u8>,
}

impl<Q: RxQueue> FifoRx<Q> {
    pub fn new(queue: Q) -> Self {
        Self { queue, pending: None }
    }
}

impl<Q: RxQueue> SerialRx for FifoRx<Q> {
    #[inline]
    fn byte_available(&mut self) -> bool {
        if self.pending.is_none() {
            self.pending = self.queue.pop();
        }
        self.pending.is_some()
    }

    #[inline]
    fn read_byte(&mut self) -> u8 {
        match self.pending.take() {
            Some(byte) => byte,
            None => self.queue.pop().unwrap_or(0),
        }
    }
}

/// TX half over a [`TxQueue`].
pub struct FifoTx<Q> {
    queue: Q,
}

impl<Q: TxQueue> FifoTx<Q> {
    pub fn new(queue: Q) -> Self {
        Self { queue }
    }
}

impl<Q: TxQueue> SerialTx for FifoTx<Q> {
    #[inline]
    fn write_capacity(&mut self) -> bool {
        self.queue.free() > 0
    }

    /// Only called after `write_capacity()`; the push then succeeds at
    /// once. A refused push is retried until the line makes room.
    #[inline]
    fn write_byte(&mut self, byte: u8) {
        while !self.queue.push(byte) {
            core::hint::spin_loop();
        }
    }
}
