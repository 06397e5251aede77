//! Byte relays, one per direction.
//!
//! # Contract
//!
//! ```text
//!              InboundRelay (Context A)
//! SerialRx ──▶ [chunk; N] ──▶ HostTx      drops the chunk if the host is full
//!
//!              OutboundRelay (Context B)
//! HostRx ────▶ [chunk; N] ──▶ SerialTx    spins per byte until the line accepts
//! ```
//!
//! Each relay owns its chunk. A relay is moved by value into the context
//! that runs it, so neither chunk is ever reachable from the other core.
//!
//! The asymmetry is deliberate and must be kept: inbound data is dropped
//! when the host cannot take it, outbound data is never dropped.

use crate::backend::{SerialRx, SerialTx};
use crate::host::{HostRx, HostTx};
use crate::spin::{spin_until_reporting, SpinLimit};

/// What one [`InboundRelay::relay`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// No serial input; nothing touched.
    Idle,
    /// Bytes written to the host and flushed.
    Forwarded(usize),
    /// Bytes read from the serial line and discarded (host had no room).
    Dropped(usize),
}

/// Serial → host relay.
pub struct InboundRelay<const N: usize> {
    chunk: [u8; N],
    forwarded: u32,
    dropped: u32,
}

impl<const N: usize> InboundRelay<N> {
    pub const fn new() -> Self {
        assert!(N > 0, "chunk capacity must be non-zero");

        Self {
            chunk: [0; N],
            forwarded: 0,
            dropped: 0,
        }
    }

    /// Move at most one chunk from the serial line to the host. Never blocks.
    ///
    /// Input beyond `N` bytes stays queued in the backend for the next call.
    pub fn relay<R, H>(&mut self, serial: &mut R, host: &mut H) -> InboundOutcome
    where
        R: SerialRx,
        H: HostTx,
    {
        if !serial.byte_available() {
            return InboundOutcome::Idle;
        }

        let mut len = 0;
        while len < N && serial.byte_available() {
            self.chunk[len] = serial.read_byte();
            len += 1;
        }

        if host.write_available() {
            host.write(&self.chunk[..len]);
            host.flush();
            self.forwarded = self.forwarded.wrapping_add(len as u32);
            InboundOutcome::Forwarded(len)
        } else {
            self.dropped = self.dropped.wrapping_add(len as u32);
            InboundOutcome::Dropped(len)
        }
    }

    /// Bytes delivered to the host since boot (wrapping).
    pub fn forwarded_bytes(&self) -> u32 {
        self.forwarded
    }

    /// Bytes discarded for lack of host capacity since boot (wrapping).
    pub fn dropped_bytes(&self) -> u32 {
        self.dropped
    }
}

impl<const N: usize> Default for InboundRelay<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// What one [`OutboundRelay::relay`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundOutcome {
    /// Host had nothing; nothing touched.
    Idle,
    /// Bytes read from the host and written to the serial line.
    Sent(usize),
}

/// Host → serial relay.
pub struct OutboundRelay<const N: usize> {
    chunk: [u8; N],
    limit: SpinLimit,
    sent: u32,
    stalls: u32,
}

impl<const N: usize> OutboundRelay<N> {
    /// `limit` decides when a blocked write is reported; it never abandons
    /// a byte.
    pub const fn new(limit: SpinLimit) -> Self {
        assert!(N > 0, "chunk capacity must be non-zero");

        Self {
            chunk: [0; N],
            limit,
            sent: 0,
            stalls: 0,
        }
    }

    /// Pull one chunk from the host and write all of it to the serial line.
    ///
    /// Returns immediately when the host has nothing. Otherwise blocks until
    /// every byte read has been handed to the backend, in order.
    pub fn relay<H, T>(&mut self, host: &mut H, serial: &mut T) -> OutboundOutcome
    where
        H: HostRx,
        T: SerialTx,
    {
        self.relay_reporting(host, serial, |_| {})
    }

    /// Like [`relay`](Self::relay); `on_stall` runs with the blocked byte's
    /// index in the chunk each time a write waits past the spin limit.
    pub fn relay_reporting<H, T, F>(&mut self, host: &mut H, serial: &mut T, mut on_stall: F) -> OutboundOutcome
    where
        H: HostRx,
        T: SerialTx,
        F: FnMut(usize),
    {
        if !host.available() {
            return OutboundOutcome::Idle;
        }

        let count = host.read(&mut self.chunk).min(N);

        for (i, &byte) in self.chunk[..count].iter().enumerate() {
            let stalled = spin_until_reporting(|| serial.write_capacity(), self.limit, || on_stall(i));
            if stalled {
                self.stalls = self.stalls.wrapping_add(1);
            }
            serial.write_byte(byte);
        }

        self.sent = self.sent.wrapping_add(count as u32);
        OutboundOutcome::Sent(count)
    }

    /// Bytes handed to the serial backend since boot (wrapping).
    pub fn sent_bytes(&self) -> u32 {
        self.sent
    }

    /// Writes that waited past the spin limit since boot (wrapping).
    pub fn stalls(&self) -> u32 {
        self.stalls
    }
}
