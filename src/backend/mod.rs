//! Serial backend contract.
//!
//! The relays see the serial line only through two capability traits:
//!
//! ```text
//!                    ┌──────────────┐
//!  Context A ◀────── │  SerialRx    │ ◀── RX pin
//!                    │              │
//!  Context B ──────▶ │  SerialTx    │ ──▶ TX pin
//!                    └──────────────┘
//!              hardware UART or bit-banged engine
//! ```
//!
//! A backend is built once at startup and immediately split; each half is
//! moved into the context that owns its direction. RX and TX queues are
//! separate hardware resources, so the halves never contend.
//!
//! Every operation is infallible at this boundary: a missing byte is
//! `byte_available() == false`, a full queue is `write_capacity() == false`.

pub mod fifo;
pub mod queue;
pub mod select;
pub mod soft;

pub use fifo::{FifoRx, FifoTx, RxQueue, TxQueue};
pub use queue::ByteQueue;
pub use select::{BackendKind, Selection, UartPort};
pub use soft::{frame_8n1, sample_8n1, BitRx, BitTx, SoftRx, SoftSerial, SoftTx};

/// Receive half of a serial backend.
pub trait SerialRx {
    /// At least one received byte is waiting. Never blocks.
    fn byte_available(&mut self) -> bool;

    /// Take the next received byte.
    ///
    /// Only meaningful after `byte_available()` returned `true`.
    fn read_byte(&mut self) -> u8;
}

/// Transmit half of a serial backend.
pub trait SerialTx {
    /// The output queue accepts at least one byte. Never blocks.
    fn write_capacity(&mut self) -> bool;

    /// Queue one byte for transmission.
    ///
    /// Callers check `write_capacity()` first.
    fn write_byte(&mut self, byte: u8);
}

/// A configured serial transport, before it is split between contexts.
pub trait SerialBackend {
    type Rx: SerialRx;
    type Tx: SerialTx;

    /// Which implementation this is.
    fn kind(&self) -> BackendKind;

    /// Effective line rate.
    fn baud_rate(&self) -> u32;

    /// Hand out the two directions for independent ownership.
    fn split(self) -> (Self::Rx, Self::Tx);
}
