//! Software-clocked serial backend.
//!
//! The bit timing engine is an external collaborator. It only has to expose
//! four byte-level operations, split by direction like the backend itself:
//!
//! | Engine        | Backend contract    |
//! |---------------|---------------------|
//! | `rx_ready`    | `byte_available`    |
//! | `rx_byte`     | `read_byte`         |
//! | `tx_full`     | `!write_capacity`   |
//! | `tx_byte`     | `write_byte`        |

use super::{BackendKind, SerialBackend, SerialRx, SerialTx};

/// Receive side of a bit-timed serial engine.
pub trait BitRx {
    /// A complete byte has been clocked in.
    fn rx_ready(&mut self) -> bool;
    /// Take the clocked-in byte.
    fn rx_byte(&mut self) -> u8;
}

/// Transmit side of a bit-timed serial engine.
pub trait BitTx {
    /// The engine cannot accept another byte yet.
    fn tx_full(&mut self) -> bool;
    /// Hand one byte to the engine for clocking out.
    fn tx_byte(&mut self, byte: u8);
}

/// Backend built on a software serial engine.
pub struct SoftSerial<R, T> {
    rx: R,
    tx: T,
    baud_rate: u32,
}

impl<R: BitRx, T: BitTx> SoftSerial<R, T> {
    /// `baud_rate` is the already clamped rate the engine was set up with.
    pub fn new(rx: R, tx: T, baud_rate: u32) -> Self {
        Self { rx, tx, baud_rate }
    }
}

impl<R: BitRx, T: BitTx> SerialBackend for SoftSerial<R, T> {
    type Rx = SoftRx<R>;
    type Tx = SoftTx<T>;

    fn kind(&self) -> BackendKind {
        BackendKind::Software
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn split(self) -> (SoftRx<R>, SoftTx<T>) {
        (SoftRx(self.rx), SoftTx(self.tx))
    }
}

/// RX half of [`SoftSerial`].
pub struct SoftRx<R>(R);

impl<R: BitRx> SerialRx for SoftRx<R> {
    #[inline]
    fn byte_available(&mut self) -> bool {
        self.0.rx_ready()
    }

    #[inline]
    fn read_byte(&mut self) -> u8 {
        self.0.rx_byte()
    }
}

/// TX half of [`SoftSerial`].
pub struct SoftTx<T>(T);

impl<T: BitTx> SerialTx for SoftTx<T> {
    #[inline]
    fn write_capacity(&mut self) -> bool {
        !self.0.tx_full()
    }

    #[inline]
    fn write_byte(&mut self, byte: u8) {
        self.0.tx_byte(byte)
    }
}

/// 8N1 frame of `byte`, LSB first: bit 0 is the start bit, bit 9 the stop bit.
pub const fn frame_8n1(byte: u8) -> u16 {
    (1u16 << 9) | ((byte as u16) << 1)
}

/// Clock in one 8N1 frame whose start edge has just been seen.
///
/// `wait(n)` delays `n` half-bit periods; `line()` samples the RX level.
/// Data bits are sampled mid-bit. Returns `None` on a framing error (stop
/// bit low).
pub fn sample_8n1(mut line: impl FnMut() -> bool, mut wait: impl FnMut(u32)) -> Option<u8> {
    // Middle of data bit 0
    wait(3);

    let mut byte = 0u8;
    for bit in 0..8 {
        if line() {
            byte |= 1 << bit;
        }
        wait(2);
    }

    // Middle of the stop bit
    if line() {
        Some(byte)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct FakeRx(VecDeque<u8>);

    impl BitRx for FakeRx {
        fn rx_ready(&mut self) -> bool {
            !self.0.is_empty()
        }
        fn rx_byte(&mut self) -> u8 {
            self.0.pop_front().unwrap_or(0)
        }
    }

    struct FakeTx {
        full: bool,
        sent: Vec<u8>,
    }

    impl BitTx for FakeTx {
        fn tx_full(&mut self) -> bool {
            self.full
        }
        fn tx_byte(&mut self, byte: u8) {
            self.sent.push(byte);
        }
    }

    #[test]
    fn test_soft_serial_maps_engine_operations() {
        let rx = FakeRx(VecDeque::from(vec![0x55]));
        let tx = FakeTx { full: true, sent: Vec::new() };
        let backend = SoftSerial::new(rx, tx, 9600);

        assert_eq!(backend.kind(), BackendKind::Software);
        assert_eq!(backend.baud_rate(), 9600);

        let (mut rx, mut tx) = backend.split();
        assert!(rx.byte_available());
        assert_eq!(rx.read_byte(), 0x55);
        assert!(!rx.byte_available());

        // Full engine queue means no write capacity
        assert!(!tx.write_capacity());
        tx.0.full = false;
        assert!(tx.write_capacity());
        tx.write_byte(0xAA);
        assert_eq!(tx.0.sent, vec![0xAA]);
    }

    /// Line replaying `frames` back to back, in half-bit steps.
    struct Wire {
        halves: Vec<bool>,
        at: usize,
    }

    impl Wire {
        fn new(frames: &[u16]) -> Self {
            let mut halves = Vec::new();
            for frame in frames {
                for bit in 0..10 {
                    let level = frame & (1 << bit) != 0;
                    halves.extend([level, level]);
                }
            }
            Self { halves, at: 0 }
        }

        fn level(&self) -> bool {
            self.halves.get(self.at).copied().unwrap_or(true)
        }
    }

    #[test]
    fn test_sample_decodes_frames() {
        for byte in [0x00, 0x55, 0xA5, 0xFF, b'J'] {
            let wire = std::cell::RefCell::new(Wire::new(&[frame_8n1(byte)]));
            let decoded = sample_8n1(|| wire.borrow().level(), |n| wire.borrow_mut().at += n as usize);
            assert_eq!(decoded, Some(byte));
        }
    }

    #[test]
    fn test_sample_rejects_low_stop_bit() {
        let broken = frame_8n1(0x3C) & !(1 << 9);
        let wire = std::cell::RefCell::new(Wire::new(&[broken]));
        let decoded = sample_8n1(|| wire.borrow().level(), |n| wire.borrow_mut().at += n as usize);
        assert_eq!(decoded, None);
    }
}
