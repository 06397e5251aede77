//! Hardware UART backend (UART0 or UART1 on its IO_MUX pins).
//!
//! Both halves use only non-blocking driver calls. TX capacity is the free
//! space of the driver's TX ring, so an accepted byte is always on its way
//! to the line.

use esp_idf_svc::hal::delay::NON_BLOCK;
use esp_idf_svc::hal::gpio::AnyIOPin;
use esp_idf_svc::hal::uart::{self, UartDriver, UartRxDriver, UartTxDriver, UART0, UART1};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::sys::{uart_get_tx_buffer_free_size, uart_port_t, EspError, ESP_OK};

use crate::backend::{BackendKind, FifoRx, FifoTx, RxQueue, SerialBackend, TxQueue, UartPort};
use crate::config::{BRIDGE, SELECTION};

/// Port picked by the build script.
const PORT: UartPort = match SELECTION.backend {
    BackendKind::Hardware(port) => port,
    BackendKind::Software => panic!("hardware backend compiled for a software selection"),
};

/// Driver ring sizes. Must exceed the 128-byte hardware FIFO.
const RX_RING_BYTES: usize = 1024;
const TX_RING_BYTES: usize = 256;

/// The bridged UART before it is split.
pub type Backend = HardwareUart;

pub struct HardwareUart {
    driver: UartDriver<'static>,
}

/// Install the UART driver on the selected port. The other port is released.
pub fn open(uart0: UART0, uart1: UART1) -> Result<HardwareUart, EspError> {
    let config = uart::config::Config::default()
        .baudrate(Hertz(SELECTION.baud_rate))
        .rx_fifo_size(RX_RING_BYTES)
        .tx_fifo_size(TX_RING_BYTES);

    // SAFETY: pins come from the IO_MUX route matched at build time
    let (tx, rx) = unsafe { (AnyIOPin::new(BRIDGE.tx_pin as _), AnyIOPin::new(BRIDGE.rx_pin as _)) };

    let driver = match PORT {
        UartPort::Uart0 => UartDriver::new(
            uart0,
            tx,
            rx,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &config,
        )?,
        UartPort::Uart1 => UartDriver::new(
            uart1,
            tx,
            rx,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &config,
        )?,
    };

    Ok(HardwareUart { driver })
}

impl SerialBackend for HardwareUart {
    type Rx = FifoRx<UartRxQueue>;
    type Tx = FifoTx<UartTxQueue>;

    fn kind(&self) -> BackendKind {
        BackendKind::Hardware(PORT)
    }

    fn baud_rate(&self) -> u32 {
        SELECTION.baud_rate
    }

    fn split(self) -> (Self::Rx, Self::Tx) {
        let (tx, rx) = self.driver.into_split();
        (FifoRx::new(UartRxQueue(rx)), FifoTx::new(UartTxQueue(tx)))
    }
}

/// Driver RX ring, owned by Context A.
pub struct UartRxQueue(UartRxDriver<'static>);

impl RxQueue for UartRxQueue {
    #[inline]
    fn pop(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.0.read(&mut byte, NON_BLOCK) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }
}

/// Driver TX ring, owned by Context B.
pub struct UartTxQueue(UartTxDriver<'static>);

impl TxQueue for UartTxQueue {
    #[inline]
    fn free(&mut self) -> usize {
        let mut size = 0usize;
        // SAFETY: the driver for PORT is installed for as long as self lives
        let err = unsafe { uart_get_tx_buffer_free_size(PORT.index() as uart_port_t, &mut size) };
        if err == ESP_OK as _ {
            size
        } else {
            0
        }
    }

    #[inline]
    fn push(&mut self, byte: u8) -> bool {
        // Copies into the TX ring; returns at once when the ring has room
        matches!(self.0.write(&[byte]), Ok(1))
    }
}
