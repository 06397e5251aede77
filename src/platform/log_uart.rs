//! Log output on a TX-only UART2.
//!
//! Requires an external USB-UART adapter (CH340, CP2102, ...) on
//! `log_tx_pin`. The bridged UART is never used for logs.
//!
//! Lines are copied into the driver's TX ring only when the whole line
//! fits; otherwise the line is refused and the drain counts it. Context A
//! never waits on the log port.

use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin};
use esp_idf_svc::hal::uart::{self, UartTxDriver, UART2};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::sys::{uart_get_tx_buffer_free_size, uart_port_t, EspError, ESP_OK};

use crate::log_drain::LogSink;

const LOG_PORT: uart_port_t = 2;

/// TX ring of the log port.
const TX_RING_BYTES: usize = 2048;

/// Non-blocking writer for formatted log lines.
pub struct UartLogSink(UartTxDriver<'static>);

/// Initialize UART2 TX-only on `tx_pin`.
pub fn init_log_uart(uart: UART2, tx_pin: u8, baud_rate: u32) -> Result<UartLogSink, EspError> {
    let uart_config = uart::config::Config::default()
        .baudrate(Hertz(baud_rate))
        .tx_fifo_size(TX_RING_BYTES);

    // SAFETY: validated at build time, not shared with any other function
    let tx = unsafe { AnyOutputPin::new(tx_pin as _) };

    let driver = UartTxDriver::new(
        uart,
        tx,
        Option::<AnyIOPin>::None, // CTS
        Option::<AnyIOPin>::None, // RTS
        &uart_config,
    )?;

    Ok(UartLogSink(driver))
}

impl UartLogSink {
    fn free(&self) -> usize {
        let mut size = 0usize;
        // SAFETY: the UART2 driver is installed for as long as self lives
        let err = unsafe { uart_get_tx_buffer_free_size(LOG_PORT, &mut size) };
        if err == ESP_OK as _ {
            size
        } else {
            0
        }
    }
}

impl LogSink for UartLogSink {
    fn write_line(&mut self, line: &[u8]) -> bool {
        if self.free() < line.len() {
            return false;
        }
        // Fits in the ring: returns without waiting for the line
        matches!(self.0.write(line), Ok(n) if n == line.len())
    }
}
