//! Bit-banged 8N1 serial engine on two GPIOs.
//!
//! Timing comes from the ROM microsecond delay, which is why the build
//! script caps the rate at `SOFT_BAUD_CEILING`.
//!
//! - RX: a falling-edge interrupt on the RX pin clocks the whole frame in
//!   from the handler and queues the byte. Reception does not depend on
//!   how often Context A polls; the queue absorbs bursts while it is busy
//!   servicing USB.
//! - TX: clocks a whole frame synchronously on Context B, so its queue is
//!   never full.

use core::ffi::c_void;
use core::ptr;

use esp_idf_svc::hal::delay::Ets;
use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin, Input, Output, PinDriver, Pull};
use esp_idf_svc::hal::uart::{UART0, UART1};
use esp_idf_svc::sys::{
    esp, esp_err_t, esp_rom_delay_us, gpio_get_level, gpio_install_isr_service,
    gpio_int_type_t_GPIO_INTR_NEGEDGE, gpio_intr_enable, gpio_isr_handler_add, gpio_num_t,
    gpio_set_intr_type, EspError, ESP_ERR_INVALID_STATE, ESP_OK,
};

use crate::backend::{frame_8n1, sample_8n1, BitRx, BitTx, ByteQueue, SoftSerial};
use crate::config::{BRIDGE, SELECTION};

const RX_PIN: gpio_num_t = BRIDGE.rx_pin as gpio_num_t;
const BIT_US: u32 = 1_000_000 / SELECTION.baud_rate;
const HALF_BIT_US: u32 = 500_000 / SELECTION.baud_rate;

/// Filled by the edge interrupt, drained by Context A.
static RX_QUEUE: ByteQueue<256> = ByteQueue::new();

/// The bridged line before it is split.
pub type Backend = SoftSerial<BitBangRx, BitBangTx>;

/// Claim the data pins and arm the RX start-edge interrupt.
///
/// Must run on core 0 so the handler preempts Context A, not Context B.
/// The hardware UARTs are not used and are released.
pub fn open(_uart0: UART0, _uart1: UART1) -> Result<Backend, EspError> {
    // SAFETY: pins validated at build time, not claimed by any other driver
    let (tx_pin, rx_pin) =
        unsafe { (AnyOutputPin::new(BRIDGE.tx_pin as _), AnyIOPin::new(BRIDGE.rx_pin as _)) };

    let mut tx = PinDriver::output(tx_pin)?;
    tx.set_high()?; // idle

    let mut rx = PinDriver::input(rx_pin)?;
    rx.set_pull(Pull::Up)?;

    unsafe {
        esp!(gpio_set_intr_type(RX_PIN, gpio_int_type_t_GPIO_INTR_NEGEDGE))?;

        // Another driver may already have installed the shared service
        let installed = gpio_install_isr_service(0);
        if installed != ESP_OK as esp_err_t && installed != ESP_ERR_INVALID_STATE as esp_err_t {
            esp!(installed)?;
        }

        esp!(gpio_isr_handler_add(RX_PIN, Some(on_start_edge), ptr::null_mut()))?;
        esp!(gpio_intr_enable(RX_PIN))?;
    }

    Ok(SoftSerial::new(
        BitBangRx { _pin: rx },
        BitBangTx { pin: tx },
        SELECTION.baud_rate,
    ))
}

/// RX falling edge: clock in one frame and queue it.
///
/// Edges inside the frame latch another interrupt; that one finds the line
/// high (stop bit or idle) and returns at once.
unsafe extern "C" fn on_start_edge(_arg: *mut c_void) {
    if unsafe { gpio_get_level(RX_PIN) } != 0 {
        return;
    }

    let byte = sample_8n1(
        || unsafe { gpio_get_level(RX_PIN) } != 0,
        |halves| unsafe { esp_rom_delay_us(halves * HALF_BIT_US) },
    );

    // Framing errors are dropped; a full queue counts an overrun
    if let Some(byte) = byte {
        RX_QUEUE.push(byte);
    }
}

/// Bytes lost because Context A fell behind the line.
pub fn rx_overruns() -> u32 {
    RX_QUEUE.overruns()
}

pub struct BitBangRx {
    // Keeps the pin configured as a pulled-up input
    _pin: PinDriver<'static, AnyIOPin, Input>,
}

impl BitRx for BitBangRx {
    fn rx_ready(&mut self) -> bool {
        !RX_QUEUE.is_empty()
    }

    fn rx_byte(&mut self) -> u8 {
        RX_QUEUE.pop().unwrap_or(0)
    }
}

pub struct BitBangTx {
    pin: PinDriver<'static, AnyOutputPin, Output>,
}

impl BitTx for BitBangTx {
    fn tx_full(&mut self) -> bool {
        false
    }

    fn tx_byte(&mut self, byte: u8) {
        let frame = frame_8n1(byte);
        for bit in 0..10 {
            let _ = if frame & (1 << bit) != 0 {
                self.pin.set_high()
            } else {
                self.pin.set_low()
            };
            Ets::delay_us(BIT_US);
        }
    }
}
