//! ESP-IDF bindings for the bridge (ESP32-S3 only).
//!
//! Thin wrappers around ESP-IDF peripherals. The relay logic stays in the
//! core modules; everything here is I/O.
//!
//! Exactly one serial backend module is compiled, chosen by `build.rs`
//! through the `bridge_backend` cfg. Both expose `serial::{Backend, open}`.

use core::cell::UnsafeCell;

use crate::scheduler::Clock;

pub mod log_uart;
pub mod pins;
pub mod usb_cdc;

#[cfg(bridge_backend = "hardware")]
pub mod hw_uart;
#[cfg(bridge_backend = "hardware")]
pub use hw_uart as serial;

#[cfg(bridge_backend = "software")]
pub mod bitbang;
#[cfg(bridge_backend = "software")]
pub use bitbang as serial;

/// `esp_timer` microseconds since boot.
#[derive(Clone, Copy, Default)]
pub struct EspClock;

impl Clock for EspClock {
    #[inline]
    fn now_us(&mut self) -> i64 {
        // SAFETY: esp_timer is started by the IDF before app_main
        unsafe { esp_idf_svc::sys::esp_timer_get_time() }
    }
}

/// Static slot shared with C callbacks or a task entry point.
///
/// Each slot is written once during start-up, before anything that reads it
/// exists, and afterwards touched by exactly one context.
#[repr(transparent)]
pub struct SyncCell<T>(UnsafeCell<T>);

// SAFETY: single-writer, single-context use as documented on each static.
unsafe impl<T> Sync for SyncCell<T> {}

impl<T> SyncCell<T> {
    pub const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }

    pub fn as_ptr(&self) -> *mut T {
        self.0.get()
    }
}
