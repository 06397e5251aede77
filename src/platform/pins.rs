//! DTR/RTS mirror outputs on plain GPIOs.

use esp_idf_svc::hal::gpio::{AnyOutputPin, Level, Output, PinDriver};
use esp_idf_svc::sys::EspError;

use crate::config::FlowPins;
use crate::flow::ControlLines;

/// The two flow-control output pins.
pub struct GpioLines {
    ready: PinDriver<'static, AnyOutputPin, Output>,
    present: PinDriver<'static, AnyOutputPin, Output>,
}

impl GpioLines {
    /// Configure both pins as push-pull outputs, driven low.
    pub fn new(pins: FlowPins) -> Result<Self, EspError> {
        // SAFETY: pin numbers were validated at build time and are not
        // claimed by any other driver (no overlap with data or log pins).
        let (dtr, rts) = unsafe {
            (
                AnyOutputPin::new(pins.dtr_pin as _),
                AnyOutputPin::new(pins.rts_pin as _),
            )
        };

        let mut ready = PinDriver::output(dtr)?;
        let mut present = PinDriver::output(rts)?;
        ready.set_low()?;
        present.set_low()?;

        Ok(Self { ready, present })
    }
}

impl ControlLines for GpioLines {
    #[inline]
    fn set_ready(&mut self, level: bool) {
        // Writing a configured output cannot fail
        let _ = self.ready.set_level(Level::from(level));
    }

    #[inline]
    fn set_present(&mut self, level: bool) {
        let _ = self.present.set_level(Level::from(level));
    }
}
