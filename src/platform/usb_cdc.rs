//! USB CDC-ACM host port through `esp_tinyusb`.
//!
//! The default TinyUSB task is disabled (`CONFIG_TINYUSB_NO_DEFAULT_TASK`):
//! [`UsbCdc::service`] runs the device stack from Context A. Line-state
//! callbacks therefore fire on Context A, inside `service()`.
//!
//! TinyUSB guards its CDC FIFOs with FreeRTOS mutexes, so reading the RX
//! FIFO from core 1 while core 0 services the stack is supported.

use core::ffi::c_int;

use esp_idf_svc::sys::tinyusb::{
    cdcacm_event_t, tinyusb_cdcacm_itf_t_TINYUSB_CDC_ACM_0, tinyusb_config_cdcacm_t,
    tinyusb_config_t, tinyusb_driver_install, tinyusb_usbdev_t_TINYUSB_USBDEV_0,
    tud_cdc_n_available, tud_cdc_n_read, tud_cdc_n_write, tud_cdc_n_write_available,
    tud_cdc_n_write_flush, tud_task_ext, tusb_cdc_acm_init,
};
use esp_idf_svc::sys::{esp, EspError};

use super::pins::GpioLines;
use super::SyncCell;
use crate::config::CHUNK_SIZE;
use crate::flow::{FlowControlMirror, LineState};
use crate::host::{HostRx, HostService, HostTx};

const ITF: u8 = 0;

/// Mirror driven from the line-state callback.
///
/// Written by [`install_flow_mirror`] before the USB driver is installed;
/// afterwards only the callback touches it, and the callback only runs
/// inside `tud_task_ext` on Context A.
static FLOW_MIRROR: SyncCell<Option<FlowControlMirror<GpioLines>>> = SyncCell::new(None);

/// Route DTR/RTS changes to `mirror`. Call before [`init`].
pub fn install_flow_mirror(mirror: FlowControlMirror<GpioLines>) {
    // SAFETY: start-up, single context, USB not yet running
    unsafe { *FLOW_MIRROR.as_ptr() = Some(mirror) };
}

unsafe extern "C" fn on_line_state_changed(_itf: c_int, event: *mut cdcacm_event_t) {
    if event.is_null() {
        return;
    }
    let data = (*event).__bindgen_anon_1.line_state_changed_data;

    // SAFETY: see FLOW_MIRROR
    if let Some(mirror) = (*FLOW_MIRROR.as_ptr()).as_mut() {
        mirror.on_line_state_change(LineState::from_dtr_rts(data.dtr, data.rts));
    }
}

/// Install TinyUSB with the default CDC-ACM descriptors.
///
/// Returns the Context A side (service + device→host) and the Context B
/// side (host→device).
pub fn init(flow_control: bool) -> Result<(UsbCdc, UsbCdcRx), EspError> {
    let usb_config = tinyusb_config_t::default();
    esp!(unsafe { tinyusb_driver_install(&usb_config) })?;

    let acm_config = tinyusb_config_cdcacm_t {
        usb_dev: tinyusb_usbdev_t_TINYUSB_USBDEV_0,
        cdc_port: tinyusb_cdcacm_itf_t_TINYUSB_CDC_ACM_0,
        rx_unread_buf_sz: CHUNK_SIZE as _,
        callback_line_state_changed: if flow_control {
            Some(on_line_state_changed)
        } else {
            None
        },
        ..Default::default()
    };
    esp!(unsafe { tusb_cdc_acm_init(&acm_config) })?;

    Ok((UsbCdc { _private: () }, UsbCdcRx { _private: () }))
}

/// Context A side of the CDC interface.
pub struct UsbCdc {
    _private: (),
}

impl HostService for UsbCdc {
    #[inline]
    fn service(&mut self) {
        // Zero timeout: process pending events and return
        unsafe { tud_task_ext(0, false) };
    }
}

impl HostTx for UsbCdc {
    #[inline]
    fn write_available(&mut self) -> bool {
        unsafe { tud_cdc_n_write_available(ITF) > 0 }
    }

    #[inline]
    fn write(&mut self, data: &[u8]) {
        // Whatever the FIFO cannot take is lost, like any other inbound drop
        unsafe { tud_cdc_n_write(ITF, data.as_ptr().cast(), data.len() as u32) };
    }

    #[inline]
    fn flush(&mut self) {
        unsafe { tud_cdc_n_write_flush(ITF) };
    }
}

/// Context B side of the CDC interface.
pub struct UsbCdcRx {
    _private: (),
}

impl HostRx for UsbCdcRx {
    #[inline]
    fn available(&mut self) -> bool {
        unsafe { tud_cdc_n_available(ITF) > 0 }
    }

    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> usize {
        unsafe { tud_cdc_n_read(ITF, buf.as_mut_ptr().cast(), buf.len() as u32) as usize }
    }
}
