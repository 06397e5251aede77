//! usb-uart-bridge - firmware entry point
//!
//! Start-up order:
//! 1. Log UART (optional)
//! 2. Serial backend picked at build time, split into RX/TX halves
//! 3. DTR/RTS mirror pins (optional)
//! 4. USB CDC-ACM
//! 5. Context B (outbound relay) pinned to core 1
//! 6. Context A (USB servicing + inbound relay) on the main task, core 0
//!
//! On the host this binary only prints the resolved build configuration.

#![cfg_attr(target_os = "espidf", no_std)]
#![cfg_attr(target_os = "espidf", no_main)]

#[cfg(target_os = "espidf")]
mod firmware {
    use core::convert::Infallible;
    use core::ffi::{c_char, c_void};
    use core::ptr;

    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::sys::{self as esp_idf_sys, esp, esp_err_t, EspError, ESP_ERR_NO_MEM};

    use usb_uart_bridge::backend::SerialBackend;
    use usb_uart_bridge::log_drain::LogDrain;
    use usb_uart_bridge::platform::{log_uart, pins::GpioLines, serial, usb_cdc, EspClock, SyncCell};
    use usb_uart_bridge::scheduler::{Clock, InboundContext, OutboundContext};
    use usb_uart_bridge::{
        ring_error, ring_info, ring_warn, FlowControlMirror, SpinLimit, BRIDGE, CHUNK_SIZE,
        INBOUND_LOG, OUTBOUND_LOG, SELECTION,
    };

    const OUTBOUND_STACK_BYTES: u32 = 4096;
    const OUTBOUND_PRIORITY: u32 = 5;
    const OUTBOUND_CORE: i32 = 1;

    type SerialTxHalf = <serial::Backend as SerialBackend>::Tx;
    type OutboundTask =
        OutboundContext<'static, usb_cdc::UsbCdcRx, SerialTxHalf, EspClock, CHUNK_SIZE>;

    // Written once by spawn_outbound before the task exists; afterwards owned
    // by the task, which takes the context out on entry.
    static OUTBOUND: SyncCell<Option<OutboundTask>> = SyncCell::new(None);

    #[no_mangle]
    fn main() {
        // Initialize ESP-IDF
        esp_idf_sys::link_patches();

        if let Err(e) = start() {
            let now = EspClock.now_us();
            ring_error!(INBOUND_LOG, now, "startup failed: {}", e);
            // The log UART may be what failed; the IDF console still works
            unsafe {
                esp_idf_sys::esp_rom_printf(
                    b"usb-uart-bridge: startup failed (%d)\n\0".as_ptr() as *const c_char,
                    e.code(),
                );
            }
        }

        loop {
            unsafe { esp_idf_sys::vTaskDelay(1000) };
        }
    }

    fn start() -> Result<Infallible, EspError> {
        let peripherals = Peripherals::take()?;
        let mut clock = EspClock;

        let drain = match BRIDGE.log_tx_pin {
            Some(pin) => Some(LogDrain::new(
                log_uart::init_log_uart(peripherals.uart2, pin, BRIDGE.log_baud_rate)?,
                &INBOUND_LOG,
                &OUTBOUND_LOG,
            )),
            None => None,
        };

        ring_info!(INBOUND_LOG, clock.now_us(), "{}", env!("VERSION_STRING"));

        let backend = serial::open(peripherals.uart0, peripherals.uart1)?;
        ring_info!(
            INBOUND_LOG,
            clock.now_us(),
            "serial: {:?} on tx=GPIO{} rx=GPIO{} @ {} baud",
            backend.kind(),
            BRIDGE.tx_pin,
            BRIDGE.rx_pin,
            backend.baud_rate()
        );
        if let Some(requested) = SELECTION.clamped_from {
            ring_warn!(INBOUND_LOG, clock.now_us(), "serial: {} baud requested, clamped", requested);
        }
        let (serial_rx, serial_tx) = backend.split();

        if let Some(flow) = BRIDGE.flow_control {
            usb_cdc::install_flow_mirror(FlowControlMirror::new(GpioLines::new(flow)?));
            ring_info!(
                INBOUND_LOG,
                clock.now_us(),
                "flow: DTR->GPIO{} RTS->GPIO{}",
                flow.dtr_pin,
                flow.rts_pin
            );
        }

        let (host, host_rx) = usb_cdc::init(BRIDGE.flow_control.is_some())?;
        ring_info!(INBOUND_LOG, clock.now_us(), "usb: cdc-acm ready, chunk {} bytes", CHUNK_SIZE);

        spawn_outbound(OutboundContext::new(
            host_rx,
            serial_tx,
            EspClock,
            SpinLimit::from_spins(BRIDGE.tx_stall_report_spins),
            &OUTBOUND_LOG,
        ))?;

        InboundContext::<_, _, _, _, CHUNK_SIZE>::new(host, serial_rx, clock, &INBOUND_LOG, drain).run()
    }

    fn spawn_outbound(task: OutboundTask) -> Result<(), EspError> {
        // SAFETY: the task does not exist yet; nothing else reads the slot
        unsafe { *OUTBOUND.as_ptr() = Some(task) };

        let created = unsafe {
            esp_idf_sys::xTaskCreatePinnedToCore(
                Some(outbound_entry),
                b"outbound\0".as_ptr() as *const c_char,
                OUTBOUND_STACK_BYTES,
                OUTBOUND.as_ptr() as *mut c_void,
                OUTBOUND_PRIORITY,
                ptr::null_mut(),
                OUTBOUND_CORE,
            )
        };

        if created != 1 {
            esp!(ESP_ERR_NO_MEM as esp_err_t)?;
        }
        Ok(())
    }

    /// Context B entry point (core 1).
    unsafe extern "C" fn outbound_entry(slot: *mut c_void) {
        // SAFETY: `slot` is OUTBOUND, filled before this task was created
        let slot = &mut *(slot as *mut Option<OutboundTask>);
        if let Some(task) = slot.take() {
            ring_info!(OUTBOUND_LOG, EspClock.now_us(), "outbound relay running on core 1");
            task.run();
        }
        // FreeRTOS tasks must not return
        esp_idf_sys::vTaskDelete(ptr::null_mut());
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    use usb_uart_bridge::{BRIDGE, CHUNK_SIZE, SELECTION};

    println!("{}", env!("VERSION_STRING"));
    println!("serial:  tx=GPIO{} rx=GPIO{}", BRIDGE.tx_pin, BRIDGE.rx_pin);
    println!("backend: {:?} @ {} baud", SELECTION.backend, SELECTION.baud_rate);
    if let Some(requested) = SELECTION.clamped_from {
        println!("         ({} baud requested, clamped)", requested);
    }
    match BRIDGE.flow_control {
        Some(flow) => println!("flow:    DTR->GPIO{} RTS->GPIO{}", flow.dtr_pin, flow.rts_pin),
        None => println!("flow:    disabled"),
    }
    println!("chunk:   {} bytes", CHUNK_SIZE);
    println!("build this crate for an espidf target to get the firmware");
}
