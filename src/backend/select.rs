//! Build-time serial backend selection.
//!
//! This file is compiled twice: as `backend::select` in the crate and by
//! `build.rs` through `#[path]`. It must only use `core`.
//!
//! # Routing
//!
//! ```text
//! (tx_pin, rx_pin) ──▶ IO_MUX route? ──yes──▶ Hardware(UARTn) @ baud
//!        │                  │
//!  force_software           no
//!        │                  │
//!        └──────────────────┴──────────▶ Software @ min(baud, ceiling)
//! ```

/// Highest rate the bit-banged engine clocks reliably.
pub const SOFT_BAUD_CEILING: u32 = 38_400;

/// Highest GPIO number on the ESP32-S3.
pub const MAX_GPIO: u8 = 48;

/// GPIO numbers below [`MAX_GPIO`] with no pad on the ESP32-S3.
pub const MISSING_PINS: [u8; 4] = [22, 23, 24, 25];

/// Pads the bridge must not claim: 19/20 are the USB D-/D+ lines the host
/// port runs on, 26..=32 carry SPI flash and PSRAM.
pub const RESERVED_PINS: [u8; 9] = [19, 20, 26, 27, 28, 29, 30, 31, 32];

/// Upper bound for the per-invocation transfer chunk: one full-speed bulk
/// packet, which is also the CDC FIFO size in `sdkconfig.defaults`.
pub const MAX_CHUNK_SIZE: usize = 64;

/// Hardware UART able to drive a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartPort {
    Uart0,
    Uart1,
}

impl UartPort {
    /// ESP-IDF port number.
    pub const fn index(self) -> u8 {
        match self {
            UartPort::Uart0 => 0,
            UartPort::Uart1 => 1,
        }
    }
}

/// Fixed IO_MUX pin assignment of a UART.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartRoute {
    pub port: UartPort,
    pub tx_pin: u8,
    pub rx_pin: u8,
}

/// ESP32-S3 UART IO_MUX routes (TRM, IO MUX pin functions).
pub const UART_ROUTES: [UartRoute; 2] = [
    UartRoute { port: UartPort::Uart0, tx_pin: 43, rx_pin: 44 },
    UartRoute { port: UartPort::Uart1, tx_pin: 17, rx_pin: 18 },
];

/// Output pins mirroring the host's control lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowPins {
    /// Follows RTS ("host present").
    pub rts_pin: u8,
    /// Follows DTR ("host ready").
    pub dtr_pin: u8,
}

/// Complete build-time configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    pub tx_pin: u8,
    pub rx_pin: u8,
    /// Requested line rate. The effective rate is [`Selection::baud_rate`].
    pub baud_rate: u32,
    /// Use the bit-banged engine even when the pins have a hardware route.
    pub force_software: bool,
    /// `None` disables control-line mirroring.
    pub flow_control: Option<FlowPins>,
    /// Bytes moved per relay invocation, per direction.
    pub chunk_size: usize,
    /// TX pin of the log UART. `None` disables log output.
    pub log_tx_pin: Option<u8>,
    pub log_baud_rate: u32,
    /// Failed capacity polls before a blocked serial write is reported.
    /// Zero never reports.
    pub tx_stall_report_spins: u32,
}

impl BridgeConfig {
    pub const DEFAULT: Self = Self {
        tx_pin: 17,
        rx_pin: 18,
        baud_rate: 115_200,
        force_software: false,
        flow_control: Some(FlowPins { rts_pin: 15, dtr_pin: 16 }),
        chunk_size: 64,
        log_tx_pin: Some(6),
        log_baud_rate: 115_200,
        tx_stall_report_spins: 1_000_000,
    };
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Which transport carries the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Hardware(UartPort),
    Software,
}

impl BackendKind {
    /// Value of the `bridge_backend` cfg emitted by the build script.
    pub const fn cfg_name(self) -> &'static str {
        match self {
            BackendKind::Hardware(_) => "hardware",
            BackendKind::Software => "software",
        }
    }
}

/// Outcome of [`select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub backend: BackendKind,
    /// Effective line rate.
    pub baud_rate: u32,
    /// Requested rate, when it exceeded [`SOFT_BAUD_CEILING`].
    pub clamped_from: Option<u32>,
}

const fn contains(pins: &[u8], pin: u8) -> bool {
    let mut i = 0;
    while i < pins.len() {
        if pins[i] == pin {
            return true;
        }
        i += 1;
    }
    false
}

/// The pad exists on the ESP32-S3.
pub const fn pin_exists(pin: u8) -> bool {
    pin <= MAX_GPIO && !contains(&MISSING_PINS, pin)
}

/// The pad exists but belongs to USB, flash or PSRAM.
pub const fn pin_reserved(pin: u8) -> bool {
    contains(&RESERVED_PINS, pin)
}

/// Find the hardware UART whose IO_MUX route is exactly `(tx_pin, rx_pin)`.
pub const fn route_for(tx_pin: u8, rx_pin: u8) -> Option<UartPort> {
    let mut i = 0;
    while i < UART_ROUTES.len() {
        let route = UART_ROUTES[i];
        if route.tx_pin == tx_pin && route.rx_pin == rx_pin {
            return Some(route.port);
        }
        i += 1;
    }
    None
}

/// Pick the serial backend for `config`.
pub const fn select(config: &BridgeConfig) -> Selection {
    if !config.force_software {
        if let Some(port) = route_for(config.tx_pin, config.rx_pin) {
            return Selection {
                backend: BackendKind::Hardware(port),
                baud_rate: config.baud_rate,
                clamped_from: None,
            };
        }
    }

    if config.baud_rate > SOFT_BAUD_CEILING {
        Selection {
            backend: BackendKind::Software,
            baud_rate: SOFT_BAUD_CEILING,
            clamped_from: Some(config.baud_rate),
        }
    } else {
        Selection {
            backend: BackendKind::Software,
            baud_rate: config.baud_rate,
            clamped_from: None,
        }
    }
}

/// Configuration rejected at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// C01: TX and RX on the same GPIO
    SamePin(u8),
    /// C02: GPIO number does not exist on the chip
    PinOutOfRange(u8),
    /// C03: GPIO assigned to two functions
    PinConflict(u8),
    /// C04: Baud rate of zero
    ZeroBaud,
    /// C05: Chunk size outside 1..=MAX_CHUNK_SIZE
    ChunkSize(usize),
    /// C06: GPIO used by USB, flash or PSRAM
    ReservedPin(u8),
}

impl ConfigError {
    /// Get error code string
    pub const fn code(&self) -> &'static str {
        match self {
            Self::SamePin(_) => "C01",
            Self::PinOutOfRange(_) => "C02",
            Self::PinConflict(_) => "C03",
            Self::ZeroBaud => "C04",
            Self::ChunkSize(_) => "C05",
            Self::ReservedPin(_) => "C06",
        }
    }

    /// Get error message
    pub const fn message(&self) -> &'static str {
        match self {
            Self::SamePin(_) => "tx and rx share a pin",
            Self::PinOutOfRange(_) => "no such pin",
            Self::PinConflict(_) => "pin used twice",
            Self::ZeroBaud => "baud rate must be non-zero",
            Self::ChunkSize(_) => "chunk size out of range",
            Self::ReservedPin(_) => "pin reserved for usb, flash or psram",
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SamePin(pin)
            | Self::PinOutOfRange(pin)
            | Self::PinConflict(pin)
            | Self::ReservedPin(pin) => {
                write!(f, "{}: {} (GPIO{})", self.code(), self.message(), pin)
            }
            Self::ChunkSize(size) => {
                write!(f, "{}: {} ({}, max {})", self.code(), self.message(), size, MAX_CHUNK_SIZE)
            }
            Self::ZeroBaud => write!(f, "{}: {}", self.code(), self.message()),
        }
    }
}

/// Reject configurations that cannot be wired.
pub const fn validate(config: &BridgeConfig) -> Result<(), ConfigError> {
    if config.tx_pin == config.rx_pin {
        return Err(ConfigError::SamePin(config.tx_pin));
    }
    if config.baud_rate == 0 || config.log_baud_rate == 0 {
        return Err(ConfigError::ZeroBaud);
    }
    if config.chunk_size == 0 || config.chunk_size > MAX_CHUNK_SIZE {
        return Err(ConfigError::ChunkSize(config.chunk_size));
    }

    // tx, rx, rts, dtr, log
    let mut pins = [None; 5];
    pins[0] = Some(config.tx_pin);
    pins[1] = Some(config.rx_pin);
    if let Some(flow) = config.flow_control {
        pins[2] = Some(flow.rts_pin);
        pins[3] = Some(flow.dtr_pin);
    }
    pins[4] = config.log_tx_pin;

    let mut i = 0;
    while i < pins.len() {
        if let Some(pin) = pins[i] {
            if !pin_exists(pin) {
                return Err(ConfigError::PinOutOfRange(pin));
            }
            if pin_reserved(pin) {
                return Err(ConfigError::ReservedPin(pin));
            }
            let mut j = i + 1;
            while j < pins.len() {
                if let Some(other) = pins[j] {
                    if other == pin {
                        return Err(ConfigError::PinConflict(pin));
                    }
                }
                j += 1;
            }
        }
        i += 1;
    }
    Ok(())
}
