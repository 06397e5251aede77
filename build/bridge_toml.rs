// usb-uart-bridge - bridge.toml schema
//
// Compiled into build.rs and into the host tests through #[path]; expects a
// sibling `select` module (src/backend/select.rs).

use std::fmt::Display;
use std::str::FromStr;

use serde::Deserialize;

use super::select::{BridgeConfig, FlowPins};

const DEFAULT: BridgeConfig = BridgeConfig::DEFAULT;

/// Environment variables that override `bridge.toml` keys.
pub const ENV_KEYS: [&str; 12] = [
    "BRIDGE_TX_PIN",
    "BRIDGE_RX_PIN",
    "BRIDGE_BAUD_RATE",
    "BRIDGE_FORCE_SOFTWARE",
    "BRIDGE_FLOW_CONTROL",
    "BRIDGE_RTS_PIN",
    "BRIDGE_DTR_PIN",
    "BRIDGE_CHUNK_SIZE",
    "BRIDGE_LOG_OUTPUT",
    "BRIDGE_LOG_TX_PIN",
    "BRIDGE_LOG_BAUD_RATE",
    "BRIDGE_TX_STALL_REPORT_SPINS",
];

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SerialSection {
    tx_pin: u8,
    rx_pin: u8,
    baud_rate: u32,
    force_software: bool,
}

impl Default for SerialSection {
    fn default() -> Self {
        Self {
            tx_pin: DEFAULT.tx_pin,
            rx_pin: DEFAULT.rx_pin,
            baud_rate: DEFAULT.baud_rate,
            force_software: DEFAULT.force_software,
        }
    }
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FlowSection {
    enabled: bool,
    rts_pin: u8,
    dtr_pin: u8,
}

impl Default for FlowSection {
    fn default() -> Self {
        let pins = DEFAULT.flow_control.unwrap_or(FlowPins { rts_pin: 15, dtr_pin: 16 });
        Self {
            enabled: DEFAULT.flow_control.is_some(),
            rts_pin: pins.rts_pin,
            dtr_pin: pins.dtr_pin,
        }
    }
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct UsbSection {
    chunk_size: usize,
}

impl Default for UsbSection {
    fn default() -> Self {
        Self { chunk_size: DEFAULT.chunk_size }
    }
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DiagnosticsSection {
    log_output: bool,
    log_tx_pin: Option<u8>,
    log_baud_rate: u32,
    tx_stall_report_spins: u32,
}

impl Default for DiagnosticsSection {
    fn default() -> Self {
        Self {
            log_output: DEFAULT.log_tx_pin.is_some(),
            log_tx_pin: DEFAULT.log_tx_pin,
            log_baud_rate: DEFAULT.log_baud_rate,
            tx_stall_report_spins: DEFAULT.tx_stall_report_spins,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct BridgeToml {
    serial: SerialSection,
    flow_control: FlowSection,
    usb: UsbSection,
    diagnostics: DiagnosticsSection,
}

struct Overrides<E> {
    env: E,
}

impl<E: Fn(&str) -> Option<String>> Overrides<E> {
    fn get<T>(&self, key: &str, current: T) -> Result<T, String>
    where
        T: FromStr,
        T::Err: Display,
    {
        match (self.env)(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| format!("{}={:?} is invalid: {}", key, raw, e)),
            None => Ok(current),
        }
    }

    /// Like [`get`](Self::get), with "none" (or empty) clearing the value.
    fn get_opt<T>(&self, key: &str, current: Option<T>) -> Result<Option<T>, String>
    where
        T: FromStr,
        T::Err: Display,
    {
        match (self.env)(key) {
            Some(raw) if raw.trim().is_empty() || raw.trim().eq_ignore_ascii_case("none") => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| format!("{}={:?} is invalid: {}", key, raw, e)),
            None => Ok(current),
        }
    }
}

/// Parse `bridge.toml` text (empty for a missing file) and apply `env`
/// overrides. Missing tables and keys take [`BridgeConfig::DEFAULT`].
pub fn load<E>(text: &str, env: E) -> Result<BridgeConfig, String>
where
    E: Fn(&str) -> Option<String>,
{
    let parsed: BridgeToml = toml::from_str(text).map_err(|e| e.to_string())?;
    let env = Overrides { env };

    let flow_control = if env.get("BRIDGE_FLOW_CONTROL", parsed.flow_control.enabled)? {
        Some(FlowPins {
            rts_pin: env.get("BRIDGE_RTS_PIN", parsed.flow_control.rts_pin)?,
            dtr_pin: env.get("BRIDGE_DTR_PIN", parsed.flow_control.dtr_pin)?,
        })
    } else {
        None
    };

    let diagnostics = &parsed.diagnostics;
    let log_tx_pin = if env.get("BRIDGE_LOG_OUTPUT", diagnostics.log_output)? {
        env.get_opt("BRIDGE_LOG_TX_PIN", diagnostics.log_tx_pin)?
    } else {
        None
    };

    Ok(BridgeConfig {
        tx_pin: env.get("BRIDGE_TX_PIN", parsed.serial.tx_pin)?,
        rx_pin: env.get("BRIDGE_RX_PIN", parsed.serial.rx_pin)?,
        baud_rate: env.get("BRIDGE_BAUD_RATE", parsed.serial.baud_rate)?,
        force_software: env.get("BRIDGE_FORCE_SOFTWARE", parsed.serial.force_software)?,
        flow_control,
        chunk_size: env.get("BRIDGE_CHUNK_SIZE", parsed.usb.chunk_size)?,
        log_tx_pin,
        log_baud_rate: env.get("BRIDGE_LOG_BAUD_RATE", diagnostics.log_baud_rate)?,
        tx_stall_report_spins: env.get(
            "BRIDGE_TX_STALL_REPORT_SPINS",
            diagnostics.tx_stall_report_spins,
        )?,
    })
}

/// Smaller of the TinyUSB CDC RX/TX FIFO sizes set in an sdkconfig file.
///
/// `None` when either key is absent (the component default then applies).
pub fn cdc_fifo_size(sdkconfig: &str) -> Option<usize> {
    let value = |key: &str| {
        sdkconfig.lines().find_map(|line| {
            let (name, value) = line.trim().split_once('=')?;
            (name.trim() == key).then(|| value.trim().parse::<usize>().ok()).flatten()
        })
    };

    let rx = value("CONFIG_TINYUSB_CDC_RX_BUFSIZE")?;
    let tx = value("CONFIG_TINYUSB_CDC_TX_BUFSIZE")?;
    Some(rx.min(tx))
}
