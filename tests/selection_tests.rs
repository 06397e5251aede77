//! Serial backend selection and configuration validation

use usb_uart_bridge::backend::select::{route_for, select, UART_ROUTES};
use usb_uart_bridge::config::{
    validate, BackendKind, BridgeConfig, ConfigError, FlowPins, UartPort, MAX_CHUNK_SIZE,
    SOFT_BAUD_CEILING,
};

fn with_pins(tx_pin: u8, rx_pin: u8) -> BridgeConfig {
    BridgeConfig { tx_pin, rx_pin, ..BridgeConfig::DEFAULT }
}

#[test]
fn test_every_route_selects_its_port() {
    for route in UART_ROUTES {
        let selection = select(&with_pins(route.tx_pin, route.rx_pin));
        assert_eq!(selection.backend, BackendKind::Hardware(route.port));
        assert_eq!(selection.baud_rate, 115_200);
        assert_eq!(selection.clamped_from, None);
    }
}

#[test]
fn test_hardware_keeps_high_baud() {
    let config = BridgeConfig { baud_rate: 3_000_000, ..with_pins(43, 44) };
    let selection = select(&config);
    assert_eq!(selection.backend, BackendKind::Hardware(UartPort::Uart0));
    assert_eq!(selection.baud_rate, 3_000_000);
}

#[test]
fn test_unrouted_pins_select_software_and_clamp() {
    let selection = select(&with_pins(21, 38));
    assert_eq!(selection.backend, BackendKind::Software);
    assert_eq!(selection.baud_rate, SOFT_BAUD_CEILING);
    assert_eq!(selection.clamped_from, Some(115_200));
}

#[test]
fn test_mixed_route_pins_select_software() {
    // TX of UART0 with RX of UART1 is not a route
    assert_eq!(route_for(43, 18), None);
    assert_eq!(select(&with_pins(43, 18)).backend, BackendKind::Software);
}

#[test]
fn test_force_software_overrides_route() {
    let config = BridgeConfig { force_software: true, baud_rate: 9600, ..with_pins(17, 18) };
    let selection = select(&config);
    assert_eq!(selection.backend, BackendKind::Software);
    assert_eq!(selection.baud_rate, 9600);
    assert_eq!(selection.clamped_from, None, "at or below the ceiling is not clamped");
}

#[test]
fn test_ceiling_itself_is_not_clamped() {
    let config = BridgeConfig { baud_rate: SOFT_BAUD_CEILING, ..with_pins(1, 2) };
    assert_eq!(select(&config).clamped_from, None);

    let config = BridgeConfig { baud_rate: SOFT_BAUD_CEILING + 1, ..with_pins(1, 2) };
    assert_eq!(select(&config).clamped_from, Some(SOFT_BAUD_CEILING + 1));
}

#[test]
fn test_selection_is_deterministic() {
    let config = with_pins(5, 6);
    assert_eq!(select(&config), select(&config));
}

#[test]
fn test_cfg_names() {
    assert_eq!(BackendKind::Hardware(UartPort::Uart1).cfg_name(), "hardware");
    assert_eq!(BackendKind::Software.cfg_name(), "software");
}

#[test]
fn test_default_config_is_valid() {
    assert_eq!(validate(&BridgeConfig::DEFAULT), Ok(()));
}

#[test]
fn test_validate_rejects_bad_configs() {
    assert_eq!(validate(&with_pins(49, 18)), Err(ConfigError::PinOutOfRange(49)));
    assert_eq!(
        validate(&BridgeConfig { baud_rate: 0, ..BridgeConfig::DEFAULT }),
        Err(ConfigError::ZeroBaud)
    );
    assert_eq!(
        validate(&BridgeConfig { chunk_size: 0, ..BridgeConfig::DEFAULT }),
        Err(ConfigError::ChunkSize(0))
    );
    assert_eq!(
        validate(&BridgeConfig { chunk_size: MAX_CHUNK_SIZE + 1, ..BridgeConfig::DEFAULT }),
        Err(ConfigError::ChunkSize(MAX_CHUNK_SIZE + 1))
    );
}

#[test]
fn test_validate_rejects_pin_conflicts() {
    let flow_on_tx = BridgeConfig {
        flow_control: Some(FlowPins { rts_pin: 17, dtr_pin: 16 }),
        ..BridgeConfig::DEFAULT
    };
    assert_eq!(validate(&flow_on_tx), Err(ConfigError::PinConflict(17)));

    let flow_same = BridgeConfig {
        flow_control: Some(FlowPins { rts_pin: 9, dtr_pin: 9 }),
        ..BridgeConfig::DEFAULT
    };
    assert_eq!(validate(&flow_same), Err(ConfigError::PinConflict(9)));

    let log_on_rx = BridgeConfig { log_tx_pin: Some(18), ..BridgeConfig::DEFAULT };
    assert_eq!(validate(&log_on_rx), Err(ConfigError::PinConflict(18)));

    // Flow pins are free again once flow control is off
    let no_flow = BridgeConfig {
        flow_control: None,
        log_tx_pin: Some(15),
        ..BridgeConfig::DEFAULT
    };
    assert_eq!(validate(&no_flow), Ok(()));
}

#[test]
fn test_validate_rejects_missing_and_reserved_pins() {
    // No pad on the chip
    assert_eq!(validate(&with_pins(22, 18)), Err(ConfigError::PinOutOfRange(22)));
    assert_eq!(validate(&with_pins(17, 25)), Err(ConfigError::PinOutOfRange(25)));

    // USB D-/D+ and flash/PSRAM
    assert_eq!(validate(&with_pins(19, 18)), Err(ConfigError::ReservedPin(19)));
    assert_eq!(validate(&with_pins(17, 30)), Err(ConfigError::ReservedPin(30)));

    let flow_on_usb = BridgeConfig {
        flow_control: Some(FlowPins { rts_pin: 19, dtr_pin: 20 }),
        ..BridgeConfig::DEFAULT
    };
    assert_eq!(validate(&flow_on_usb), Err(ConfigError::ReservedPin(19)));

    let log_on_flash = BridgeConfig { log_tx_pin: Some(27), ..BridgeConfig::DEFAULT };
    assert_eq!(validate(&log_on_flash), Err(ConfigError::ReservedPin(27)));

    let everything_wrong = BridgeConfig {
        flow_control: Some(FlowPins { rts_pin: 19, dtr_pin: 20 }),
        ..with_pins(22, 23)
    };
    assert!(validate(&everything_wrong).is_err());
}

#[test]
fn test_usable_pins_around_reserved_ranges() {
    let config = BridgeConfig {
        flow_control: Some(FlowPins { rts_pin: 33, dtr_pin: 48 }),
        log_tx_pin: Some(0),
        ..with_pins(21, 33)
    };
    assert_eq!(validate(&config), Err(ConfigError::PinConflict(33)));

    let config = BridgeConfig {
        flow_control: Some(FlowPins { rts_pin: 34, dtr_pin: 48 }),
        log_tx_pin: Some(0),
        ..with_pins(21, 33)
    };
    assert_eq!(validate(&config), Ok(()));
}

#[test]
fn test_chunk_size_is_capped_at_one_usb_packet() {
    assert_eq!(MAX_CHUNK_SIZE, 64);
    assert_eq!(
        validate(&BridgeConfig { chunk_size: 64, ..BridgeConfig::DEFAULT }),
        Ok(())
    );
    assert_eq!(
        validate(&BridgeConfig { chunk_size: 128, ..BridgeConfig::DEFAULT }),
        Err(ConfigError::ChunkSize(128))
    );
}

#[test]
fn test_config_error_codes() {
    assert_eq!(ConfigError::SamePin(1).code(), "C01");
    assert_eq!(ConfigError::ChunkSize(0).code(), "C05");
    assert_eq!(ConfigError::ReservedPin(20).code(), "C06");
    assert_eq!(
        ConfigError::ReservedPin(20).to_string(),
        "C06: pin reserved for usb, flash or psram (GPIO20)"
    );
    assert_eq!(
        ConfigError::ChunkSize(600).to_string(),
        format!("C05: chunk size out of range (600, max {})", MAX_CHUNK_SIZE)
    );
}
