// usb-uart-bridge - Build Script
//
// Loads bridge.toml (with BRIDGE_* environment overrides), validates it
// against the chip and the TinyUSB settings, selects the serial backend and
// generates the configuration constants.

use std::env;
use std::fmt::Display;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

#[allow(dead_code)]
#[path = "src/backend/select.rs"]
mod select;

#[path = "build/bridge_toml.rs"]
mod bridge_toml;

use select::{BridgeConfig, SOFT_BAUD_CEILING};

fn load_config(path: &PathBuf) -> BridgeConfig {
    for key in bridge_toml::ENV_KEYS {
        println!("cargo:rerun-if-env-changed={}", key);
    }

    // A missing file means all defaults
    let text = fs::read_to_string(path).unwrap_or_default();
    bridge_toml::load(&text, |key| env::var(key).ok())
        .unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
}

fn opt_literal<T: Display>(value: Option<T>) -> String {
    match value {
        Some(v) => format!("Some({})", v),
        None => "None".to_string(),
    }
}

fn render(config: &BridgeConfig) -> String {
    let flow = match config.flow_control {
        Some(pins) => format!(
            "Some(FlowPins {{ rts_pin: {}, dtr_pin: {} }})",
            pins.rts_pin, pins.dtr_pin
        ),
        None => "None".to_string(),
    };

    format!(
        "// Generated by build.rs from bridge.toml. Do not edit.\n\
         pub const BRIDGE: BridgeConfig = BridgeConfig {{\n    \
             tx_pin: {},\n    \
             rx_pin: {},\n    \
             baud_rate: {},\n    \
             force_software: {},\n    \
             flow_control: {},\n    \
             chunk_size: {},\n    \
             log_tx_pin: {},\n    \
             log_baud_rate: {},\n    \
             tx_stall_report_spins: {},\n\
         }};\n",
        config.tx_pin,
        config.rx_pin,
        config.baud_rate,
        config.force_software,
        flow,
        config.chunk_size,
        opt_literal(config.log_tx_pin),
        config.log_baud_rate,
        config.tx_stall_report_spins,
    )
}

fn main() {
    // ESP-IDF environment setup (MUST be first!)
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    println!("cargo:rerun-if-changed=bridge.toml");
    println!("cargo:rerun-if-changed=src/backend/select.rs");
    println!("cargo:rerun-if-changed=build/bridge_toml.rs");
    println!("cargo:rerun-if-changed=sdkconfig.defaults");

    // Get git version info
    let version = env!("CARGO_PKG_VERSION");
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=VERSION_STRING=usb-uart-bridge v{}-g{}", version, git_hash);

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR"));
    let config = load_config(&manifest_dir.join("bridge.toml"));

    if let Err(e) = select::validate(&config) {
        panic!("bridge.toml: {}", e);
    }

    // A forward larger than the CDC FIFO would be cut short by the stack
    let sdkconfig = fs::read_to_string(manifest_dir.join("sdkconfig.defaults")).unwrap_or_default();
    if let Some(fifo) = bridge_toml::cdc_fifo_size(&sdkconfig) {
        if config.chunk_size > fifo {
            panic!(
                "bridge.toml: chunk_size {} exceeds the TinyUSB CDC FIFO ({} bytes) in sdkconfig.defaults",
                config.chunk_size, fifo
            );
        }
    }

    let selection = select::select(&config);
    if let Some(requested) = selection.clamped_from {
        println!(
            "cargo:warning=software serial selected for GPIO{}/GPIO{}: {} baud clamped to {}",
            config.tx_pin, config.rx_pin, requested, SOFT_BAUD_CEILING
        );
    }

    println!("cargo:rustc-check-cfg=cfg(bridge_backend, values(\"hardware\", \"software\"))");
    println!("cargo:rustc-cfg=bridge_backend=\"{}\"", selection.backend.cfg_name());

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR"));
    fs::write(out_dir.join("bridge_config.rs"), render(&config))
        .expect("Failed to write generated bridge_config.rs");

    // Rebuild if git HEAD changes
    println!("cargo:rerun-if-changed=.git/HEAD");
}
