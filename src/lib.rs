//! # usb-uart-bridge
//!
//! USB CDC-ACM ⇄ UART bridge for the dual-core ESP32-S3.
//!
//! ## Architecture
//!
//! Two contexts, no locks, no shared buffers:
//! - Context A (core 0): USB stack servicing, serial → host relay
//! - Context B (core 1): host → serial relay, nothing else
//!
//! The serial line is either a hardware UART or a bit-banged engine,
//! chosen at build time from the pins in `bridge.toml`. Both implement the
//! same four-operation contract ([`backend::SerialRx`],
//! [`backend::SerialTx`]).
//!
//! Everything outside [`platform`] is `no_std`, hardware-free and tested on
//! the host.

#![cfg_attr(not(test), no_std)]

pub mod backend;
pub mod config;
pub mod flow;
pub mod host;
pub mod log_drain;
pub mod log_globals;
pub mod logging;
pub mod relay;
pub mod scheduler;
pub mod spin;

#[cfg(target_os = "espidf")]
pub mod platform;

pub use backend::{BackendKind, SerialBackend, SerialRx, SerialTx};
pub use config::{BRIDGE, CHUNK_SIZE, SELECTION};
pub use flow::{ControlLines, FlowControlMirror, LineState};
pub use host::{HostRx, HostService, HostTx};
pub use log_globals::{INBOUND_LOG, OUTBOUND_LOG};
pub use relay::{InboundOutcome, InboundRelay, OutboundOutcome, OutboundRelay};
pub use scheduler::{Clock, InboundContext, OutboundContext};
pub use spin::SpinLimit;
