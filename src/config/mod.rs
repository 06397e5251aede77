//! Module: config
//!
//! Purpose: Build-time configuration of the bridge.
//!
//! Architecture:
//! - bridge.toml: single source of truth (BRIDGE_* env vars override keys)
//! - build.rs: validation, backend selection, code generation
//! - Generated code: `$OUT_DIR/bridge_config.rs` holding [`BRIDGE`]
//! - Everything here is `const`; there is no runtime configuration
//!
//! Safety: no state, nothing to synchronize.

pub use crate::backend::select::{
    validate, BackendKind, BridgeConfig, ConfigError, FlowPins, Selection, UartPort,
    MAX_CHUNK_SIZE, SOFT_BAUD_CEILING,
};

include!(concat!(env!("OUT_DIR"), "/bridge_config.rs"));

/// Backend chosen for [`BRIDGE`].
pub const SELECTION: Selection = crate::backend::select::select(&BRIDGE);

/// Capacity of each direction's transfer chunk.
pub const CHUNK_SIZE: usize = BRIDGE.chunk_size;

// build.rs already rejects bad configs; this keeps the constant honest if the
// generated file is ever produced some other way.
const _: () = assert!(validate(&BRIDGE).is_ok(), "invalid bridge configuration");
