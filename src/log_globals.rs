//! Global log rings, one per relay context.

use crate::logging::LogStream;

/// Written only by Context A (USB servicing + inbound relay, core 0).
pub static INBOUND_LOG: LogStream = LogStream::new();

/// Written only by Context B (outbound relay, core 1).
pub static OUTBOUND_LOG: LogStream = LogStream::new();
