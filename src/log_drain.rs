//! Log drain: rings → text lines → log UART.
//!
//! Runs inside Context A, after the inbound relay, with a fixed entry budget
//! per iteration. Sinks never block: a line the output cannot take right
//! now is dropped and counted, so log traffic cannot stall USB servicing.
//!
//! # Hardware Setup
//!
//! ```text
//! ESP32-S3 log_tx_pin (UART2 TX) ──────▶ USB-UART RX
//!                                         └─▶ PC serial monitor
//! ```

use crate::logging::{format_to_buffer, LogEntry, LogStream};

/// Entries written per drain step.
pub const DRAIN_BUDGET: usize = 2;

/// Interval between dropped-entry reports.
pub const DROPPED_REPORT_INTERVAL_US: i64 = 10_000_000;

const LINE_LEN: usize = crate::logging::MAX_MSG_LEN + 32;

/// Where formatted log lines go.
pub trait LogSink {
    /// Queue one line without blocking. Returns `false` if the line was
    /// not taken.
    fn write_line(&mut self, line: &[u8]) -> bool;
}

/// Discards everything.
impl LogSink for () {
    fn write_line(&mut self, _line: &[u8]) -> bool {
        true
    }
}

/// Format log entry to text.
///
/// Format: `[timestamp_us] LEVEL: message\n`
pub fn format_log_entry(entry: &LogEntry, buf: &mut [u8]) -> usize {
    format_to_buffer(
        buf,
        format_args!(
            "[{:10}] {}: {}\n",
            entry.timestamp_us,
            entry.level.as_str(),
            entry.text()
        ),
    )
}

/// Drains both context rings into a sink.
pub struct LogDrain<'a, S> {
    sink: S,
    inbound: &'a LogStream,
    outbound: &'a LogStream,
    last_dropped_report: i64,
    sink_dropped: u32,
}

impl<'a, S: LogSink> LogDrain<'a, S> {
    pub fn new(sink: S, inbound: &'a LogStream, outbound: &'a LogStream) -> Self {
        Self {
            sink,
            inbound,
            outbound,
            last_dropped_report: 0,
            sink_dropped: 0,
        }
    }

    /// Write at most `budget` entries, inbound ring first.
    ///
    /// Returns the number of entries taken from the rings.
    pub fn step(&mut self, now_us: i64, budget: usize) -> usize {
        let mut line = [0u8; LINE_LEN];
        let mut written = 0;

        while written < budget {
            let entry = match self.inbound.drain().or_else(|| self.outbound.drain()) {
                Some(entry) => entry,
                None => break,
            };
            let len = format_log_entry(&entry, &mut line);
            if !self.sink.write_line(&line[..len]) {
                self.sink_dropped = self.sink_dropped.wrapping_add(1);
            }
            written += 1;
        }

        if now_us - self.last_dropped_report >= DROPPED_REPORT_INTERVAL_US {
            let inbound_dropped = self.inbound.dropped();
            let outbound_dropped = self.outbound.dropped();

            let sink_dropped = self.sink_dropped;

            if inbound_dropped > 0 || outbound_dropped > 0 || sink_dropped > 0 {
                let len = format_to_buffer(
                    &mut line,
                    format_args!(
                        "[WARN] log dropped: inbound={}, outbound={}, output={}\n",
                        inbound_dropped, outbound_dropped, sink_dropped
                    ),
                );
                // Counters are kept if the report itself does not fit
                if self.sink.write_line(&line[..len]) {
                    self.inbound.reset_dropped();
                    self.outbound.reset_dropped();
                    self.sink_dropped = 0;
                }
            }

            self.last_dropped_report = now_us;
        }

        written
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Lines the sink refused since the last dropped report.
    pub fn sink_dropped(&self) -> u32 {
        self.sink_dropped
    }
}
