//! Dual-context scheduling.
//!
//! ```text
//! Core 0 / Context A                     Core 1 / Context B
//! ──────────────────                     ──────────────────
//! loop {                                 loop {
//!     host.service()   ◀─ DTR/RTS cb         outbound.relay(host_rx, serial_tx)
//!     inbound.relay(serial_rx, host_tx)  }
//!     drain logs (bounded)
//! }
//! ```
//!
//! Each context struct owns everything its loop touches. Building the two
//! contexts consumes the split halves, so after start-up no value is
//! reachable from both cores. Neither loop yields and neither ends.

use crate::backend::{SerialRx, SerialTx};
use crate::host::{HostRx, HostService, HostTx};
use crate::log_drain::{LogDrain, LogSink, DRAIN_BUDGET};
use crate::logging::LogStream;
use crate::relay::{InboundOutcome, InboundRelay, OutboundOutcome, OutboundRelay};
use crate::spin::SpinLimit;

/// Interval between inbound drop reports.
pub const DROP_REPORT_INTERVAL_US: i64 = 5_000_000;

/// Microsecond time source for log timestamps.
pub trait Clock {
    fn now_us(&mut self) -> i64;
}

/// Context A: USB servicing interleaved with the inbound relay.
pub struct InboundContext<'a, H, R, C, S, const N: usize> {
    host: H,
    serial: R,
    clock: C,
    relay: InboundRelay<N>,
    log: &'a LogStream,
    drain: Option<LogDrain<'a, S>>,
    reported_dropped: u32,
    last_drop_report: i64,
}

impl<'a, H, R, C, S, const N: usize> InboundContext<'a, H, R, C, S, N>
where
    H: HostService + HostTx,
    R: SerialRx,
    C: Clock,
    S: LogSink,
{
    /// `log` is this context's own ring; `drain`, when present, empties
    /// both rings into the log output.
    pub fn new(host: H, serial: R, clock: C, log: &'a LogStream, drain: Option<LogDrain<'a, S>>) -> Self {
        Self {
            host,
            serial,
            clock,
            relay: InboundRelay::new(),
            log,
            drain,
            reported_dropped: 0,
            last_drop_report: 0,
        }
    }

    /// One loop iteration: service, relay, then log housekeeping.
    pub fn tick(&mut self) -> InboundOutcome {
        self.host.service();
        let outcome = self.relay.relay(&mut self.serial, &mut self.host);

        let now = self.clock.now_us();
        self.report_drops(now);
        if let Some(drain) = self.drain.as_mut() {
            drain.step(now, DRAIN_BUDGET);
        }

        outcome
    }

    fn report_drops(&mut self, now: i64) {
        if now - self.last_drop_report < DROP_REPORT_INTERVAL_US {
            return;
        }
        self.last_drop_report = now;

        let dropped = self.relay.dropped_bytes();
        if dropped != self.reported_dropped {
            crate::ring_warn!(
                self.log,
                now,
                "inbound: host full, dropped {} bytes (total {}, forwarded {})",
                dropped.wrapping_sub(self.reported_dropped),
                dropped,
                self.relay.forwarded_bytes()
            );
            self.reported_dropped = dropped;
        }
    }

    pub fn relay(&self) -> &InboundRelay<N> {
        &self.relay
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn serial_mut(&mut self) -> &mut R {
        &mut self.serial
    }

    /// Context A's loop. Never returns.
    pub fn run(mut self) -> ! {
        loop {
            self.tick();
        }
    }
}

/// Context B: the outbound relay, alone on its core.
pub struct OutboundContext<'a, H, T, C, const N: usize> {
    host: H,
    serial: T,
    clock: C,
    relay: OutboundRelay<N>,
    log: &'a LogStream,
}

impl<'a, H, T, C, const N: usize> OutboundContext<'a, H, T, C, N>
where
    H: HostRx,
    T: SerialTx,
    C: Clock,
{
    pub fn new(host: H, serial: T, clock: C, limit: SpinLimit, log: &'a LogStream) -> Self {
        Self {
            host,
            serial,
            clock,
            relay: OutboundRelay::new(limit),
            log,
        }
    }

    /// One loop iteration.
    pub fn tick(&mut self) -> OutboundOutcome {
        let Self { host, serial, clock, relay, log } = self;

        relay.relay_reporting(host, serial, |index| {
            crate::ring_warn!(log, clock.now_us(), "outbound: serial tx stalled at chunk byte {}", index);
        })
    }

    pub fn relay(&self) -> &OutboundRelay<N> {
        &self.relay
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn serial(&self) -> &T {
        &self.serial
    }

    /// Context B's loop. Never returns, never yields.
    pub fn run(mut self) -> ! {
        loop {
            self.tick();
        }
    }
}
