//! Busy-wait primitive.
//!
//! The outbound relay waits for serial TX capacity by spinning. This is the
//! backpressure path from the serial line to the host: Context B stalls,
//! USB eventually NAKs the host, and no byte is lost.
//!
//! There is no timeout. A dead serial line stalls Context B forever;
//! [`SpinLimit::ReportAfter`] only makes that stall visible.

/// How long to spin before surfacing a stall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinLimit {
    /// Spin silently until the condition holds.
    Unbounded,
    /// Report a stall after this many failed polls, then keep spinning.
    ReportAfter(u32),
}

impl SpinLimit {
    /// Zero means never report.
    pub const fn from_spins(spins: u32) -> Self {
        if spins == 0 {
            SpinLimit::Unbounded
        } else {
            SpinLimit::ReportAfter(spins)
        }
    }
}

/// Result of a single [`spin_until`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinOutcome {
    Ready,
    /// Limit reached with the condition still false.
    Stalled,
}

/// Spin until `ready()` holds or the limit is reached.
#[inline]
pub fn spin_until(mut ready: impl FnMut() -> bool, limit: SpinLimit) -> SpinOutcome {
    match limit {
        SpinLimit::Unbounded => {
            while !ready() {
                core::hint::spin_loop();
            }
            SpinOutcome::Ready
        }
        SpinLimit::ReportAfter(max) => {
            let mut spins = 0u32;
            while !ready() {
                spins += 1;
                if spins >= max {
                    return SpinOutcome::Stalled;
                }
                core::hint::spin_loop();
            }
            SpinOutcome::Ready
        }
    }
}

/// Spin until `ready()` holds. Calls `on_stall` at most once, when the limit
/// is first reached, and then keeps waiting without a limit.
///
/// Returns `true` if a stall was reported.
#[inline]
pub fn spin_until_reporting(
    mut ready: impl FnMut() -> bool,
    limit: SpinLimit,
    on_stall: impl FnOnce(),
) -> bool {
    match spin_until(&mut ready, limit) {
        SpinOutcome::Ready => false,
        SpinOutcome::Stalled => {
            on_stall();
            spin_until(ready, SpinLimit::Unbounded);
            true
        }
    }
}
