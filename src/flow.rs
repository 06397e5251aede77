//! Flow-control mirror: host DTR/RTS → two GPIO outputs.
//!
//! Pure mirroring. No history, no debouncing, no interpretation of what
//! the signals mean to the device on the other end.

/// Control lines as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineState {
    /// Data Terminal Ready.
    pub ready: bool,
    /// Request To Send.
    pub present: bool,
}

impl LineState {
    pub const fn from_dtr_rts(dtr: bool, rts: bool) -> Self {
        Self { ready: dtr, present: rts }
    }
}

/// The two physical output lines.
pub trait ControlLines {
    fn set_ready(&mut self, level: bool);
    fn set_present(&mut self, level: bool);
}

/// Drives [`ControlLines`] from host control-line notifications.
pub struct FlowControlMirror<L> {
    lines: L,
}

impl<L: ControlLines> FlowControlMirror<L> {
    pub fn new(lines: L) -> Self {
        Self { lines }
    }

    /// Called by the USB stack whenever DTR or RTS changes.
    #[inline]
    pub fn on_line_state_change(&mut self, state: LineState) {
        self.lines.set_ready(state.ready);
        self.lines.set_present(state.present);
    }

    pub fn lines(&self) -> &L {
        &self.lines
    }
}
