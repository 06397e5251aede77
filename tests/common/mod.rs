//! In-memory doubles for the serial line, the USB host port and the clock.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use usb_uart_bridge::{Clock, ControlLines, HostRx, HostService, HostTx, SerialRx, SerialTx};

/// Serial input as seen by the RX half.
#[derive(Clone, Default)]
pub struct SerialInput(pub Rc<RefCell<VecDeque<u8>>>);

impl SerialInput {
    pub fn feed(&self, bytes: &[u8]) {
        self.0.borrow_mut().extend(bytes.iter().copied());
    }

    pub fn pending(&self) -> usize {
        self.0.borrow().len()
    }
}

impl SerialRx for SerialInput {
    fn byte_available(&mut self) -> bool {
        !self.0.borrow().is_empty()
    }

    fn read_byte(&mut self) -> u8 {
        self.0.borrow_mut().pop_front().expect("read_byte without byte_available")
    }
}

/// Serial output; reports "busy" for `busy_polls` polls before every byte.
#[derive(Clone, Default)]
pub struct SerialOutput {
    pub sent: Rc<RefCell<Vec<u8>>>,
    pub busy_polls: u32,
    countdown: u32,
}

impl SerialOutput {
    pub fn with_busy_polls(busy_polls: u32) -> Self {
        Self {
            busy_polls,
            countdown: busy_polls,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<u8> {
        self.sent.borrow().clone()
    }
}

impl SerialTx for SerialOutput {
    fn write_capacity(&mut self) -> bool {
        if self.countdown > 0 {
            self.countdown -= 1;
            false
        } else {
            true
        }
    }

    fn write_byte(&mut self, byte: u8) {
        assert_eq!(self.countdown, 0, "write_byte while the queue is full");
        self.sent.borrow_mut().push(byte);
        self.countdown = self.busy_polls;
    }
}

/// Host port operations, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Service,
    Write(Vec<u8>),
    Flush,
    Read(usize),
}

/// USB host double. Clones share state.
#[derive(Clone)]
pub struct MockHost {
    pub events: Rc<RefCell<Vec<HostEvent>>>,
    pub writable: Rc<Cell<bool>>,
    pub to_device: Rc<RefCell<VecDeque<u8>>>,
    on_service: Rc<RefCell<Option<Box<dyn FnMut()>>>>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            events: Rc::default(),
            writable: Rc::new(Cell::new(true)),
            to_device: Rc::default(),
            on_service: Rc::default(),
        }
    }
}

impl MockHost {
    /// Run `f` inside every `service()` call, like a stack callback.
    pub fn on_service(&self, f: impl FnMut() + 'static) {
        *self.on_service.borrow_mut() = Some(Box::new(f));
    }

    pub fn send_to_device(&self, bytes: &[u8]) {
        self.to_device.borrow_mut().extend(bytes.iter().copied());
    }

    /// Concatenation of everything written to the host.
    pub fn received(&self) -> Vec<u8> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Write(data) => Some(data.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Write(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn reads(&self) -> Vec<usize> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Read(n) => Some(*n),
                _ => None,
            })
            .collect()
    }
}

impl HostService for MockHost {
    fn service(&mut self) {
        self.events.borrow_mut().push(HostEvent::Service);
        if let Some(f) = self.on_service.borrow_mut().as_mut() {
            f();
        }
    }
}

impl HostTx for MockHost {
    fn write_available(&mut self) -> bool {
        self.writable.get()
    }

    fn write(&mut self, data: &[u8]) {
        self.events.borrow_mut().push(HostEvent::Write(data.to_vec()));
    }

    fn flush(&mut self) {
        self.events.borrow_mut().push(HostEvent::Flush);
    }
}

impl HostRx for MockHost {
    fn available(&mut self) -> bool {
        !self.to_device.borrow().is_empty()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut queue = self.to_device.borrow_mut();
        let n = buf.len().min(queue.len());
        for slot in &mut buf[..n] {
            *slot = queue.pop_front().unwrap();
        }
        self.events.borrow_mut().push(HostEvent::Read(n));
        n
    }
}

/// Clock advancing by `step_us` per reading.
pub struct StepClock {
    pub now: i64,
    pub step_us: i64,
}

impl StepClock {
    pub fn new(step_us: i64) -> Self {
        Self { now: 0, step_us }
    }
}

impl Clock for StepClock {
    fn now_us(&mut self) -> i64 {
        self.now += self.step_us;
        self.now
    }
}

/// Output pin levels, shared with the test body.
#[derive(Clone, Default)]
pub struct PinLevels {
    pub ready: Rc<Cell<Option<bool>>>,
    pub present: Rc<Cell<Option<bool>>>,
}

impl ControlLines for PinLevels {
    fn set_ready(&mut self, level: bool) {
        self.ready.set(Some(level));
    }

    fn set_present(&mut self, level: bool) {
        self.present.set(Some(level));
    }
}

/// Deterministic pseudo-random bytes (xorshift32).
pub fn pattern(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}
