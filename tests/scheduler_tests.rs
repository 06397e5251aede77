//! Context loops, flow-control mirroring and relay logging

mod common;

use common::{HostEvent, MockHost, PinLevels, SerialInput, SerialOutput, StepClock};
use std::cell::RefCell;
use std::rc::Rc;
use usb_uart_bridge::log_drain::{LogDrain, LogSink};
use usb_uart_bridge::logging::{LogLevel, LogStream};
use usb_uart_bridge::scheduler::DROP_REPORT_INTERVAL_US;
use usb_uart_bridge::{
    FlowControlMirror, InboundContext, InboundOutcome, LineState, OutboundContext, OutboundOutcome,
    SpinLimit,
};

#[derive(Clone, Default)]
struct Lines(Rc<RefCell<Vec<String>>>);

impl LogSink for Lines {
    fn write_line(&mut self, line: &[u8]) -> bool {
        self.0.borrow_mut().push(String::from_utf8_lossy(line).into_owned());
        true
    }
}

#[test]
fn test_context_a_services_before_every_relay() {
    let log = LogStream::new();
    let host = MockHost::default();
    let serial = SerialInput::default();
    let mut ctx = InboundContext::<_, _, _, (), 64>::new(
        host.clone(),
        serial.clone(),
        StepClock::new(10),
        &log,
        None,
    );

    serial.feed(b"hi");
    assert_eq!(ctx.tick(), InboundOutcome::Forwarded(2));
    assert_eq!(ctx.tick(), InboundOutcome::Idle);

    let events = host.events.borrow();
    assert_eq!(
        *events,
        vec![
            HostEvent::Service,
            HostEvent::Write(b"hi".to_vec()),
            HostEvent::Flush,
            HostEvent::Service,
        ]
    );
}

#[test]
fn test_line_state_change_during_service_reaches_pins() {
    let log = LogStream::new();
    let host = MockHost::default();
    let levels = PinLevels::default();

    // The USB stack reports DTR/RTS changes from inside service()
    let mirror = Rc::new(RefCell::new(FlowControlMirror::new(levels.clone())));
    let states = Rc::new(RefCell::new(vec![
        LineState::from_dtr_rts(true, false),
        LineState::from_dtr_rts(false, true),
        LineState::from_dtr_rts(true, true),
    ]));
    {
        let mirror = Rc::clone(&mirror);
        let states = Rc::clone(&states);
        host.on_service(move || {
            if !states.borrow().is_empty() {
                let state = states.borrow_mut().remove(0);
                mirror.borrow_mut().on_line_state_change(state);
            }
        });
    }

    let mut ctx = InboundContext::<_, _, _, (), 64>::new(
        host.clone(),
        SerialInput::default(),
        StepClock::new(10),
        &log,
        None,
    );

    ctx.tick();
    assert_eq!((levels.ready.get(), levels.present.get()), (Some(true), Some(false)));
    ctx.tick();
    assert_eq!((levels.ready.get(), levels.present.get()), (Some(false), Some(true)));
    ctx.tick();
    assert_eq!((levels.ready.get(), levels.present.get()), (Some(true), Some(true)));
}

#[test]
fn test_drops_are_reported_periodically() {
    let inbound_log = LogStream::new();
    let host = MockHost::default();
    let serial = SerialInput::default();
    let mut ctx = InboundContext::<_, _, _, (), 64>::new(
        host.clone(),
        serial.clone(),
        StepClock::new(DROP_REPORT_INTERVAL_US / 2),
        &inbound_log,
        None,
    );

    host.writable.set(false);
    serial.feed(&[0u8; 10]);
    assert_eq!(ctx.tick(), InboundOutcome::Dropped(10)); // t = 0.5 interval
    assert_eq!(inbound_log.pending(), 0);

    ctx.tick(); // t = 1.0 interval
    let entry = inbound_log.drain().expect("drop report");
    assert_eq!(entry.level, LogLevel::Warn);
    assert!(entry.text().contains("dropped 10 bytes"), "{}", entry.text());

    // Nothing new dropped: no further report
    ctx.tick();
    ctx.tick();
    assert!(inbound_log.drain().is_none());
    assert_eq!(ctx.relay().dropped_bytes(), 10);
}

#[test]
fn test_context_a_drains_both_rings_to_sink() {
    let inbound_log = LogStream::new();
    let outbound_log = LogStream::new();
    let lines = Lines::default();

    outbound_log.push(5, LogLevel::Info, b"outbound relay running on core 1");

    let drain = LogDrain::new(lines.clone(), &inbound_log, &outbound_log);
    let mut ctx = InboundContext::<_, _, _, _, 64>::new(
        MockHost::default(),
        SerialInput::default(),
        StepClock::new(10),
        &inbound_log,
        Some(drain),
    );

    ctx.tick();

    let written = lines.0.borrow();
    assert_eq!(written.len(), 1);
    assert!(written[0].ends_with("INFO: outbound relay running on core 1\n"));
}

#[test]
fn test_context_b_logs_stall_and_delivers() {
    let outbound_log = LogStream::new();
    let host = MockHost::default();
    let serial = SerialOutput::with_busy_polls(50);
    let mut ctx = OutboundContext::<_, _, _, 16>::new(
        host.clone(),
        serial.clone(),
        StepClock::new(1),
        SpinLimit::ReportAfter(20),
        &outbound_log,
    );

    host.send_to_device(b"ok");
    assert_eq!(ctx.tick(), OutboundOutcome::Sent(2));
    assert_eq!(ctx.tick(), OutboundOutcome::Idle);

    assert_eq!(serial.sent(), b"ok".to_vec());
    assert_eq!(ctx.relay().stalls(), 2);

    let first = outbound_log.drain().expect("stall report");
    assert_eq!(first.level, LogLevel::Warn);
    assert!(first.text().ends_with("chunk byte 0"), "{}", first.text());
    let second = outbound_log.drain().expect("stall report");
    assert!(second.text().ends_with("chunk byte 1"), "{}", second.text());
}

#[test]
fn test_context_b_unbounded_spin_is_silent() {
    let outbound_log = LogStream::new();
    let host = MockHost::default();
    let mut ctx = OutboundContext::<_, _, _, 16>::new(
        host.clone(),
        SerialOutput::with_busy_polls(10_000),
        StepClock::new(1),
        SpinLimit::Unbounded,
        &outbound_log,
    );

    host.send_to_device(b"z");
    assert_eq!(ctx.tick(), OutboundOutcome::Sent(1));
    assert_eq!(outbound_log.pending(), 0);
    assert_eq!(ctx.relay().stalls(), 0);
}

/// Log output whose TX ring never has room.
struct FullOutput;

impl LogSink for FullOutput {
    fn write_line(&mut self, _line: &[u8]) -> bool {
        false
    }
}

#[test]
fn test_full_log_output_does_not_hold_up_context_a() {
    let inbound_log = LogStream::new();
    let outbound_log = LogStream::new();
    let host = MockHost::default();
    let serial = SerialInput::default();

    for i in 0..10 {
        outbound_log.push(i, LogLevel::Info, b"chatty");
    }

    let drain = LogDrain::new(FullOutput, &inbound_log, &outbound_log);
    let mut ctx = InboundContext::<_, _, _, _, 64>::new(
        host.clone(),
        serial.clone(),
        StepClock::new(10),
        &inbound_log,
        Some(drain),
    );

    for chunk in b"every tick still relays".chunks(4) {
        serial.feed(chunk);
        assert_eq!(ctx.tick(), InboundOutcome::Forwarded(chunk.len()));
    }

    assert_eq!(host.received(), b"every tick still relays".to_vec());
    assert_eq!(outbound_log.pending(), 0, "refused lines still leave the ring");
}
