//! End-to-end test of a host node: real sensor drivers on the simulated
//! I²C bus, the real effect engine on an in-memory strip, and mock
//! transport, clock and event sink.

use crate::mock_ports::{ManualClock, MockTransport, RecordingSink};

use lightlink::adapters::strip_feedback::StripFeedback;
use lightlink::config::NodeConfig;
use lightlink::detect::gesture::Gesture;
use lightlink::drivers::led_patterns::{BLACK, Effect};
use lightlink::drivers::pixel_strip::PixelStrip;
use lightlink::pins;
use lightlink::scheduler::{LinkState, Scheduler};
use lightlink::sensors::SensorHub;
use lightlink::sensors::light::LightSensor;
use lightlink::sensors::sim_bus::SimBus;

type SimNode = Scheduler<SensorHub<SimBus>, MockTransport, StripFeedback, ManualClock, RecordingSink>;

fn node() -> (SimNode, SimBus) {
    let bus = SimBus::new();
    let handle = bus.clone();
    let mut hub = SensorHub::new(bus, LightSensor::new(pins::LIGHT_ADC_CHANNEL));
    hub.init().unwrap();
    let config = NodeConfig::default();
    let strip = StripFeedback::new(
        PixelStrip::new(usize::from(config.pixel_count)),
        config.base_brightness,
    );
    let mut s = Scheduler::new(
        config,
        hub,
        MockTransport::default(),
        strip,
        ManualClock::default(),
        RecordingSink::default(),
    );
    assert_eq!(s.step(), LinkState::Running);
    (s, handle)
}

#[test]
fn swipe_over_sensor_is_published_and_confirmed() {
    let (mut s, bus) = node();
    bus.swipe(Gesture::Right);

    for _ in 0..3 {
        s.step();
        if !s.transport().published_on("local-status").is_empty() {
            break;
        }
    }
    assert_eq!(s.transport().published_on("local-status"), ["right"]);
    assert_eq!(s.feedback().effect(), Effect::SelectionPulse);

    let now = s.clock().now;
    while s.clock().now < now + 10_000 {
        s.step();
    }
    assert_eq!(s.feedback().effect(), Effect::Off);
    assert!(s.feedback().strip().shown().iter().all(|&p| p == BLACK));
}

#[test]
fn thermometer_reading_reaches_temperature_feed() {
    let (mut s, bus) = node();
    bus.set_temperature(25.0);
    while s.clock().now < 30_010 {
        s.step();
    }
    assert_eq!(s.transport().published_on("local-temperature"), ["77"]);
}

#[test]
fn bus_fault_sends_node_through_recovery() {
    let (mut s, bus) = node();
    bus.fail_next(1);
    assert!(matches!(s.step(), LinkState::RecoveringLink { .. }));
    assert_eq!(s.step(), LinkState::Running);
    assert_eq!(s.step(), LinkState::Running);
}
