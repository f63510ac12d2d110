//! Periodic telemetry cadence.
//!
//! One gate covers both metrics: when it opens the caller publishes the
//! light level and the Fahrenheit temperature together.

use crate::app::ports::SensorPort;
use crate::config::RoundingMode;
use crate::error::SensorError;

/// One telemetry report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryReport {
    pub light_level: u16,
    pub temperature_f: i32,
}

/// `round(C * 1.8 + 32)` in double precision, matching the peer nodes,
/// under the given half-rounding convention.
pub fn fahrenheit(celsius: f32, mode: RoundingMode) -> i32 {
    let f = f64::from(celsius) * 1.8 + 32.0;
    let rounded = match mode {
        RoundingMode::HalfEven => f.round_ties_even(),
        RoundingMode::HalfAwayFromZero => f.round(),
    };
    rounded as i32
}

pub struct TelemetryPublisher {
    last_sent_at: u64,
    interval_ms: u64,
    rounding: RoundingMode,
}

impl TelemetryPublisher {
    /// The first report is due `interval_ms` after `start_ms`.
    pub fn new(start_ms: u64, interval_ms: u32, rounding: RoundingMode) -> Self {
        Self {
            last_sent_at: start_ms,
            interval_ms: u64::from(interval_ms),
            rounding,
        }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_sent_at) >= self.interval_ms
    }

    /// Produce a report if one is due.  Temperature is only read when the
    /// gate is open; a failed read leaves the gate open for the next tick.
    pub fn tick(
        &mut self,
        now_ms: u64,
        light_level: u16,
        sensors: &mut impl SensorPort,
    ) -> Result<Option<TelemetryReport>, SensorError> {
        if !self.is_due(now_ms) {
            return Ok(None);
        }
        let celsius = sensors.read_temperature_celsius()?;
        self.last_sent_at = now_ms;
        Ok(Some(TelemetryReport {
            light_level,
            temperature_f: fahrenheit(celsius, self.rounding),
        }))
    }

    pub fn last_sent_at(&self) -> u64 {
        self.last_sent_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::gesture::Gesture;

    struct FixedTemp(Result<f32, SensorError>);

    impl SensorPort for FixedTemp {
        fn read_light(&mut self) -> Result<u16, SensorError> {
            Ok(0)
        }
        fn read_gesture(&mut self) -> Result<Option<Gesture>, SensorError> {
            Ok(None)
        }
        fn read_temperature_celsius(&mut self) -> Result<f32, SensorError> {
            self.0
        }
    }

    #[test]
    fn celsius_conversion() {
        assert_eq!(fahrenheit(21.11, RoundingMode::HalfEven), 70);
        assert_eq!(fahrenheit(21.11, RoundingMode::HalfAwayFromZero), 70);
        assert_eq!(fahrenheit(0.0, RoundingMode::HalfEven), 32);
        assert_eq!(fahrenheit(100.0, RoundingMode::HalfEven), 212);
        assert_eq!(fahrenheit(-40.0, RoundingMode::HalfEven), -40);
    }

    #[test]
    fn half_boundaries_diverge() {
        // 22.5 °C → 72.5 °F exactly.
        assert_eq!(fahrenheit(22.5, RoundingMode::HalfEven), 72);
        assert_eq!(fahrenheit(22.5, RoundingMode::HalfAwayFromZero), 73);
        // -17.5 °C → 0.5 °F
        assert_eq!(fahrenheit(-17.5, RoundingMode::HalfEven), 0);
        assert_eq!(fahrenheit(-17.5, RoundingMode::HalfAwayFromZero), 1);
    }

    #[test]
    fn matches_peer_formula_across_sensor_range() {
        for tenth in -550..=1500 {
            let c = tenth as f32 / 10.0;
            let f = f64::from(c) * 1.8 + 32.0;
            assert_eq!(fahrenheit(c, RoundingMode::HalfEven), f.round_ties_even() as i32, "{c}");
            assert_eq!(fahrenheit(c, RoundingMode::HalfAwayFromZero), f.round() as i32, "{c}");
        }
    }

    #[test]
    fn fires_on_interval_never_early() {
        let mut t = TelemetryPublisher::new(0, 30_000, RoundingMode::HalfEven);
        let mut s = FixedTemp(Ok(21.11));
        let mut fired = Vec::new();
        let mut now = 0;
        while now <= 95_000 {
            if let Some(r) = t.tick(now, 1234, &mut s).unwrap() {
                assert_eq!(r.light_level, 1234);
                assert_eq!(r.temperature_f, 70);
                fired.push(now);
            }
            now += 10;
        }
        assert_eq!(fired, vec![30_000, 60_000, 90_000]);
    }

    #[test]
    fn failed_read_keeps_gate_open() {
        let mut t = TelemetryPublisher::new(0, 1_000, RoundingMode::HalfEven);
        let mut bad = FixedTemp(Err(SensorError::BusError));
        assert_eq!(t.tick(1_000, 0, &mut bad), Err(SensorError::BusError));
        assert!(t.is_due(1_010));
        let mut good = FixedTemp(Ok(20.0));
        assert!(t.tick(1_010, 0, &mut good).unwrap().is_some());
        assert_eq!(t.last_sent_at(), 1_010);
    }
}
