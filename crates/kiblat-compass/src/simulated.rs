//! Simulated heading for devices without an orientation sensor
//!
//! Every sample is tagged [`HeadingSource::Simulated`](crate::HeadingSource)
//! so surfaces can tell it apart from real sensor data.

use std::time::Duration;

use smol::Timer;
use smol::stream::StreamExt;

use crate::CompassError;
use crate::config::DemoConfig;
use crate::heading::HeadingSample;
use crate::sensor::{OrientationProvider, PermissionOutcome, SensorCapability, Subscription};

/// Timer-driven heading that sweeps clockwise at a fixed rate
#[derive(Debug, Clone, Copy)]
pub struct SimulatedOrientation {
    step_degrees: f64,
    interval: Duration,
}

impl SimulatedOrientation {
    pub fn new(step_degrees: f64, interval: Duration) -> Self {
        Self {
            step_degrees,
            interval,
        }
    }

    pub fn from_config(demo: &DemoConfig) -> Self {
        Self::new(demo.step_degrees, Duration::from_millis(demo.interval_ms))
    }

    /// Heading emitted on the given tick
    pub fn heading_at(&self, tick: usize) -> f64 {
        (tick as f64 * self.step_degrees).rem_euclid(360.0)
    }
}

impl OrientationProvider for SimulatedOrientation {
    fn capability(&self) -> SensorCapability {
        SensorCapability::Available
    }

    async fn request_permission(&self) -> PermissionOutcome {
        PermissionOutcome::Granted
    }

    fn subscribe(&self) -> Result<Subscription, CompassError> {
        let sim = *self;
        let stream = Timer::interval(self.interval)
            .enumerate()
            .map(move |(tick, _)| HeadingSample::simulated(sim.heading_at(tick)));
        Ok(Subscription::from_stream(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heading::HeadingSource;

    #[test]
    fn test_sweep_wraps() {
        let sim = SimulatedOrientation::new(100.0, Duration::from_millis(10));
        assert_eq!(sim.heading_at(0), 0.0);
        assert_eq!(sim.heading_at(3), 300.0);
        assert_eq!(sim.heading_at(4), 40.0);
    }

    #[test]
    fn test_samples_are_tagged() {
        let sim = SimulatedOrientation::new(3.0, Duration::from_millis(1));
        let mut sub = sim.subscribe().unwrap();
        let first = smol::block_on(sub.next()).unwrap();
        assert_eq!(first.source, HeadingSource::Simulated);
        assert_eq!(first.alpha, Some(0.0));
        let second = smol::block_on(sub.next()).unwrap();
        assert_eq!(second.alpha, Some(3.0));
    }
}
