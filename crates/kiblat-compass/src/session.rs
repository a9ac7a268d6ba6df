//! Compass session
//!
//! Owns the bearing and the smoothed heading for one view and turns both into
//! a needle angle.
//!
//! ```text
//! PositionProvider ──(once)──► Bearing ─────────┐
//!                                               ├─► NeedleRotation ─► RenderSurface
//! OrientationProvider ──(stream)──► Smoothed ───┘
//! ```
//!
//! [`CompassSession::run`] races the position request, the sensor setup and
//! the heading stream on one thread, so a pending request never holds up
//! samples. Dropping the session, or a `run` future still in flight, releases
//! the sensor subscription.

use std::ops::{Deref, DerefMut};

use smol::future::{self, FutureExt};

use crate::CompassError;
use crate::bearing::{Bearing, initial_bearing};
use crate::config::CompassConfig;
use crate::geo::Coordinates;
use crate::geolocation::{PositionError, PositionProvider};
use crate::heading::{HeadingSample, HeadingSource, HeadingTracker, SmoothedHeading};
use crate::needle::{NeedleRotation, needle_rotation};
use crate::sensor::{self, OrientationProvider, Subscription};
use crate::simulated::SimulatedOrientation;

/// Snapshot handed to the rendering surface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompassState {
    position: Option<Coordinates>,
    bearing: Option<Bearing>,
    heading: Option<SmoothedHeading>,
    position_error: Option<CompassError>,
    sensor_error: Option<CompassError>,
}

impl CompassState {
    pub fn position(&self) -> Option<Coordinates> {
        self.position
    }

    pub fn bearing(&self) -> Option<Bearing> {
        self.bearing
    }

    pub fn heading(&self) -> Option<SmoothedHeading> {
        self.heading
    }

    pub fn needle(&self) -> Option<NeedleRotation> {
        needle_rotation(self.bearing, self.heading)
    }

    pub fn position_error(&self) -> Option<&CompassError> {
        self.position_error.as_ref()
    }

    pub fn sensor_error(&self) -> Option<&CompassError> {
        self.sensor_error.as_ref()
    }

    /// True when the heading is a demo sweep rather than a device reading
    pub fn is_simulated(&self) -> bool {
        self.heading
            .is_some_and(|h| h.source == HeadingSource::Simulated)
    }

    pub fn errors(&self) -> impl Iterator<Item = &CompassError> {
        self.position_error.iter().chain(self.sensor_error.iter())
    }
}

/// Receives every state change
pub trait RenderSurface {
    fn present(&mut self, state: &CompassState);
}

impl<F> RenderSurface for F
where
    F: FnMut(&CompassState),
{
    fn present(&mut self, state: &CompassState) {
        self(state)
    }
}

enum Event {
    Position(Result<Coordinates, PositionError>),
    Sensor(Result<Subscription, CompassError>),
    Heading(Option<SmoothedHeading>),
}

/// Detaches the heading stream when a running session is cancelled
struct ReleaseOnDrop<'a>(&'a mut CompassSession);

impl Deref for ReleaseOnDrop<'_> {
    type Target = CompassSession;

    fn deref(&self) -> &CompassSession {
        self.0
    }
}

impl DerefMut for ReleaseOnDrop<'_> {
    fn deref_mut(&mut self) -> &mut CompassSession {
        self.0
    }
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        if self.0.tracker.is_attached() {
            tracing::debug!("Compass session cancelled, releasing sensor");
            self.0.tracker.detach();
        }
    }
}

/// One compass view
#[derive(Debug)]
pub struct CompassSession {
    config: CompassConfig,
    state: CompassState,
    tracker: HeadingTracker,
}

impl CompassSession {
    /// Start a view with `config`, which must pass
    /// [`CompassConfig::validate`].
    pub fn new(config: CompassConfig) -> Result<Self, CompassError> {
        config.validate()?;
        let tracker = HeadingTracker::new(config.smoothing.filter());
        Ok(Self {
            config,
            state: CompassState::default(),
            tracker,
        })
    }

    pub fn config(&self) -> &CompassConfig {
        &self.config
    }

    pub fn state(&self) -> &CompassState {
        &self.state
    }

    /// Apply the position lookup result.
    ///
    /// The position is fixed once known; later results are ignored.
    pub fn on_position(&mut self, result: Result<Coordinates, PositionError>) {
        if self.state.position.is_some() || self.state.position_error.is_some() {
            tracing::debug!("Position already settled, ignoring {:?}", result);
            return;
        }
        match result {
            Ok(coords) => {
                let bearing = initial_bearing(coords, self.config.target);
                tracing::info!("Position {} -> bearing {}", coords, bearing);
                self.state.position = Some(coords);
                self.state.bearing = Some(bearing);
            }
            Err(error) => {
                tracing::warn!("Position lookup failed: {}", error);
                self.state.position_error = Some(error.into());
            }
        }
    }

    /// Apply one heading sample directly.
    pub fn on_sample(&mut self, sample: HeadingSample) -> Option<SmoothedHeading> {
        let heading = self.tracker.ingest(sample)?;
        self.state.heading = Some(heading);
        Some(heading)
    }

    /// Record a sensor failure, switching to the demo sweep when enabled.
    pub fn on_sensor_error(&mut self, error: CompassError) {
        tracing::warn!("Heading unavailable: {}", error);
        let fallback = self.config.demo_fallback
            && matches!(
                error,
                CompassError::SensorUnsupported | CompassError::PermissionDenied
            );
        self.state.sensor_error = Some(error);
        if fallback {
            let demo = SimulatedOrientation::from_config(&self.config.demo);
            match demo.subscribe() {
                Ok(subscription) => {
                    tracing::info!("Using simulated heading");
                    self.tracker.attach(subscription);
                }
                Err(error) => tracing::warn!("Simulated heading failed: {}", error),
            }
        }
    }

    pub fn attach(&mut self, subscription: Subscription) {
        self.tracker.attach(subscription);
    }

    pub fn detach(&mut self) {
        self.tracker.detach();
    }

    /// Apply every queued sample without waiting.
    pub async fn drain(&mut self) -> usize {
        let applied = self.tracker.drain().await;
        if applied > 0 {
            self.state.heading = self.tracker.smoothed();
        }
        applied
    }

    /// Drive the session until the position is settled and no heading
    /// stream remains.
    ///
    /// The surface sees the initial state and every change after it. Dropping
    /// the returned future releases the heading subscription.
    pub async fn run<P, O, R>(&mut self, positions: &P, orientation: &O, surface: &mut R)
    where
        P: PositionProvider,
        O: OrientationProvider,
        R: RenderSurface + ?Sized,
    {
        tracing::info!("Compass session starting");
        let mut session = ReleaseOnDrop(self);
        let mut position = Some(Box::pin(positions.current_position()));
        let mut setup = Some(Box::pin(sensor::connect(orientation)));
        surface.present(&session.state);

        loop {
            if position.is_none() && setup.is_none() && !session.tracker.is_attached() {
                break;
            }

            let event = {
                let tracker = &mut session.tracker;
                let position_next = async {
                    match position.as_mut() {
                        Some(request) => Event::Position(request.await),
                        None => future::pending().await,
                    }
                };
                let setup_next = async {
                    match setup.as_mut() {
                        Some(request) => Event::Sensor(request.await),
                        None => future::pending().await,
                    }
                };
                let heading_next = async {
                    if tracker.is_attached() {
                        Event::Heading(tracker.next().await)
                    } else {
                        future::pending().await
                    }
                };
                position_next.or(setup_next).or(heading_next).await
            };

            match event {
                Event::Position(result) => {
                    position = None;
                    session.on_position(result);
                }
                Event::Sensor(Ok(subscription)) => {
                    setup = None;
                    session.tracker.attach(subscription);
                    continue;
                }
                Event::Sensor(Err(error)) => {
                    setup = None;
                    session.on_sensor_error(error);
                }
                Event::Heading(Some(heading)) => {
                    session.state.heading = Some(heading);
                }
                Event::Heading(None) => {
                    tracing::debug!("Heading stream ended");
                    continue;
                }
            }
            surface.present(&session.state);
        }
        tracing::info!("Compass session finished");
    }

    /// Release the sensor subscription and discard the session.
    pub fn teardown(mut self) {
        self.tracker.detach();
        tracing::debug!("Compass session torn down");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::geo::KAABA;
    use crate::geolocation::FakePosition;
    use crate::sensor::{FakeOrientation, PermissionOutcome};

    const JAKARTA: Coordinates = Coordinates::new(-6.2088, 106.8456);

    #[test]
    fn test_position_is_set_once() {
        let mut session = CompassSession::new(CompassConfig::default()).unwrap();
        session.on_position(Ok(JAKARTA));
        session.on_position(Ok(KAABA));
        assert_eq!(session.state().position(), Some(JAKARTA));
    }

    #[test]
    fn test_needle_needs_both_inputs() {
        let mut session = CompassSession::new(CompassConfig::default()).unwrap();
        session.on_sample(HeadingSample::sensor(10.0));
        assert_eq!(session.state().needle(), None);

        session.on_position(Ok(Coordinates::new(40.0, 39.8262)));
        let needle = session.state().needle().unwrap();
        assert!((needle.degrees() - 170.0).abs() < 1e-9);
    }

    #[test]
    fn test_run_applies_headings_in_order() {
        let positions = FakePosition::ready(Ok(Coordinates::new(40.0, 39.8262)));
        let sensor = FakeOrientation::granted();
        let mut session = CompassSession::new(CompassConfig::default()).unwrap();
        let mut frames = Vec::new();
        let mut surface = |state: &CompassState| frames.push(state.clone());

        smol::block_on(async {
            let driver = async {
                while sensor.subscriber_count() == 0 {
                    future::yield_now().await;
                }
                sensor.emit(0.0);
                sensor.emit(90.0);
                sensor.close();
                future::pending::<()>().await
            };
            session.run(&positions, &sensor, &mut surface).or(driver).await;
        });

        let state = session.state();
        assert!((state.heading().unwrap().degrees - 18.0).abs() < 1e-12);
        assert!((state.needle().unwrap().degrees() - 162.0).abs() < 1e-9);
        assert!(state.errors().next().is_none());
        assert_eq!(sensor.subscribe_count(), 1);
        assert!(frames.first().unwrap().needle().is_none());
        assert_eq!(frames.last().unwrap(), state);
    }

    #[test]
    fn test_run_records_errors_and_finishes() {
        let positions = FakePosition::ready(Err(PositionError::PermissionDenied));
        let sensor = FakeOrientation::unsupported();
        let mut session = CompassSession::new(CompassConfig::default()).unwrap();
        let mut presented = 0;
        let mut surface = |_: &CompassState| presented += 1;

        smol::block_on(session.run(&positions, &sensor, &mut surface));

        let state = session.state();
        assert_eq!(state.bearing(), None);
        assert_eq!(state.needle(), None);
        assert_eq!(
            state.position_error(),
            Some(&CompassError::PositionUnavailable(PositionError::PermissionDenied))
        );
        assert_eq!(state.sensor_error(), Some(&CompassError::SensorUnsupported));
        assert_eq!(presented, 3);
    }

    #[test]
    fn test_samples_flow_while_position_pending() {
        let positions = FakePosition::gated(Ok(JAKARTA));
        let sensor = FakeOrientation::granted();
        let mut session = CompassSession::new(CompassConfig::default()).unwrap();
        let mut frames = Vec::new();
        let mut surface = |state: &CompassState| {
            frames.push((state.bearing().is_some(), state.heading().is_some()))
        };

        smol::block_on(async {
            let driver = async {
                while sensor.subscriber_count() == 0 {
                    future::yield_now().await;
                }
                sensor.emit(10.0);
                for _ in 0..5 {
                    future::yield_now().await;
                }
                positions.release();
                for _ in 0..5 {
                    future::yield_now().await;
                }
                sensor.close();
                future::pending::<()>().await
            };
            session.run(&positions, &sensor, &mut surface).or(driver).await;
        });

        assert!(frames.contains(&(false, true)));
        assert_eq!(frames.last(), Some(&(true, true)));
    }

    #[test]
    fn test_denied_permission_falls_back_to_simulation() {
        let mut config = CompassConfig::default();
        config.demo_fallback = true;
        config.demo.interval_ms = 1;
        let positions = FakePosition::ready(Ok(JAKARTA));
        let sensor = FakeOrientation::prompting(PermissionOutcome::Denied);
        let mut session = CompassSession::new(config).unwrap();
        let mut surface = |_: &CompassState| {};

        smol::block_on(async {
            let stop = async {
                smol::Timer::after(Duration::from_millis(50)).await;
            };
            session.run(&positions, &sensor, &mut surface).or(stop).await;
        });

        let state = session.state();
        assert_eq!(state.sensor_error(), Some(&CompassError::PermissionDenied));
        assert!(state.is_simulated());
        assert_eq!(state.needle().unwrap().source(), HeadingSource::Simulated);
        assert_eq!(sensor.subscribe_count(), 0);
    }

    #[test]
    fn test_teardown_unsubscribes() {
        let sensor = FakeOrientation::granted();
        let mut session = CompassSession::new(CompassConfig::default()).unwrap();
        session.attach(sensor.subscribe().unwrap());
        sensor.emit(10.0);
        smol::block_on(session.drain());
        assert_eq!(session.state().heading().map(|h| h.degrees), Some(10.0));

        session.teardown();
        assert_eq!(sensor.subscriber_count(), 0);
        assert_eq!(sensor.emit(90.0), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = CompassConfig::default();
        config.demo.interval_ms = 0;
        assert!(matches!(
            CompassSession::new(config),
            Err(CompassError::InvalidConfig(_))
        ));

        let mut config = CompassConfig::default();
        config.smoothing.alpha = 0.0;
        assert!(matches!(
            CompassSession::new(config),
            Err(CompassError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_cancelled_run_releases_sensor() {
        let positions = FakePosition::gated(Ok(JAKARTA));
        let sensor = FakeOrientation::granted();
        let mut session = CompassSession::new(CompassConfig::default()).unwrap();
        let mut surface = |_: &CompassState| {};

        smol::block_on(async {
            let stop = async {
                while sensor.subscriber_count() == 0 {
                    future::yield_now().await;
                }
                sensor.emit(30.0);
                for _ in 0..3 {
                    future::yield_now().await;
                }
            };
            session.run(&positions, &sensor, &mut surface).or(stop).await;
        });

        assert_eq!(sensor.subscriber_count(), 0);
        assert_eq!(sensor.emit(60.0), 0);
        assert_eq!(session.state().heading().map(|h| h.degrees), Some(30.0));
    }
}
