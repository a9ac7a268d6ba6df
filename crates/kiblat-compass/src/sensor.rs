//! Device orientation sensor
//!
//! Push-based heading source with optional permission gating.
//!
//! Providers fan samples out through a [`SensorHub`]. Each subscriber holds a
//! [`Subscription`]; dropping it unregisters the subscriber, so samples pushed
//! after teardown reach nobody.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use smol::channel::{self, Receiver, Sender};
use smol::future;
use smol::stream::Stream;

use crate::CompassError;
use crate::heading::{HeadingSample, HeadingSource};

/// What the platform offers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorCapability {
    /// No orientation sensor
    Unsupported,
    /// Sensor readable without asking
    Available,
    /// Sensor readable after the user consents
    RequiresPermission,
}

/// Result of a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    Denied,
    /// The permission mechanism itself is missing or broken
    Unavailable,
}

/// Raw device orientation event
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeviceOrientation {
    pub alpha: Option<f64>, // Z axis, compass heading
    pub beta: Option<f64>,  // X axis
    pub gamma: Option<f64>, // Y axis
    pub absolute: bool,
}

/// Orientation capability
#[allow(async_fn_in_trait)]
pub trait OrientationProvider {
    fn capability(&self) -> SensorCapability;

    /// Ask for consent to read orientation.
    ///
    /// Repeated calls return the first outcome without prompting again.
    async fn request_permission(&self) -> PermissionOutcome;

    /// Register a new subscriber.
    fn subscribe(&self) -> Result<Subscription, CompassError>;
}

/// Gate permission, then subscribe exactly once.
pub async fn connect<O: OrientationProvider>(provider: &O) -> Result<Subscription, CompassError> {
    match provider.capability() {
        SensorCapability::Unsupported => {
            tracing::warn!("Orientation sensor not supported");
            return Err(CompassError::SensorUnsupported);
        }
        SensorCapability::Available => {}
        SensorCapability::RequiresPermission => match provider.request_permission().await {
            PermissionOutcome::Granted => {}
            PermissionOutcome::Denied => {
                tracing::warn!("Orientation permission denied");
                return Err(CompassError::PermissionDenied);
            }
            PermissionOutcome::Unavailable => {
                tracing::warn!("Orientation permission mechanism unavailable");
                return Err(CompassError::SensorUnsupported);
            }
        },
    }
    let subscription = provider.subscribe()?;
    tracing::debug!("Subscribed to orientation events");
    Ok(subscription)
}

// ============================================================================
// SUBSCRIPTION
// ============================================================================

type SubscriberId = u64;

/// Live stream of heading samples
///
/// Unsubscribes on drop.
pub struct Subscription {
    stream: Pin<Box<dyn Stream<Item = HeadingSample>>>,
    release: Option<Release>,
}

impl Subscription {
    /// Wrap a stream that needs no hub registration.
    pub fn from_stream(stream: impl Stream<Item = HeadingSample> + 'static) -> Self {
        Self {
            stream: Box::pin(stream),
            release: None,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.release.as_ref().map(|r| r.id))
            .finish()
    }
}

impl Stream for Subscription {
    type Item = HeadingSample;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.as_mut().poll_next(cx)
    }
}

struct Release {
    hub: Weak<RefCell<HubInner>>,
    id: SubscriberId,
}

impl Drop for Release {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.borrow_mut().subscribers.remove(&self.id);
        }
    }
}

// ============================================================================
// HUB
// ============================================================================

#[derive(Debug, Default)]
struct HubInner {
    subscribers: HashMap<SubscriberId, Sender<HeadingSample>>,
    next_id: SubscriberId,
}

/// Fan-out of samples to live subscribers
#[derive(Debug, Clone, Default)]
pub struct SensorHub {
    inner: Rc<RefCell<HubInner>>,
}

impl SensorHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = channel::unbounded();
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.insert(id, tx);
            id
        };
        Subscription {
            stream: Box::pin(rx),
            release: Some(Release {
                hub: Rc::downgrade(&self.inner),
                id,
            }),
        }
    }

    /// Send a sample to every subscriber; returns how many received it.
    pub fn dispatch(&self, sample: HeadingSample) -> usize {
        let mut inner = self.inner.borrow_mut();
        inner
            .subscribers
            .retain(|_, tx| tx.try_send(sample).is_ok());
        inner.subscribers.len()
    }

    /// End every subscriber's stream.
    pub fn close(&self) {
        self.inner.borrow_mut().subscribers.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

// ============================================================================
// PLATFORM EVENT BRIDGE
// ============================================================================

/// Orientation provider fed by the host's event loop
///
/// Host glue forwards each platform orientation event to
/// [`EventOrientation::dispatch`]. When a permission request starts, the hook
/// installed with [`EventOrientation::with_prompt`] runs once; the host shows
/// its dialog and reports the answer through
/// [`EventOrientation::resolve_permission`].
pub struct EventOrientation {
    capability: SensorCapability,
    outcome: Cell<Option<PermissionOutcome>>,
    prompted: Cell<bool>,
    on_prompt: Option<Box<dyn Fn()>>,
    answered_tx: Sender<()>,
    answered_rx: Receiver<()>,
    hub: SensorHub,
}

impl EventOrientation {
    pub fn new(capability: SensorCapability) -> Self {
        let (answered_tx, answered_rx) = channel::bounded(1);
        Self {
            capability,
            outcome: Cell::new(None),
            prompted: Cell::new(false),
            on_prompt: None,
            answered_tx,
            answered_rx,
            hub: SensorHub::new(),
        }
    }

    /// Install the hook that asks the user for permission.
    ///
    /// It runs at most once, when the first unanswered request starts. It may
    /// call [`EventOrientation::resolve_permission`] directly.
    pub fn with_prompt(mut self, prompt: impl Fn() + 'static) -> Self {
        self.on_prompt = Some(Box::new(prompt));
        self
    }

    pub fn unsupported() -> Self {
        Self::new(SensorCapability::Unsupported)
    }

    pub fn available() -> Self {
        Self::new(SensorCapability::Available)
    }

    pub fn requires_permission() -> Self {
        Self::new(SensorCapability::RequiresPermission)
    }

    /// Forward a platform event. Returns the number of subscribers reached.
    pub fn dispatch(&self, event: DeviceOrientation) -> usize {
        self.hub.dispatch(HeadingSample {
            alpha: event.alpha,
            source: HeadingSource::Sensor,
        })
    }

    /// Record the user's answer and wake pending requests.
    ///
    /// Only the first answer counts.
    pub fn resolve_permission(&self, granted: bool) {
        if self.outcome.get().is_some() {
            return;
        }
        let outcome = if granted {
            PermissionOutcome::Granted
        } else {
            PermissionOutcome::Denied
        };
        self.outcome.set(Some(outcome));
        self.answered_tx.close();
    }

    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }
}

impl fmt::Debug for EventOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventOrientation")
            .field("capability", &self.capability)
            .field("outcome", &self.outcome.get())
            .field("prompted", &self.prompted.get())
            .field("subscribers", &self.hub.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl OrientationProvider for EventOrientation {
    fn capability(&self) -> SensorCapability {
        self.capability
    }

    async fn request_permission(&self) -> PermissionOutcome {
        match self.capability {
            SensorCapability::Unsupported => return PermissionOutcome::Unavailable,
            SensorCapability::Available => return PermissionOutcome::Granted,
            SensorCapability::RequiresPermission => {}
        }
        if let Some(outcome) = self.outcome.get() {
            return outcome;
        }
        if !self.prompted.replace(true) {
            tracing::debug!("Prompting for orientation permission");
            if let Some(prompt) = &self.on_prompt {
                prompt();
            }
        }
        // Closed by resolve_permission; an error here means "answered".
        let _ = self.answered_rx.recv().await;
        self.outcome.get().unwrap_or(PermissionOutcome::Unavailable)
    }

    fn subscribe(&self) -> Result<Subscription, CompassError> {
        match self.capability {
            SensorCapability::Unsupported => Err(CompassError::SensorUnsupported),
            SensorCapability::RequiresPermission
                if self.outcome.get() != Some(PermissionOutcome::Granted) =>
            {
                Err(CompassError::PermissionDenied)
            }
            _ => Ok(self.hub.subscribe()),
        }
    }
}

// ============================================================================
// TEST DOUBLE
// ============================================================================

/// Scripted orientation provider for tests and demos
///
/// The permission prompt answers itself with a preset outcome after one
/// scheduler yield. Prompts and subscriptions are counted.
#[derive(Debug)]
pub struct FakeOrientation {
    capability: SensorCapability,
    answer: PermissionOutcome,
    outcome: Cell<Option<PermissionOutcome>>,
    answered_tx: Sender<()>,
    answered_rx: Receiver<()>,
    prompts: Cell<usize>,
    subscriptions: Cell<usize>,
    hub: SensorHub,
}

impl FakeOrientation {
    fn with(capability: SensorCapability, answer: PermissionOutcome) -> Self {
        let (answered_tx, answered_rx) = channel::bounded(1);
        Self {
            capability,
            answer,
            outcome: Cell::new(None),
            answered_tx,
            answered_rx,
            prompts: Cell::new(0),
            subscriptions: Cell::new(0),
            hub: SensorHub::new(),
        }
    }

    /// Sensor readable without a prompt
    pub fn granted() -> Self {
        Self::with(SensorCapability::Available, PermissionOutcome::Granted)
    }

    /// No sensor at all
    pub fn unsupported() -> Self {
        Self::with(SensorCapability::Unsupported, PermissionOutcome::Unavailable)
    }

    /// Sensor behind a prompt that answers `answer`
    pub fn prompting(answer: PermissionOutcome) -> Self {
        Self::with(SensorCapability::RequiresPermission, answer)
    }

    /// Emit a heading. Returns the number of subscribers reached.
    pub fn emit(&self, alpha: f64) -> usize {
        self.hub.dispatch(HeadingSample::sensor(alpha))
    }

    /// Emit an event without a heading value.
    pub fn emit_empty(&self) -> usize {
        self.hub.dispatch(HeadingSample::empty(HeadingSource::Sensor))
    }

    pub fn close(&self) {
        self.hub.close();
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.get()
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscriptions.get()
    }

    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    fn answer_prompt(&self) {
        if self.outcome.get().is_none() {
            self.outcome.set(Some(self.answer));
        }
        self.answered_tx.close();
    }
}

/// Answers the open prompt when dropped, even if the asking future is not
/// polled to completion.
struct OpenPrompt<'a>(&'a FakeOrientation);

impl Drop for OpenPrompt<'_> {
    fn drop(&mut self) {
        self.0.answer_prompt();
    }
}

impl OrientationProvider for FakeOrientation {
    fn capability(&self) -> SensorCapability {
        self.capability
    }

    async fn request_permission(&self) -> PermissionOutcome {
        match self.capability {
            SensorCapability::Unsupported => return PermissionOutcome::Unavailable,
            SensorCapability::Available => return PermissionOutcome::Granted,
            SensorCapability::RequiresPermission => {}
        }
        if let Some(outcome) = self.outcome.get() {
            return outcome;
        }
        if self.prompts.get() > 0 {
            // Another request has the prompt open.
            let _ = self.answered_rx.recv().await;
            return self.outcome.get().unwrap_or(self.answer);
        }
        self.prompts.set(1);
        let prompt = OpenPrompt(self);
        future::yield_now().await;
        drop(prompt);
        self.outcome.get().unwrap_or(self.answer)
    }

    fn subscribe(&self) -> Result<Subscription, CompassError> {
        match self.capability {
            SensorCapability::Unsupported => return Err(CompassError::SensorUnsupported),
            SensorCapability::RequiresPermission
                if self.outcome.get() != Some(PermissionOutcome::Granted) =>
            {
                return Err(CompassError::PermissionDenied);
            }
            _ => {}
        }
        self.subscriptions.set(self.subscriptions.get() + 1);
        Ok(self.hub.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol::stream::StreamExt;

    #[test]
    fn test_hub_fans_out() {
        smol::block_on(async {
            let hub = SensorHub::new();
            let mut a = hub.subscribe();
            let mut b = hub.subscribe();
            assert_eq!(hub.dispatch(HeadingSample::sensor(5.0)), 2);
            assert_eq!(a.next().await, Some(HeadingSample::sensor(5.0)));
            assert_eq!(b.next().await, Some(HeadingSample::sensor(5.0)));
        });
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = SensorHub::new();
        let sub = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.dispatch(HeadingSample::sensor(1.0)), 0);
    }

    #[test]
    fn test_close_ends_streams() {
        smol::block_on(async {
            let hub = SensorHub::new();
            let mut sub = hub.subscribe();
            hub.close();
            assert_eq!(sub.next().await, None);
        });
    }

    #[test]
    fn test_connect_unsupported() {
        let sensor = FakeOrientation::unsupported();
        let result = smol::block_on(connect(&sensor));
        assert_eq!(result.unwrap_err(), CompassError::SensorUnsupported);
        assert_eq!(sensor.subscribe_count(), 0);
    }

    #[test]
    fn test_connect_denied_never_subscribes() {
        let sensor = FakeOrientation::prompting(PermissionOutcome::Denied);
        let result = smol::block_on(connect(&sensor));
        assert_eq!(result.unwrap_err(), CompassError::PermissionDenied);
        assert_eq!(sensor.subscribe_count(), 0);
        assert_eq!(sensor.prompt_count(), 1);
    }

    #[test]
    fn test_connect_unavailable_is_unsupported() {
        let sensor = FakeOrientation::prompting(PermissionOutcome::Unavailable);
        let result = smol::block_on(connect(&sensor));
        assert_eq!(result.unwrap_err(), CompassError::SensorUnsupported);
    }

    #[test]
    fn test_connect_granted_subscribes_once() {
        let sensor = FakeOrientation::prompting(PermissionOutcome::Granted);
        let sub = smol::block_on(connect(&sensor)).unwrap();
        assert_eq!(sensor.subscribe_count(), 1);
        assert_eq!(sensor.subscriber_count(), 1);
        drop(sub);
        assert_eq!(sensor.subscriber_count(), 0);
    }

    #[test]
    fn test_permission_is_idempotent() {
        let sensor = FakeOrientation::prompting(PermissionOutcome::Denied);
        smol::block_on(async {
            assert_eq!(sensor.request_permission().await, PermissionOutcome::Denied);
            assert_eq!(sensor.request_permission().await, PermissionOutcome::Denied);
        });
        assert_eq!(sensor.prompt_count(), 1);
    }

    #[test]
    fn test_event_bridge_waits_for_answer() {
        smol::block_on(async {
            let sensor = EventOrientation::requires_permission();
            assert!(sensor.subscribe().is_err());

            let request = sensor.request_permission();
            let answer = async {
                future::yield_now().await;
                sensor.resolve_permission(true);
                future::pending::<PermissionOutcome>().await
            };
            assert_eq!(future::or(request, answer).await, PermissionOutcome::Granted);

            // Later answers are ignored.
            sensor.resolve_permission(false);
            assert_eq!(sensor.request_permission().await, PermissionOutcome::Granted);

            let mut sub = sensor.subscribe().unwrap();
            let event = DeviceOrientation {
                alpha: Some(270.0),
                ..Default::default()
            };
            assert_eq!(sensor.dispatch(event), 1);
            assert_eq!(sub.next().await.and_then(|s| s.alpha), Some(270.0));
        });
    }

    #[test]
    fn test_event_bridge_unsupported() {
        let sensor = EventOrientation::unsupported();
        assert_eq!(
            smol::block_on(sensor.request_permission()),
            PermissionOutcome::Unavailable
        );
        assert_eq!(sensor.subscribe().unwrap_err(), CompassError::SensorUnsupported);
    }

    #[test]
    fn test_overlapping_requests_prompt_once() {
        let sensor = FakeOrientation::prompting(PermissionOutcome::Granted);
        let (a, b) = smol::block_on(future::zip(
            sensor.request_permission(),
            sensor.request_permission(),
        ));
        assert_eq!(a, PermissionOutcome::Granted);
        assert_eq!(b, PermissionOutcome::Granted);
        assert_eq!(sensor.prompt_count(), 1);
    }

    #[test]
    fn test_abandoned_prompt_still_answers() {
        let sensor = FakeOrientation::prompting(PermissionOutcome::Denied);
        smol::block_on(async {
            assert!(future::poll_once(sensor.request_permission()).await.is_none());
            assert_eq!(sensor.request_permission().await, PermissionOutcome::Denied);
        });
        assert_eq!(sensor.prompt_count(), 1);
    }

    #[test]
    fn test_event_bridge_prompt_hook_runs_once() {
        let prompts = Rc::new(Cell::new(0));
        let counter = prompts.clone();
        let sensor = EventOrientation::requires_permission()
            .with_prompt(move || counter.set(counter.get() + 1));

        smol::block_on(async {
            let requests = future::zip(sensor.request_permission(), sensor.request_permission());
            let host = async {
                while prompts.get() == 0 {
                    future::yield_now().await;
                }
                sensor.resolve_permission(true);
            };
            let ((a, b), ()) = future::zip(requests, host).await;
            assert_eq!(a, PermissionOutcome::Granted);
            assert_eq!(b, PermissionOutcome::Granted);
            assert_eq!(sensor.request_permission().await, PermissionOutcome::Granted);
        });
        assert_eq!(prompts.get(), 1);
    }

    #[test]
    fn test_event_bridge_prompt_hook_may_answer_inline() {
        let answer = Rc::new(RefCell::new(None::<Weak<EventOrientation>>));
        let slot = answer.clone();
        let sensor = Rc::new(EventOrientation::requires_permission().with_prompt(move || {
            if let Some(sensor) = slot.borrow().as_ref().and_then(Weak::upgrade) {
                sensor.resolve_permission(false);
            }
        }));
        *answer.borrow_mut() = Some(Rc::downgrade(&sensor));

        let result = smol::block_on(connect(&*sensor));
        assert_eq!(result.unwrap_err(), CompassError::PermissionDenied);
    }

    #[test]
    fn test_available_sensor_never_prompts() {
        let prompts = Rc::new(Cell::new(0));
        let counter = prompts.clone();
        let sensor =
            EventOrientation::available().with_prompt(move || counter.set(counter.get() + 1));
        let _sub = smol::block_on(connect(&sensor)).unwrap();
        assert_eq!(prompts.get(), 0);
    }
}
