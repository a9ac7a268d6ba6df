//! Heading tracker
//!
//! Consumes heading samples in arrival order and keeps the smoothed heading.

use smol::future;
use smol::stream::StreamExt;

use crate::sensor::Subscription;
use crate::smoothing::HeadingFilter;

/// Where a heading came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingSource {
    /// Device orientation sensor
    Sensor,
    /// Demo sweep, not a real device reading
    Simulated,
}

/// One raw heading reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingSample {
    /// Compass angle in degrees, `None` when the event carried no value
    pub alpha: Option<f64>,
    pub source: HeadingSource,
}

impl HeadingSample {
    pub fn sensor(alpha: f64) -> Self {
        Self {
            alpha: Some(alpha),
            source: HeadingSource::Sensor,
        }
    }

    pub fn simulated(alpha: f64) -> Self {
        Self {
            alpha: Some(alpha),
            source: HeadingSource::Simulated,
        }
    }

    /// Event without a heading value
    pub fn empty(source: HeadingSource) -> Self {
        Self { alpha: None, source }
    }
}

/// Smoothed heading estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedHeading {
    pub degrees: f64,
    pub source: HeadingSource,
}

/// Heading tracker
///
/// Holds at most one subscription. Dropping the tracker, or calling
/// [`HeadingTracker::detach`], releases it.
#[derive(Debug, Default)]
pub struct HeadingTracker {
    filter: HeadingFilter,
    source: Option<HeadingSource>,
    subscription: Option<Subscription>,
}

impl HeadingTracker {
    pub fn new(filter: HeadingFilter) -> Self {
        Self {
            filter,
            source: None,
            subscription: None,
        }
    }

    /// Apply one sample. Samples without a finite heading are ignored.
    pub fn ingest(&mut self, sample: HeadingSample) -> Option<SmoothedHeading> {
        let alpha = sample.alpha.filter(|a| a.is_finite())?;
        let degrees = self.filter.update(alpha);
        self.source = Some(sample.source);
        Some(SmoothedHeading {
            degrees,
            source: sample.source,
        })
    }

    pub fn smoothed(&self) -> Option<SmoothedHeading> {
        let degrees = self.filter.value()?;
        let source = self.source?;
        Some(SmoothedHeading { degrees, source })
    }

    /// Start consuming a subscription, replacing any previous one.
    pub fn attach(&mut self, subscription: Subscription) {
        if self.subscription.is_some() {
            tracing::debug!("Replacing heading subscription");
        }
        self.subscription = Some(subscription);
    }

    /// Release the subscription. The smoothed value is kept.
    pub fn detach(&mut self) {
        if self.subscription.take().is_some() {
            tracing::debug!("Heading subscription released");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Wait for the next sample that changes the estimate.
    ///
    /// Returns `None` once the stream has closed or nothing is attached.
    pub async fn next(&mut self) -> Option<SmoothedHeading> {
        loop {
            let sample = self.subscription.as_mut()?.next().await;
            match sample {
                Some(sample) => {
                    if let Some(heading) = self.ingest(sample) {
                        return Some(heading);
                    }
                }
                None => {
                    self.detach();
                    return None;
                }
            }
        }
    }

    /// Apply every sample already queued without waiting for more.
    ///
    /// Returns the number of samples that updated the estimate.
    pub async fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Some(subscription) = self.subscription.as_mut() {
            match future::poll_once(subscription.next()).await {
                Some(Some(sample)) => {
                    if self.ingest(sample).is_some() {
                        applied += 1;
                    }
                }
                Some(None) => {
                    self.detach();
                    break;
                }
                None => break,
            }
        }
        applied
    }
}
