//! Geolocation
//!
//! One-shot position lookup behind an injectable provider.

use std::cell::Cell;

use smol::channel::{self, Receiver, Sender};

use crate::geo::Coordinates;

/// Geolocation error
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("User denied geolocation permission")]
    PermissionDenied,

    #[error("Position unavailable")]
    PositionUnavailable,

    #[error("Geolocation request timed out")]
    Timeout,

    #[error("Geolocation not supported")]
    Unsupported,
}

/// Position capability
#[allow(async_fn_in_trait)]
pub trait PositionProvider {
    /// Resolve the observer's current position once.
    async fn current_position(&self) -> Result<Coordinates, PositionError>;
}

/// Provider that always answers with known coordinates
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition {
    coords: Coordinates,
}

impl FixedPosition {
    pub fn new(coords: Coordinates) -> Self {
        Self { coords }
    }
}

impl PositionProvider for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        Ok(self.coords)
    }
}

/// Scripted provider for tests
///
/// A gated provider holds every request until [`FakePosition::release`].
#[derive(Debug)]
pub struct FakePosition {
    result: Result<Coordinates, PositionError>,
    gate: Option<(Sender<()>, Receiver<()>)>,
    requests: Cell<usize>,
}

impl FakePosition {
    /// Answer immediately.
    pub fn ready(result: Result<Coordinates, PositionError>) -> Self {
        Self {
            result,
            gate: None,
            requests: Cell::new(0),
        }
    }

    /// Answer once released.
    pub fn gated(result: Result<Coordinates, PositionError>) -> Self {
        Self {
            result,
            gate: Some(channel::bounded(1)),
            requests: Cell::new(0),
        }
    }

    pub fn release(&self) {
        if let Some((tx, _)) = &self.gate {
            tx.close();
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.get()
    }
}

impl PositionProvider for FakePosition {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        self.requests.set(self.requests.get() + 1);
        if let Some((_, rx)) = &self.gate {
            // Resolves with an error once the gate closes.
            let _ = rx.recv().await;
        }
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol::future::{self, FutureExt};

    #[test]
    fn test_fixed_position() {
        let coords = Coordinates::new(-6.2, 106.8);
        let provider = FixedPosition::new(coords);
        assert_eq!(smol::block_on(provider.current_position()), Ok(coords));
    }

    #[test]
    fn test_fake_error() {
        let provider = FakePosition::ready(Err(PositionError::PermissionDenied));
        assert_eq!(
            smol::block_on(provider.current_position()),
            Err(PositionError::PermissionDenied)
        );
        assert_eq!(provider.request_count(), 1);
    }

    #[test]
    fn test_gated_waits_for_release() {
        let coords = Coordinates::new(1.0, 2.0);
        let provider = FakePosition::gated(Ok(coords));
        smol::block_on(async {
            let still_pending = future::poll_once(provider.current_position()).await;
            assert!(still_pending.is_none());

            let release = async {
                future::yield_now().await;
                provider.release();
                future::pending().await
            };
            assert_eq!(provider.current_position().or(release).await, Ok(coords));
        });
    }
}
