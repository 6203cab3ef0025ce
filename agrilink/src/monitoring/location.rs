//! Last-known device location.

use tokio::sync::watch;

use crate::api::models::Coordinates;

/// Source of the device's coordinates.
///
/// `current()` returns `None` when permission was denied or no fix is
/// available; a connection then proceeds without location.
pub trait LocationProvider: Send + Sync {
    fn current(&self) -> Option<Coordinates>;

    fn subscribe(&self) -> watch::Receiver<Option<Coordinates>>;
}

/// A [`LocationProvider`] fed by the platform's location service.
#[derive(Debug)]
pub struct WatchLocation {
    tx: watch::Sender<Option<Coordinates>>,
}

impl WatchLocation {
    pub fn new(initial: Option<Coordinates>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn publish(&self, fix: Coordinates) {
        self.tx.send_replace(Some(fix));
    }

    /// Forgets the last fix, e.g. after the permission was revoked.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}

impl Default for WatchLocation {
    fn default() -> Self {
        Self::new(None)
    }
}

impl LocationProvider for WatchLocation {
    fn current(&self) -> Option<Coordinates> {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Coordinates>> {
        self.tx.subscribe()
    }
}
