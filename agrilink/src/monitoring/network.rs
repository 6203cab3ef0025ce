//! Connectivity snapshots.
//!
//! The platform layer (connectivity callbacks on a phone, NetworkManager on a
//! Linux box) pushes snapshots into a [`WatchNetworkInfo`]; the scanner only
//! ever pulls the latest one through [`NetworkInfoProvider::current`].

use log::debug;
use tokio::sync::watch;

use crate::api::models::NetworkSnapshot;

/// Source of the current connectivity state.
///
/// `None` means the state is unknown, which callers treat like "not
/// suitable" rather than as an error.
pub trait NetworkInfoProvider: Send + Sync {
    /// Latest known snapshot.
    fn current(&self) -> Option<NetworkSnapshot>;

    /// Receives every subsequent change. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> watch::Receiver<Option<NetworkSnapshot>>;
}

/// A [`NetworkInfoProvider`] backed by a `tokio::sync::watch` channel.
#[derive(Debug)]
pub struct WatchNetworkInfo {
    tx: watch::Sender<Option<NetworkSnapshot>>,
}

impl WatchNetworkInfo {
    pub fn new(initial: Option<NetworkSnapshot>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Replaces the current snapshot and notifies subscribers.
    pub fn publish(&self, snapshot: NetworkSnapshot) {
        debug!(
            "Network changed: {} connected={} ip={:?}",
            snapshot.connection_type, snapshot.is_connected, snapshot.ip_address
        );
        self.tx.send_replace(Some(snapshot));
    }

    /// Marks the state as unknown, e.g. when the platform listener is torn down.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}

impl Default for WatchNetworkInfo {
    fn default() -> Self {
        Self::new(None)
    }
}

impl NetworkInfoProvider for WatchNetworkInfo {
    fn current(&self) -> Option<NetworkSnapshot> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<NetworkSnapshot>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unknown() {
        assert_eq!(WatchNetworkInfo::default().current(), None);
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let provider = WatchNetworkInfo::default();
        let mut rx = provider.subscribe();

        provider.publish(NetworkSnapshot::wifi("192.168.8.10", Some("farm".into())));
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow().as_ref().and_then(|s| s.ssid.clone()),
            Some("farm".to_string())
        );

        provider.clear();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
        assert_eq!(provider.current(), None);
    }

    #[test]
    fn publish_without_subscribers_still_updates() {
        let provider = WatchNetworkInfo::default();
        provider.publish(NetworkSnapshot::other(None));
        assert!(provider.current().is_some());
    }
}
