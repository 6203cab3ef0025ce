#![allow(dead_code)]

use agrilink::{Coordinates, DeviceDescriptor, DeviceProbe, ProbeFailure};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a stubbed address behaves.
#[derive(Clone)]
pub struct Reply {
    pub delay: Duration,
    pub device: Option<DeviceDescriptor>,
}

/// A probe with scripted replies that counts calls and in-flight probes.
///
/// Unscripted addresses never answer: they run into their timeout, or hang
/// until cancelled when `ignore_timeouts` is set.
#[derive(Default)]
pub struct StubProbe {
    replies: HashMap<String, Reply>,
    ignore_timeouts: bool,
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
}

/// Decrements the in-flight counter when a probe finishes or is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl StubProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, address: &str, delay: Duration, device: DeviceDescriptor) -> Self {
        self.replies.insert(
            address.to_string(),
            Reply {
                delay,
                device: Some(device),
            },
        );
        self
    }

    /// Makes unanswered probes hang past their timeout.
    pub fn ignoring_timeouts(mut self) -> Self {
        self.ignore_timeouts = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceProbe for StubProbe {
    async fn probe(
        &self,
        address: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<DeviceDescriptor, ProbeFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.in_flight);

        let reply = self.replies.get(address).cloned().unwrap_or(Reply {
            delay: Duration::from_secs(3600),
            device: None,
        });
        let wait = if self.ignore_timeouts {
            reply.delay
        } else {
            reply.delay.min(timeout)
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(ProbeFailure),
            _ = tokio::time::sleep(wait) => {
                if reply.delay <= timeout || self.ignore_timeouts {
                    reply.device.ok_or(ProbeFailure)
                } else {
                    Err(ProbeFailure)
                }
            }
        }
    }
}

pub fn descriptor(ip: &str, hostname: Option<&str>, device_type: &str, rssi: Option<i32>) -> DeviceDescriptor {
    DeviceDescriptor {
        hostname: hostname.map(str::to_string),
        ip_address: ip.to_string(),
        device_type: device_type.to_string(),
        signal_strength: rssi,
        mac_address: None,
    }
}

pub fn colombo() -> Coordinates {
    Coordinates {
        latitude: 6.9271,
        longitude: 79.8612,
    }
}

/// Serves `router` on an ephemeral localhost port.
pub async fn spawn_stub(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// An address on which nothing is listening.
pub async fn closed_port() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
