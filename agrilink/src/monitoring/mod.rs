//! Ambient device state: connectivity and location.
//!
//! Both are modelled as injected providers with a pull accessor and a
//! watch-based subscription, so tests can substitute fixed values.

pub mod location;
pub mod network;
