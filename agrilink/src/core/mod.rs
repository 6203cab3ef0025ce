//! Discovery, connection and submission logic.
//!
//! This module contains the probe, the scanner, the sensor session and the
//! HTTP clients for the analysis and weather services.

pub mod probe;
pub mod scan;
pub mod session;
pub mod submission;
pub mod weather;
