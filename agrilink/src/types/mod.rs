//! Type definitions and constants.
//!
//! This module contains sensor firmware endpoints, scan defaults and timeouts.

pub(crate) mod constants;
