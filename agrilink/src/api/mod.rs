//! Public API module.
//!
//! This module contains the high-level user-facing API for the `agrilink` crate.

pub mod config;
pub mod field_assistant;
pub mod models;
