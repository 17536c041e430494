//! Washer control-plane library.
//!
//! Exposes the control plane for the firmware binary and for host
//! integration tests.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module, with an in-memory
//! simulation on every other target.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod motion;
pub mod pins;
pub mod plan;
pub mod programs;
pub mod state;
pub mod tasks;
pub mod ui;
