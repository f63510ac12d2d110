//! LightLink node firmware library.
//!
//! Exposes the pure-logic modules for integration testing and the host
//! simulator. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod detect;
pub mod error;
pub mod feeds;
pub mod pins;
pub mod router;
pub mod scheduler;

pub mod adapters;
pub mod drivers;
pub mod sensors;
