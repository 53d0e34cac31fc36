//! Hardware-independent core library for adsnode
//!
//! This crate contains all platform-agnostic logic for the analog telemetry
//! node: the channel layout and label table, raw-to-millivolt conversion, the
//! ADS1115 driver, form payload and HTTP request framing, the report schedule,
//! WiFi join supervision and the reporter that ties one report cycle together.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod app_state;
pub mod async_i2c_bus;
pub mod config;
pub mod http;
pub mod link;
pub mod report;
pub mod reporter;
pub mod schedule;
pub mod sensors;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;
