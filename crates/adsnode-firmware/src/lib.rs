//! ESP32-S3 firmware-specific modules for adsnode
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: ESP32 peripheral initialization, the esp-radio WiFi join loop,
//! the embassy-net TCP transport and the build-time node settings.

#![no_std]

extern crate alloc;

pub mod hardware;
pub mod net;
pub mod settings;
pub mod wifi;
