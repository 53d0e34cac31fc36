mod ads1115;
mod sample;

pub use ads1115::*;
pub use sample::{ChannelSample, Millivolts};

use log::{error, info};
use thiserror_no_std::Error;

use crate::config::DeviceDescriptor;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor} at 0x{address:02x} failed to initialize: {details}")]
    InitializationFailed {
        sensor: &'static str,
        address: u8,
        details: &'static str,
    },
    #[error("{sensor} at 0x{address:02x} failed to {operation}: {details}")]
    ReadFailed {
        sensor: &'static str,
        address: u8,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor} at 0x{address:02x} timed out waiting to {operation}")]
    Timeout {
        sensor: &'static str,
        address: u8,
        operation: &'static str,
    },
    #[error("{sensor} has no single-ended channel {channel}")]
    InvalidChannel { sensor: &'static str, channel: u8 },
}

/// Trait for multi-channel analog converters.
pub trait AnalogSensor {
    /// Probe the device and bring it into a readable state.
    fn init(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    /// Run one single-ended conversion on a local channel and return the raw code.
    fn read_single_ended(&mut self, channel: u8) -> impl Future<Output = Result<i16, SensorError>>;
}

/// A converter bound to its place in the channel layout.
///
/// The wrapper owns the ready flag: a device that failed to initialize, or
/// whose last read failed, is not read from again until a probe succeeds.
/// Channels of a device that is not ready yield `None` instead of a raw code.
pub struct IndexedSensor<S> {
    sensor: S,
    descriptor: DeviceDescriptor,
    ready: bool,
}

impl<S: AnalogSensor> IndexedSensor<S> {
    pub const fn new(sensor: S, descriptor: DeviceDescriptor) -> Self {
        Self {
            sensor,
            descriptor,
            ready: false,
        }
    }

    pub const fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    /// Initialize the device if it is not ready yet. Returns the ready flag.
    pub async fn ensure_ready(&mut self) -> bool {
        if self.ready {
            return true;
        }

        match self.sensor.init().await {
            Ok(()) => {
                info!("Converter 0x{:02x} ready", self.descriptor.address);
                self.ready = true;
            }
            Err(e) => {
                error!("Converter 0x{:02x} init failed: {}", self.descriptor.address, e);
            }
        }
        self.ready
    }

    /// Read one of this device's channels, addressed by its global index.
    pub async fn read_channel(&mut self, channel: usize) -> Option<i16> {
        if !self.ready || !self.descriptor.owns(channel) {
            return None;
        }

        let local = (channel - self.descriptor.base_index) as u8;
        match self.sensor.read_single_ended(local).await {
            Ok(raw) => Some(raw),
            Err(e) => {
                error!("Failed to read channel {}: {}", channel, e);
                self.ready = false;
                None
            }
        }
    }
}
