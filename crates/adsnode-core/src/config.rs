//! Node configuration
//!
//! Everything the reporter needs to know about its wiring lives here as plain
//! data: which converters sit at which I2C addresses, which global channel
//! indices they own, what each channel is called in the payload and where the
//! payload goes. [`ReporterConfig::DEFAULT`] reproduces the production node.

use core::net::Ipv4Addr;

use thiserror_no_std::Error;

use crate::link::JoinPolicy;
use crate::sensors::{CHANNEL_COUNT, DataRate, Gain};

/// Upper bound on the number of channels a single report can carry.
pub const MAX_CHANNELS: usize = 32;

/// Path the sensor payload is posted to.
pub const SENSOR_DATA_PATH: &str = "/api/sensor-data";

/// Default interval between report cycles.
pub const DEFAULT_INTERVAL_MS: u64 = 60_000;

/// WiFi credentials for the station interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

/// One analog-to-digital converter on the I2C bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// 7-bit I2C address.
    pub address: u8,
    /// Number of single-ended channels sampled on this device.
    pub channel_count: u8,
    /// Global channel index of this device's channel 0.
    pub base_index: usize,
    /// Programmable gain, which fixes the millivolt-per-LSB factor.
    pub gain: Gain,
    pub data_rate: DataRate,
}

impl DeviceDescriptor {
    pub const fn new(address: u8, channel_count: u8, base_index: usize) -> Self {
        Self {
            address,
            channel_count,
            base_index,
            gain: Gain::TwoThirds,
            data_rate: DataRate::Sps128,
        }
    }

    /// Global channel indices owned by this device.
    pub const fn channels(&self) -> core::ops::Range<usize> {
        self.base_index..self.base_index + self.channel_count as usize
    }

    pub const fn owns(&self, channel: usize) -> bool {
        channel >= self.base_index && channel < self.base_index + self.channel_count as usize
    }
}

/// The four ADS1115 converters of the production node.
pub const DEFAULT_DEVICES: [DeviceDescriptor; 4] = [
    DeviceDescriptor::new(0x48, 4, 0),
    DeviceDescriptor::new(0x49, 4, 4),
    DeviceDescriptor::new(0x4A, 4, 8),
    DeviceDescriptor::new(0x4B, 4, 12),
];

/// Payload field names, indexed by global channel. Order is the payload order.
pub const DEFAULT_LABELS: [&str; 16] = [
    "X1", "X2", "Y1", "Y2", "Z1", "Z2", "D1", "D2", "P1", "P2", "P3", "P4", "P5", "EX1", "EX2",
    "EX3",
];

/// Where report payloads are posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    pub host: Ipv4Addr,
    pub port: u16,
    pub path: &'a str,
}

impl Endpoint<'static> {
    pub const DEFAULT: Self = Self {
        host: Ipv4Addr::new(172, 16, 26, 53),
        port: 5176,
        path: SENSOR_DATA_PATH,
    };
}

/// Bounds applied to every network operation of a report cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetTimeouts {
    pub connect_ms: u64,
    /// Applied to each individual write and read.
    pub io_ms: u64,
}

impl NetTimeouts {
    pub const DEFAULT: Self = Self {
        connect_ms: 10_000,
        io_ms: 10_000,
    };
}

impl Default for NetTimeouts {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReporterConfig<'a> {
    pub devices: &'a [DeviceDescriptor],
    pub labels: &'a [&'a str],
    pub endpoint: Endpoint<'a>,
    pub interval_ms: u64,
    pub timeouts: NetTimeouts,
    pub join: JoinPolicy,
}

impl ReporterConfig<'static> {
    pub const DEFAULT: Self = Self {
        devices: &DEFAULT_DEVICES,
        labels: &DEFAULT_LABELS,
        endpoint: Endpoint::DEFAULT,
        interval_ms: DEFAULT_INTERVAL_MS,
        timeouts: NetTimeouts::DEFAULT,
        join: JoinPolicy::DEFAULT,
    };
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no converters configured")]
    NoDevices,
    #[error("converter 0x{address:02x} has no channels")]
    EmptyDevice { address: u8 },
    #[error("converter 0x{address:02x} has {channel_count} channels, at most 4 are wired")]
    TooManyDeviceChannels { address: u8, channel_count: u8 },
    #[error("converter address 0x{address:02x} is used twice")]
    DuplicateAddress { address: u8 },
    #[error("channel {channel} is not owned by exactly one converter")]
    ChannelCoverage { channel: usize },
    #[error("{channels} channels exceed the report capacity")]
    TooManyChannels { channels: usize },
    #[error("{labels} labels configured for {channels} channels")]
    LabelCount { labels: usize, channels: usize },
    #[error("label for channel {channel} is empty")]
    EmptyLabel { channel: usize },
    #[error("label for channel {channel} duplicates an earlier label")]
    DuplicateLabel { channel: usize },
    #[error("report interval must be non-zero")]
    ZeroInterval,
}

impl ReporterConfig<'_> {
    /// Total number of channels across all converters.
    pub fn channel_count(&self) -> usize {
        self.devices.iter().map(|d| d.channel_count as usize).sum()
    }

    /// Index into [`Self::devices`] of the converter that owns `channel`.
    pub fn device_for(&self, channel: usize) -> Option<usize> {
        self.devices.iter().position(|d| d.owns(channel))
    }

    /// Check that the devices tile `0..channel_count()` exactly once and that
    /// every channel has a distinct, non-empty label.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.devices.is_empty() {
            return Err(ConfigError::NoDevices);
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        for (i, device) in self.devices.iter().enumerate() {
            if device.channel_count == 0 {
                return Err(ConfigError::EmptyDevice {
                    address: device.address,
                });
            }
            if device.channel_count > CHANNEL_COUNT {
                return Err(ConfigError::TooManyDeviceChannels {
                    address: device.address,
                    channel_count: device.channel_count,
                });
            }
            if self.devices[..i].iter().any(|d| d.address == device.address) {
                return Err(ConfigError::DuplicateAddress {
                    address: device.address,
                });
            }
        }

        let channels = self.channel_count();
        if channels > MAX_CHANNELS {
            return Err(ConfigError::TooManyChannels { channels });
        }

        for channel in 0..channels {
            let owners = self.devices.iter().filter(|d| d.owns(channel)).count();
            if owners != 1 {
                return Err(ConfigError::ChannelCoverage { channel });
            }
        }
        // A device reaching past the last channel leaves a hole somewhere below.
        if let Some(device) = self.devices.iter().find(|d| d.channels().end > channels) {
            return Err(ConfigError::ChannelCoverage {
                channel: device.channels().end - 1,
            });
        }

        if self.labels.len() != channels {
            return Err(ConfigError::LabelCount {
                labels: self.labels.len(),
                channels,
            });
        }
        for (channel, label) in self.labels.iter().enumerate() {
            if label.is_empty() {
                return Err(ConfigError::EmptyLabel { channel });
            }
            if self.labels[..channel].contains(label) {
                return Err(ConfigError::DuplicateLabel { channel });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_valid() {
        let config = ReporterConfig::DEFAULT;
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.channel_count(), 16);
    }

    #[test]
    fn test_default_channel_ownership() {
        let config = ReporterConfig::DEFAULT;
        for channel in 0..16 {
            let device = config.device_for(channel).unwrap();
            assert_eq!(device, channel / 4);
            assert_eq!(
                channel - config.devices[device].base_index,
                channel % 4,
                "sub-channel of channel {channel}"
            );
        }
        assert_eq!(config.device_for(16), None);
    }

    #[test]
    fn test_default_addresses() {
        let addresses: [u8; 4] = core::array::from_fn(|i| DEFAULT_DEVICES[i].address);
        assert_eq!(addresses, [0x48, 0x49, 0x4A, 0x4B]);
    }

    #[test]
    fn test_overlapping_devices_rejected() {
        let devices = [DeviceDescriptor::new(0x48, 4, 0), DeviceDescriptor::new(0x49, 4, 2)];
        let labels = ["a", "b", "c", "d", "e", "f"];
        let config = ReporterConfig {
            devices: &devices,
            labels: &labels,
            ..ReporterConfig::DEFAULT
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ChannelCoverage { channel: 2 })
        );
    }

    #[test]
    fn test_device_wider_than_converter_rejected() {
        let devices = [DeviceDescriptor::new(0x48, 5, 0)];
        let labels = ["a", "b", "c", "d", "e"];
        let config = ReporterConfig {
            devices: &devices,
            labels: &labels,
            ..ReporterConfig::DEFAULT
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooManyDeviceChannels {
                address: 0x48,
                channel_count: 5
            })
        );
    }

    #[test]
    fn test_gap_between_devices_rejected() {
        let devices = [DeviceDescriptor::new(0x48, 2, 0), DeviceDescriptor::new(0x49, 2, 3)];
        let labels = ["a", "b", "c", "d"];
        let config = ReporterConfig {
            devices: &devices,
            labels: &labels,
            ..ReporterConfig::DEFAULT
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ChannelCoverage { channel: 2 })
        );
    }

    #[test]
    fn test_label_table_checked() {
        let short = ["X1", "X2"];
        let config = ReporterConfig {
            labels: &short,
            ..ReporterConfig::DEFAULT
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::LabelCount {
                labels: 2,
                channels: 16
            })
        );

        let devices = [DeviceDescriptor::new(0x48, 2, 0)];
        let duplicate = ["X1", "X1"];
        let config = ReporterConfig {
            devices: &devices,
            labels: &duplicate,
            ..ReporterConfig::DEFAULT
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateLabel { channel: 1 })
        );
    }

    #[test]
    fn test_duplicate_address_rejected() {
        let devices = [DeviceDescriptor::new(0x48, 1, 0), DeviceDescriptor::new(0x48, 1, 1)];
        let labels = ["a", "b"];
        let config = ReporterConfig {
            devices: &devices,
            labels: &labels,
            ..ReporterConfig::DEFAULT
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateAddress { address: 0x48 })
        );
    }

    #[test]
    fn test_smaller_layout_is_valid() {
        let devices = [DeviceDescriptor::new(0x48, 3, 0), DeviceDescriptor::new(0x49, 1, 3)];
        let labels = ["a", "b", "c", "d"];
        let config = ReporterConfig {
            devices: &devices,
            labels: &labels,
            ..ReporterConfig::DEFAULT
        };
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.device_for(3), Some(1));
    }
}
