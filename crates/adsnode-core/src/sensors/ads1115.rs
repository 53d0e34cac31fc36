use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{debug, error};

use super::{AnalogSensor, SensorError};

// =============================================================================
// I2C Addresses
// =============================================================================

/// ADDR pin tied to GND
pub const ADDR_GND: u8 = 0x48;
/// ADDR pin tied to VDD
pub const ADDR_VDD: u8 = 0x49;
/// ADDR pin tied to SDA
pub const ADDR_SDA: u8 = 0x4A;
/// ADDR pin tied to SCL
pub const ADDR_SCL: u8 = 0x4B;

// =============================================================================
// Register Pointers
// =============================================================================

pub const REG_CONVERSION: u8 = 0x00;
pub const REG_CONFIG: u8 = 0x01;

// =============================================================================
// Config Register Fields
// =============================================================================

/// Write: start a single conversion. Read: 1 when no conversion is running.
pub const CONFIG_OS: u16 = 0x8000;
/// MUX base for AINx vs GND; the channel number occupies bits 12-13.
pub const CONFIG_MUX_SINGLE: u16 = 0x4000;
pub const CONFIG_MODE_SINGLE_SHOT: u16 = 0x0100;
pub const CONFIG_COMP_QUEUE_DISABLE: u16 = 0x0003;

/// Number of single-ended inputs (AIN0..AIN3)
pub const CHANNEL_COUNT: u8 = 4;

/// Number of times the OS bit is polled after the nominal conversion time.
const READY_POLL_ATTEMPTS: u8 = 10;
const READY_POLL_INTERVAL_US: u32 = 1_000;

const SENSOR_NAME: &str = "ADS1115";

// =============================================================================
// Enums
// =============================================================================

/// Programmable gain amplifier setting (full-scale range).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Gain {
    /// ±6.144 V, 0.1875 mV/LSB
    TwoThirds = 0x0000,
    /// ±4.096 V, 0.125 mV/LSB
    One = 0x0200,
    /// ±2.048 V, 0.0625 mV/LSB
    Two = 0x0400,
    /// ±1.024 V, 0.03125 mV/LSB
    Four = 0x0600,
    /// ±0.512 V, 0.015625 mV/LSB
    Eight = 0x0800,
    /// ±0.256 V, 0.0078125 mV/LSB
    Sixteen = 0x0A00,
}

impl Gain {
    /// Size of one LSB in picovolts (exact for every gain).
    pub const fn lsb_picovolts(self) -> u64 {
        match self {
            Self::TwoThirds => 187_500_000,
            Self::One => 125_000_000,
            Self::Two => 62_500_000,
            Self::Four => 31_250_000,
            Self::Eight => 15_625_000,
            Self::Sixteen => 7_812_500,
        }
    }

    pub const fn to_register(self) -> u16 {
        self as u16
    }
}

/// Conversion rate in samples per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum DataRate {
    Sps8 = 0x0000,
    Sps16 = 0x0020,
    Sps32 = 0x0040,
    Sps64 = 0x0060,
    Sps128 = 0x0080,
    Sps250 = 0x00A0,
    Sps475 = 0x00C0,
    Sps860 = 0x00E0,
}

impl DataRate {
    pub const fn samples_per_second(self) -> u32 {
        match self {
            Self::Sps8 => 8,
            Self::Sps16 => 16,
            Self::Sps32 => 32,
            Self::Sps64 => 64,
            Self::Sps128 => 128,
            Self::Sps250 => 250,
            Self::Sps475 => 475,
            Self::Sps860 => 860,
        }
    }

    /// Nominal duration of one conversion, rounded up.
    pub const fn conversion_time_us(self) -> u32 {
        1_000_000_u32.div_ceil(self.samples_per_second())
    }

    pub const fn to_register(self) -> u16 {
        self as u16
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Async single-shot driver for the TI ADS1115 16-bit ADC.
pub struct Ads1115<I, D> {
    i2c: I,
    delay: D,
    address: u8,
    gain: Gain,
    data_rate: DataRate,
}

impl<I: I2c, D: DelayNs> Ads1115<I, D> {
    pub fn new(i2c: I, delay: D, address: u8, gain: Gain) -> Self {
        Self {
            i2c,
            delay,
            address,
            gain,
            data_rate: DataRate::Sps128,
        }
    }

    pub fn with_data_rate(mut self, data_rate: DataRate) -> Self {
        self.data_rate = data_rate;
        self
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Config word that starts a single-shot conversion of AIN`channel` vs GND.
    pub const fn single_shot_config(&self, channel: u8) -> u16 {
        CONFIG_OS
            | CONFIG_MUX_SINGLE
            | ((channel as u16 & 0x03) << 12)
            | self.gain.to_register()
            | CONFIG_MODE_SINGLE_SHOT
            | self.data_rate.to_register()
            | CONFIG_COMP_QUEUE_DISABLE
    }

    async fn write_register(&mut self, register: u8, value: u16) -> Result<(), I::Error> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c.write(self.address, &[register, hi, lo]).await
    }

    async fn read_register(&mut self, register: u8) -> Result<u16, I::Error> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .await?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read_failed(&self, operation: &'static str) -> SensorError {
        SensorError::ReadFailed {
            sensor: SENSOR_NAME,
            address: self.address,
            operation,
            details: "I2C communication error",
        }
    }

    async fn wait_for_conversion(&mut self) -> Result<(), SensorError> {
        self.delay
            .delay_us(self.data_rate.conversion_time_us())
            .await;

        for _ in 0..READY_POLL_ATTEMPTS {
            let config = self.read_register(REG_CONFIG).await.map_err(|e| {
                error!("ADS1115 0x{:02x} status read failed: {:?}", self.address, e);
                self.read_failed("poll conversion status")
            })?;
            if config & CONFIG_OS != 0 {
                return Ok(());
            }
            self.delay.delay_us(READY_POLL_INTERVAL_US).await;
        }

        Err(SensorError::Timeout {
            sensor: SENSOR_NAME,
            address: self.address,
            operation: "complete conversion",
        })
    }
}

impl<I: I2c, D: DelayNs> AnalogSensor for Ads1115<I, D> {
    async fn init(&mut self) -> Result<(), SensorError> {
        let config = self.read_register(REG_CONFIG).await.map_err(|e| {
            error!("ADS1115 0x{:02x} probe failed: {:?}", self.address, e);
            SensorError::InitializationFailed {
                sensor: SENSOR_NAME,
                address: self.address,
                details: "device did not acknowledge config register read",
            }
        })?;
        debug!("ADS1115 0x{:02x} config register: 0x{:04x}", self.address, config);
        Ok(())
    }

    async fn read_single_ended(&mut self, channel: u8) -> Result<i16, SensorError> {
        if channel >= CHANNEL_COUNT {
            return Err(SensorError::InvalidChannel {
                sensor: SENSOR_NAME,
                channel,
            });
        }

        let config = self.single_shot_config(channel);
        self.write_register(REG_CONFIG, config).await.map_err(|e| {
            error!("ADS1115 0x{:02x} config write failed: {:?}", self.address, e);
            self.read_failed("start conversion")
        })?;

        self.wait_for_conversion().await?;

        let raw = self.read_register(REG_CONVERSION).await.map_err(|e| {
            error!("ADS1115 0x{:02x} conversion read failed: {:?}", self.address, e);
            self.read_failed("read conversion result")
        })?;

        Ok(raw as i16)
    }
}
