//! Peripheral setup for the converter board

use adsnode_core::app_state::NodeError;
use adsnode_core::async_i2c_bus::{AsyncI2cDevice, SharedI2cBus};
use adsnode_core::config::DeviceDescriptor;
use adsnode_core::sensors::{Ads1115, SensorError};
use embassy_sync::mutex::Mutex;
use esp_hal::Async;
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::time::Rate;
use log::{error, info};
use static_cell::StaticCell;

pub type ConverterBus = I2c<'static, Async>;

/// One ADS1115 on the shared bus.
pub type Converter = Ads1115<AsyncI2cDevice<'static, ConverterBus>, embassy_time::Delay>;

/// Create the I2C master the converters hang off (400 kHz fast mode).
pub fn create_i2c_bus(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO12<'static>,
    scl: esp_hal::peripherals::GPIO11<'static>,
) -> Result<ConverterBus, NodeError> {
    let i2c = I2c::new(i2c0, I2cConfig::default().with_frequency(Rate::from_khz(400)))
        .map_err(|e| {
            error!("I2C config rejected: {:?}", e);
            NodeError::Sensor(SensorError::InitializationFailed {
                sensor: "I2C0",
                address: 0,
                details: "bus configuration rejected",
            })
        })?;
    Ok(i2c.with_sda(sda).with_scl(scl).into_async())
}

/// Move the bus into static storage so every converter can hold a handle.
pub fn share_i2c_bus(bus: ConverterBus) -> &'static SharedI2cBus<ConverterBus> {
    static I2C0_BUS: StaticCell<SharedI2cBus<ConverterBus>> = StaticCell::new();
    info!("Converter bus ready");
    I2C0_BUS.init(Mutex::new(bus))
}

/// Build the driver for one configured converter.
pub fn converter(bus: &'static SharedI2cBus<ConverterBus>, device: &DeviceDescriptor) -> Converter {
    Ads1115::new(
        AsyncI2cDevice::new(bus),
        embassy_time::Delay,
        device.address,
        device.gain,
    )
    .with_data_rate(device.data_rate)
}
