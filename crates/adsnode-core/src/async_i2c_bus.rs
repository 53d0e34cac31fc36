//! One I2C bus, several converters
//!
//! Each converter driver owns an [`AsyncI2cDevice`] handle. Handles lock the
//! shared bus for the length of one call, so a conversion poll on one device
//! never interleaves with a register write on another.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};

/// The bus as stored in a `StaticCell` by the firmware.
///
/// The raw mutex is `CriticalSectionRawMutex`, so the same static can be
/// touched from any executor or interrupt priority without further setup.
pub type SharedI2cBus<T> = Mutex<CriticalSectionRawMutex, T>;

/// A handle to a shared async I2C bus.
///
/// Handles are cheap to clone and carry nothing but the bus reference. Each
/// converter gets its own handle, and the reporter never needs to know that
/// the converters share wires.
///
/// # Locking
///
/// Every [`I2c`] call locks the bus, runs the complete operation and releases
/// the lock when the operation returns. The lock is an async mutex, so a
/// handle waiting for the bus yields to the executor instead of spinning.
/// A converter's "start conversion, wait, read result" sequence spans several
/// calls and may therefore interleave with other handles between calls, but
/// never inside one register access.
///
/// # Example
///
/// ```ignore
/// static BUS: StaticCell<SharedI2cBus<I2c<'static, Async>>> = StaticCell::new();
///
/// let bus = BUS.init(Mutex::new(i2c));
/// let first = Ads1115::new(AsyncI2cDevice::new(bus), Delay, ADDR_GND, Gain::TwoThirds);
/// let second = Ads1115::new(AsyncI2cDevice::new(bus), Delay, ADDR_VDD, Gain::TwoThirds);
/// ```
pub struct AsyncI2cDevice<'a, T> {
    bus: &'a SharedI2cBus<T>,
}

impl<'a, T> AsyncI2cDevice<'a, T> {
    /// Create a handle onto `bus`. Any number of handles may exist at once.
    #[inline]
    pub const fn new(bus: &'a SharedI2cBus<T>) -> Self {
        Self { bus }
    }
}

impl<T> Clone for AsyncI2cDevice<'_, T> {
    fn clone(&self) -> Self {
        Self { bus: self.bus }
    }
}

impl<T: ErrorType> ErrorType for AsyncI2cDevice<'_, T> {
    type Error = T::Error;
}

impl<T: I2c> I2c for AsyncI2cDevice<'_, T> {
    /// Read `read.len()` bytes from `address` while holding the bus.
    #[inline]
    async fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        self.bus.lock().await.read(address, read).await
    }

    /// Write `write` to `address` while holding the bus.
    #[inline]
    async fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        self.bus.lock().await.write(address, write).await
    }

    /// Write then read with a repeated start, as one locked operation.
    ///
    /// This is how register pointers are set and read back without another
    /// handle moving the pointer in between.
    #[inline]
    async fn write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.bus.lock().await.write_read(address, write, read).await
    }

    /// Run every operation in `operations` under a single lock.
    #[inline]
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.bus.lock().await.transaction(address, operations).await
    }
}
