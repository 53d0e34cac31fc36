//! Host-side doubles for the I2C bus, converters and network transport.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::net::Ipv4Addr;

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};

use crate::sensors::{AnalogSensor, CONFIG_OS, REG_CONFIG, REG_CONVERSION, SensorError};
use crate::transport::{Connection, Transport};

/// Delay that returns immediately.
pub struct NoDelay;

impl DelayNs for NoDelay {
    async fn delay_ns(&mut self, _ns: u32) {}
}

/// Register-level model of one ADS1115.
#[derive(Debug, Clone)]
pub struct MockAds1115 {
    pub address: u8,
    pub inputs: [i16; 4],
    /// Never report a finished conversion.
    pub stuck_busy: bool,
    pointer: u8,
    config: u16,
    conversion: u16,
    last_config: Option<u16>,
}

impl MockAds1115 {
    pub fn new(address: u8, inputs: [i16; 4]) -> Self {
        Self {
            address,
            inputs,
            stuck_busy: false,
            pointer: REG_CONVERSION,
            config: 0x8583,
            conversion: 0,
            last_config: None,
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        let Some((&pointer, value)) = bytes.split_first() else {
            return;
        };
        self.pointer = pointer;
        if pointer == REG_CONFIG && value.len() == 2 {
            let config = u16::from_be_bytes([value[0], value[1]]);
            self.config = config;
            self.last_config = Some(config);
            let mux = (config >> 12) & 0x07;
            if config & CONFIG_OS != 0 && mux >= 4 {
                self.conversion = self.inputs[(mux - 4) as usize] as u16;
            }
        }
    }

    fn read(&self, buf: &mut [u8]) {
        let value = match self.pointer {
            REG_CONFIG if self.stuck_busy => self.config & !CONFIG_OS,
            REG_CONFIG => self.config | CONFIG_OS,
            _ => self.conversion,
        };
        for (dst, src) in buf.iter_mut().zip(value.to_be_bytes()) {
            *dst = src;
        }
    }
}

/// Shared I2C bus with any number of modelled converters attached.
#[derive(Clone, Default)]
pub struct MockBus {
    devices: Rc<RefCell<Vec<MockAds1115>>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, device: MockAds1115) {
        self.devices.borrow_mut().push(device);
    }

    pub fn detach(&mut self, address: u8) {
        self.devices.borrow_mut().retain(|d| d.address != address);
    }

    pub fn set_inputs(&mut self, address: u8, inputs: [i16; 4]) {
        if let Some(device) = self
            .devices
            .borrow_mut()
            .iter_mut()
            .find(|d| d.address == address)
        {
            device.inputs = inputs;
        }
    }

    pub fn last_config(&self, address: u8) -> Option<u16> {
        self.devices
            .borrow()
            .iter()
            .find(|d| d.address == address)
            .and_then(|d| d.last_config)
    }
}

impl ErrorType for MockBus {
    type Error = ErrorKind;
}

impl I2c for MockBus {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut devices = self.devices.borrow_mut();
        let device = devices
            .iter_mut()
            .find(|d| d.address == address)
            .ok_or(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))?;

        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => device.write(bytes),
                Operation::Read(buf) => device.read(buf),
            }
        }
        Ok(())
    }
}

/// Converter double with canned values.
pub struct ScriptedSensor {
    pub values: [i16; 4],
    pub fail_init: bool,
    pub fail_reads: bool,
    pub init_calls: u32,
}

impl ScriptedSensor {
    pub fn with_values(values: [i16; 4]) -> Self {
        Self {
            values,
            fail_init: false,
            fail_reads: false,
            init_calls: 0,
        }
    }

    pub fn failing_init() -> Self {
        Self {
            fail_init: true,
            ..Self::with_values([0; 4])
        }
    }
}

impl AnalogSensor for ScriptedSensor {
    async fn init(&mut self) -> Result<(), SensorError> {
        self.init_calls += 1;
        if self.fail_init {
            return Err(SensorError::InitializationFailed {
                sensor: "scripted",
                address: 0,
                details: "scripted failure",
            });
        }
        Ok(())
    }

    async fn read_single_ended(&mut self, channel: u8) -> Result<i16, SensorError> {
        if self.fail_reads {
            return Err(SensorError::ReadFailed {
                sensor: "scripted",
                address: 0,
                operation: "read",
                details: "scripted failure",
            });
        }
        Ok(self.values[channel as usize])
    }
}

/// Network double that records what was sent and replays a canned response.
#[derive(Default)]
pub struct MockTransport {
    pub refuse_connect: bool,
    pub fail_writes: bool,
    pub response: Vec<u8>,
    /// Maximum bytes handed out per read call.
    pub read_chunk: usize,
    /// Reads fail once this many response bytes have been handed out.
    pub fail_reads_after: Option<usize>,
    pub sent: Vec<u8>,
    pub connected_to: Option<(Ipv4Addr, u16)>,
    pub opens: usize,
    pub closes: usize,
}

impl MockTransport {
    pub fn responding(response: &[u8]) -> Self {
        Self {
            response: response.to_vec(),
            read_chunk: 7,
            ..Self::default()
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse_connect: true,
            ..Self::default()
        }
    }

    pub fn sent_str(&self) -> &str {
        core::str::from_utf8(&self.sent).unwrap()
    }
}

pub struct MockConnection<'a> {
    transport: &'a mut MockTransport,
    read_pos: usize,
    closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockNetError {
    Refused,
    Reset,
}

impl Transport for MockTransport {
    type Connection<'a>
        = MockConnection<'a>
    where
        Self: 'a;

    fn open(&mut self) -> MockConnection<'_> {
        self.opens += 1;
        MockConnection {
            transport: self,
            read_pos: 0,
            closed: false,
        }
    }
}

impl Connection for MockConnection<'_> {
    type Error = MockNetError;

    async fn connect(&mut self, host: Ipv4Addr, port: u16) -> Result<(), MockNetError> {
        if self.transport.refuse_connect {
            return Err(MockNetError::Refused);
        }
        self.transport.connected_to = Some((host, port));
        Ok(())
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<(), MockNetError> {
        if self.transport.fail_writes {
            return Err(MockNetError::Reset);
        }
        self.transport.sent.extend_from_slice(data);
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, MockNetError> {
        let end = match self.transport.fail_reads_after {
            Some(limit) if self.read_pos >= limit => return Err(MockNetError::Reset),
            Some(limit) => limit.min(self.transport.response.len()),
            None => self.transport.response.len(),
        };
        let remaining = &self.transport.response[self.read_pos..end];
        let n = remaining.len().min(buf.len()).min(self.transport.read_chunk.max(1));
        buf[..n].copy_from_slice(&remaining[..n]);
        self.read_pos += n;
        Ok(n)
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.transport.closes += 1;
        }
    }
}
