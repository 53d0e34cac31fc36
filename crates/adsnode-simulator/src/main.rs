//! Desktop simulator for the adsnode analog telemetry reporter.
//!
//! Runs the same [`Reporter`] as the firmware against synthetic converters and
//! a `std::net` transport, so a real collection server can be exercised
//! without hardware.
//!
//! # Environment
//!
//! | Variable                    | Default        | Meaning                                  |
//! |-----------------------------|----------------|------------------------------------------|
//! | `ADSNODE_SERVER_HOST`       | `172.16.26.53` | IPv4 address of the collection server    |
//! | `ADSNODE_SERVER_PORT`       | `5176`         | Server port                              |
//! | `ADSNODE_SIM_INTERVAL_MS`   | `60000`        | Report interval                          |
//! | `ADSNODE_SIM_CYCLES`        | unlimited      | Stop after this many cycles              |
//! | `ADSNODE_SIM_OFFLINE`       | none           | Comma-separated converter addresses that never answer, e.g. `0x4B` |
//! | `RUST_LOG`                  | `info`         | Log filter                               |

use std::io::{Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use embassy_futures::block_on;
use log::{error, info, warn};

use adsnode_core::app_state::{NodeEvent, NodeStatus};
use adsnode_core::config::{DeviceDescriptor, Endpoint, NetTimeouts, ReporterConfig};
use adsnode_core::reporter::Reporter;
use adsnode_core::sensors::{AnalogSensor, SensorError};
use adsnode_core::transport::{Connection, Transport};

// ---------------------------------------------------------------------------
// Synthetic converters
// ---------------------------------------------------------------------------

/// Generates readings that drift slowly around a per-channel level.
struct SimulatedAdc {
    descriptor: DeviceDescriptor,
    offline: bool,
    started: Instant,
}

impl SimulatedAdc {
    fn new(descriptor: DeviceDescriptor, offline: bool) -> Self {
        Self {
            descriptor,
            offline,
            started: Instant::now(),
        }
    }

    fn unreachable(&self, operation: &'static str) -> SensorError {
        SensorError::ReadFailed {
            sensor: "simulated ADS1115",
            address: self.descriptor.address,
            operation,
            details: "device configured offline",
        }
    }
}

impl AnalogSensor for SimulatedAdc {
    async fn init(&mut self) -> Result<(), SensorError> {
        if self.offline {
            return Err(SensorError::InitializationFailed {
                sensor: "simulated ADS1115",
                address: self.descriptor.address,
                details: "device configured offline",
            });
        }
        Ok(())
    }

    async fn read_single_ended(&mut self, channel: u8) -> Result<i16, SensorError> {
        if self.offline {
            return Err(self.unreachable("read"));
        }
        let global = self.descriptor.base_index + channel as usize;
        let t = self.started.elapsed().as_secs_f64();

        // 150 mV steps between channels, about 50 mV of wobble with a per-channel phase
        let level = 1600.0 * (1.0 + global as f64 * 0.5);
        let wobble = 266.0 * (t / 90.0 + global as f64).sin();
        let raw = (level + wobble).clamp(i16::MIN as f64, i16::MAX as f64) as i16;

        // Every fifth channel is wired reversed, exercising sign folding
        Ok(if global % 5 == 4 { raw.saturating_neg() } else { raw })
    }
}

// ---------------------------------------------------------------------------
// std::net transport
// ---------------------------------------------------------------------------

struct StdTransport {
    timeouts: NetTimeouts,
}

struct StdConnection {
    timeouts: NetTimeouts,
    stream: Option<TcpStream>,
}

impl StdConnection {
    fn stream(&mut self) -> std::io::Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotConnected))
    }
}

impl Transport for StdTransport {
    type Connection<'a>
        = StdConnection
    where
        Self: 'a;

    fn open(&mut self) -> StdConnection {
        StdConnection {
            timeouts: self.timeouts,
            stream: None,
        }
    }
}

impl Connection for StdConnection {
    type Error = std::io::Error;

    async fn connect(&mut self, host: Ipv4Addr, port: u16) -> std::io::Result<()> {
        let address = SocketAddr::from((host, port));
        let stream =
            TcpStream::connect_timeout(&address, Duration::from_millis(self.timeouts.connect_ms))?;
        let io_timeout = Some(Duration::from_millis(self.timeouts.io_ms));
        stream.set_read_timeout(io_timeout)?;
        stream.set_write_timeout(io_timeout)?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.stream()?.write_all(data)
    }

    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream()?.read(buf)
    }

    async fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!("Ignoring {key}={value:?}, using default");
            default
        }),
        Err(_) => default,
    }
}

fn offline_addresses() -> Vec<u8> {
    let Ok(list) = std::env::var("ADSNODE_SIM_OFFLINE") else {
        return Vec::new();
    };
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| {
            let digits = item.trim_start_matches("0x").trim_start_matches("0X");
            let parsed = u8::from_str_radix(digits, 16).ok();
            if parsed.is_none() {
                warn!("Ignoring converter address {item:?}");
            }
            parsed
        })
        .collect()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let endpoint = Endpoint {
        host: env_or("ADSNODE_SERVER_HOST", Endpoint::DEFAULT.host),
        port: env_or("ADSNODE_SERVER_PORT", Endpoint::DEFAULT.port),
        ..Endpoint::DEFAULT
    };
    let config = ReporterConfig {
        endpoint,
        interval_ms: env_or("ADSNODE_SIM_INTERVAL_MS", ReporterConfig::DEFAULT.interval_ms),
        ..ReporterConfig::DEFAULT
    };
    let cycles: Option<u32> = std::env::var("ADSNODE_SIM_CYCLES")
        .ok()
        .and_then(|value| value.parse().ok());
    let offline = offline_addresses();

    let mut reporter = match Reporter::new(config, |device| {
        SimulatedAdc::new(*device, offline.contains(&device.address))
    }) {
        Ok(reporter) => reporter,
        Err(e) => {
            error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };
    let mut transport = StdTransport {
        timeouts: config.timeouts,
    };

    info!(
        "Simulating {} channels, posting to {}:{}{} every {} ms",
        config.channel_count(),
        config.endpoint.host,
        config.endpoint.port,
        config.endpoint.path,
        config.interval_ms
    );

    let mut status = NodeStatus::new();
    let ready = block_on(reporter.init_devices());
    status.apply(&NodeEvent::SensorsProbed {
        ready,
        total: reporter.sensors().len(),
    });

    let started = Instant::now();
    loop {
        let now_ms = started.elapsed().as_millis() as u64;
        if let Some(summary) = block_on(reporter.tick(now_ms, &mut transport)) {
            status.apply(&NodeEvent::Cycle(summary));
            if cycles.is_some_and(|limit| status.cycles >= limit) {
                info!("Finished {} cycles", status.cycles);
                return;
            }
        }

        let wait_ms = reporter
            .schedule()
            .due_in(started.elapsed().as_millis() as u64);
        std::thread::sleep(Duration::from_millis(wait_ms));
    }
}
