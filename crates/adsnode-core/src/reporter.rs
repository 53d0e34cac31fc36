//! The report cycle
//!
//! [`Reporter`] owns the converters and the schedule. The caller drives it by
//! calling [`Reporter::tick`] with the current monotonic time; when the
//! interval has elapsed it samples every channel, posts the payload over the
//! given [`Transport`] and returns what happened.

use alloc::vec::Vec;

use log::{debug, info, warn};

use crate::config::{ConfigError, DeviceDescriptor, ReporterConfig};
use crate::report::Report;
use crate::schedule::ReportSchedule;
use crate::sensors::{AnalogSensor, ChannelSample, IndexedSensor};
use crate::transport::{Delivery, Transport, post_form};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    Idle,
    Reporting,
}

/// Outcome of one report cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    /// Time the cycle was triggered, which is also the new schedule reference.
    pub started_ms: u64,
    pub channels: usize,
    pub with_data: usize,
    pub delivery: Delivery,
}

pub struct Reporter<'a, S> {
    config: ReporterConfig<'a>,
    sensors: Vec<IndexedSensor<S>>,
    schedule: ReportSchedule,
    state: ReporterState,
}

impl<'a, S: AnalogSensor> Reporter<'a, S> {
    /// Validate `config` and build one sensor per configured device.
    pub fn new(
        config: ReporterConfig<'a>,
        mut make_sensor: impl FnMut(&DeviceDescriptor) -> S,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let sensors = config
            .devices
            .iter()
            .map(|descriptor| IndexedSensor::new(make_sensor(descriptor), *descriptor))
            .collect();

        Ok(Self {
            config,
            sensors,
            schedule: ReportSchedule::new(config.interval_ms),
            state: ReporterState::Idle,
        })
    }

    pub const fn config(&self) -> &ReporterConfig<'a> {
        &self.config
    }

    pub const fn state(&self) -> ReporterState {
        self.state
    }

    pub const fn schedule(&self) -> &ReportSchedule {
        &self.schedule
    }

    pub fn sensors(&self) -> &[IndexedSensor<S>] {
        &self.sensors
    }

    #[cfg(test)]
    pub(crate) fn sensors_mut(&mut self) -> &mut [IndexedSensor<S>] {
        &mut self.sensors
    }

    /// Probe every converter once. Failures are logged and leave the device
    /// not ready. Returns the number of ready devices.
    pub async fn init_devices(&mut self) -> usize {
        let mut ready = 0;
        for sensor in &mut self.sensors {
            if sensor.ensure_ready().await {
                ready += 1;
            }
        }
        if ready < self.sensors.len() {
            warn!(
                "{} of {} converters not ready, their channels report no data",
                self.sensors.len() - ready,
                self.sensors.len()
            );
        }
        ready
    }

    /// Run a cycle if the interval has elapsed since the last one.
    pub async fn tick<T: Transport>(&mut self, now_ms: u64, transport: &mut T) -> Option<CycleSummary> {
        if !self.schedule.is_due(now_ms) {
            return None;
        }
        Some(self.run_cycle(now_ms, transport).await)
    }

    /// Sample, post, and restart the interval at `now_ms`, whatever the
    /// network outcome.
    pub async fn run_cycle<T: Transport>(&mut self, now_ms: u64, transport: &mut T) -> CycleSummary {
        self.state = ReporterState::Reporting;

        let report = self.sample().await;
        let body = report.payload();
        info!("Sending data: {}", body);

        let endpoint = self.config.endpoint;
        let delivery = {
            let mut connection = transport.open();
            post_form(&mut connection, &endpoint, &body).await
        };

        self.schedule.mark_sent(now_ms);
        self.state = ReporterState::Idle;

        CycleSummary {
            started_ms: now_ms,
            channels: report.len(),
            with_data: report.with_data(),
            delivery,
        }
    }

    /// Read every channel in global order. Devices that are not ready are
    /// probed again first; channels of devices that stay down carry no data.
    pub async fn sample(&mut self) -> Report<'a> {
        for sensor in &mut self.sensors {
            sensor.ensure_ready().await;
        }

        let labels = self.config.labels;
        let mut report = Report::new();
        for (index, &label) in labels.iter().enumerate() {
            let Some(device) = self.config.device_for(index) else {
                continue;
            };
            let sensor = &mut self.sensors[device];
            let raw = sensor.read_channel(index).await;
            let sample = ChannelSample {
                index,
                label,
                raw,
                gain: sensor.descriptor().gain,
            };

            match (raw, sample.millivolts()) {
                (Some(raw), Some(mv)) => {
                    if raw < 0 {
                        debug!("CH {} reads negative ({}), reporting magnitude", index, raw);
                    }
                    info!("CH {} | ADC: {} | Voltage: {} mV", index, raw, mv);
                }
                _ => info!("CH {} | no data", index),
            }

            // The validated layout never exceeds the report capacity.
            let _ = report.push(sample);
        }
        report
    }
}
