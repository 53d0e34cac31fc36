//! Node-wide state, events and error types

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Publisher, Subscriber};
use log::{info, warn};
use thiserror_no_std::Error;

use crate::config::ConfigError;
use crate::link::JoinState;
use crate::reporter::CycleSummary;
use crate::sensors::SensorError;

/// Depth of the event queue.
pub const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Number of subscribers that can listen to node events
/// - Subscriber 0: status task
pub const EVENT_SUBSCRIBERS: usize = 1;

/// Number of publishers
/// - Publisher 0: WiFi task
/// - Publisher 1: reporter task
pub const EVENT_PUBLISHERS: usize = 2;

/// Capacity of [`NodeError`] messages.
pub const ERROR_MESSAGE_LEN: usize = 64;

/// Something the status task should hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    /// The WiFi join state changed.
    Link(JoinState),
    /// Converters were probed at start-up.
    SensorsProbed { ready: usize, total: usize },
    /// A report cycle finished.
    Cycle(CycleSummary),
}

/// Global pub-sub channel for node events
pub static NODE_EVENTS: PubSubChannel<
    CriticalSectionRawMutex,
    NodeEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
> = PubSubChannel::new();

pub type NodeEventPublisher = Publisher<
    'static,
    CriticalSectionRawMutex,
    NodeEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;

pub type NodeEventSubscriber = Subscriber<
    'static,
    CriticalSectionRawMutex,
    NodeEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRunState {
    Uninitialized,
    WifiConnecting,
    WifiConnected,
    Reporting,
    Error,
}

/// Aggregated view of the node, folded from [`NodeEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStatus {
    pub run_state: NodeRunState,
    pub link: JoinState,
    pub sensors_ready: usize,
    pub sensors_total: usize,
    pub cycles: u32,
    pub deliveries: u32,
    pub last_cycle: Option<CycleSummary>,
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStatus {
    pub const fn new() -> Self {
        Self {
            run_state: NodeRunState::Uninitialized,
            link: JoinState::Down,
            sensors_ready: 0,
            sensors_total: 0,
            cycles: 0,
            deliveries: 0,
            last_cycle: None,
        }
    }

    /// Fold one event into the status and log the change.
    pub fn apply(&mut self, event: &NodeEvent) {
        match *event {
            NodeEvent::Link(state) => {
                self.link = state;
                self.run_state = match state {
                    JoinState::Down | JoinState::Joining { .. } => NodeRunState::WifiConnecting,
                    JoinState::Up if self.cycles > 0 => NodeRunState::Reporting,
                    JoinState::Up => NodeRunState::WifiConnected,
                    JoinState::GaveUp => NodeRunState::Error,
                };
                match state {
                    JoinState::Joining { attempt } => info!("WiFi: join attempt {}", attempt),
                    JoinState::Up => info!("WiFi: connected"),
                    JoinState::Down => warn!("WiFi: link down"),
                    JoinState::GaveUp => warn!("WiFi: giving up, restarting"),
                }
            }
            NodeEvent::SensorsProbed { ready, total } => {
                self.sensors_ready = ready;
                self.sensors_total = total;
                info!("Converters ready: {}/{}", ready, total);
            }
            NodeEvent::Cycle(summary) => {
                self.cycles = self.cycles.wrapping_add(1);
                if summary.delivery.is_sent() {
                    self.deliveries = self.deliveries.wrapping_add(1);
                }
                if self.link.is_up() {
                    self.run_state = NodeRunState::Reporting;
                }
                self.last_cycle = Some(summary);
                info!(
                    "Cycle {}: {}/{} channels with data, {:?} ({} delivered)",
                    self.cycles, summary.with_data, summary.channels, summary.delivery, self.deliveries
                );
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("WiFi error: {0}")]
    Wifi(heapless::String<ERROR_MESSAGE_LEN>),
    #[error("Network error: {0}")]
    Network(heapless::String<ERROR_MESSAGE_LEN>),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),
}

impl NodeError {
    pub fn wifi(message: &str) -> Self {
        Self::Wifi(truncated(message))
    }

    pub fn network(message: &str) -> Self {
        Self::Network(truncated(message))
    }
}

/// Copy as much of `text` as fits, cutting on a character boundary.
pub fn truncated<const N: usize>(text: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
