//! Supervised WiFi join loop
//!
//! Joins the configured network, waits for a DHCP lease and then watches for
//! disconnection. Failed attempts back off per [`JoinPolicy`]; once the policy
//! gives up the chip is reset.

use adsnode_core::app_state::{NodeError, NodeEvent, NodeEventPublisher};
use adsnode_core::config::InternetConfig;
use adsnode_core::link::{JoinDecision, JoinPolicy, JoinSupervisor};
use embassy_net::Stack;
use embassy_time::{Duration, Timer, WithTimeout};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiEvent};
use log::{error, info, warn};

/// Longest wait for a DHCP lease after association.
const DHCP_TIMEOUT_MS: u64 = 15_000;
/// Grace period for the log to drain before a reset.
const RESET_DELAY_MS: u64 = 500;

pub async fn run_wifi(
    mut controller: WifiController<'static>,
    stack: Stack<'static>,
    internet: InternetConfig<'static>,
    policy: JoinPolicy,
    events: NodeEventPublisher,
) -> ! {
    let mode = ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(internet.ssid.into())
            .with_password(internet.password.into()),
    );
    if let Err(e) = controller.set_config(&mode) {
        error!("WiFi configuration rejected: {:?}", e);
        restart().await;
    }

    let mut supervisor = JoinSupervisor::new(policy);
    loop {
        let attempt = supervisor.begin_attempt();
        events.publish_immediate(NodeEvent::Link(supervisor.state()));
        info!("Connecting to WiFi {:?} (attempt {})", internet.ssid, attempt);

        match join(&mut controller, stack).await {
            Ok(()) => {
                supervisor.joined();
                events.publish_immediate(NodeEvent::Link(supervisor.state()));
                if let Some(config) = stack.config_v4() {
                    info!("Connected to WiFi, address {}", config.address);
                }

                controller.wait_for_event(WifiEvent::StaDisconnected).await;
                warn!("WiFi link lost");
                supervisor.link_lost();
                events.publish_immediate(NodeEvent::Link(supervisor.state()));
            }
            Err(e) => {
                warn!("WiFi join failed: {}", e);
                let _ = controller.disconnect_async().await;

                let decision = supervisor.attempt_failed();
                events.publish_immediate(NodeEvent::Link(supervisor.state()));
                match decision {
                    JoinDecision::RetryAfter(wait_ms) => {
                        info!("Retrying WiFi in {} ms", wait_ms);
                        Timer::after_millis(wait_ms).await;
                    }
                    JoinDecision::GiveUp => {
                        error!(
                            "WiFi join failed {} times, restarting",
                            supervisor.failures()
                        );
                        restart().await;
                    }
                }
            }
        }
    }
}

async fn join(controller: &mut WifiController<'static>, stack: Stack<'static>) -> Result<(), NodeError> {
    if !matches!(controller.is_started(), Ok(true)) {
        controller.start_async().await.map_err(|e| {
            error!("WiFi start failed: {:?}", e);
            NodeError::wifi("radio did not start")
        })?;
    }

    controller.connect_async().await.map_err(|e| {
        warn!("WiFi association failed: {:?}", e);
        NodeError::wifi("association failed")
    })?;

    stack
        .wait_config_up()
        .with_timeout(Duration::from_millis(DHCP_TIMEOUT_MS))
        .await
        .map_err(|_| NodeError::network("no DHCP lease"))
}

async fn restart() -> ! {
    Timer::after_millis(RESET_DELAY_MS).await;
    esp_hal::system::software_reset()
}
