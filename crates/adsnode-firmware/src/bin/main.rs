#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use adsnode_core::app_state::{
    NODE_EVENTS, NodeError, NodeEvent, NodeEventPublisher, NodeEventSubscriber, NodeStatus,
};
use adsnode_core::config::ReporterConfig;
use adsnode_core::link::JoinPolicy;
use adsnode_core::reporter::Reporter;
use embassy_executor::Spawner;
use embassy_net::StackResources;
use embassy_time::{Instant, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use esp_radio::wifi::{WifiController, WifiDevice};
use log::{LevelFilter, error, info};
use static_cell::StaticCell;

use adsnode_firmware::hardware::{self, Converter};
use adsnode_firmware::net::TcpTransport;
use adsnode_firmware::{settings, wifi};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
static CONFIG: StaticCell<ReporterConfig<'static>> = StaticCell::new();

#[embassy_executor::task]
async fn net_task(mut runner: embassy_net::Runner<'static, WifiDevice<'static>>) {
    runner.run().await;
}

#[embassy_executor::task]
async fn wifi_task(
    controller: WifiController<'static>,
    stack: embassy_net::Stack<'static>,
    policy: JoinPolicy,
    events: NodeEventPublisher,
) {
    wifi::run_wifi(controller, stack, settings::INTERNET, policy, events).await
}

#[embassy_executor::task]
async fn status_task(mut events: NodeEventSubscriber) {
    let mut status = NodeStatus::new();
    loop {
        let event = events.next_message_pure().await;
        status.apply(&event);
    }
}

#[embassy_executor::task]
async fn reporter_task(
    mut reporter: Reporter<'static, Converter>,
    mut transport: TcpTransport<'static>,
    events: NodeEventPublisher,
) {
    let ready = reporter.init_devices().await;
    events.publish_immediate(NodeEvent::SensorsProbed {
        ready,
        total: reporter.sensors().len(),
    });

    // The first report is due immediately, so it must not race the join.
    transport.wait_link_up().await;
    info!("Link is up, starting report loop");

    loop {
        if let Some(summary) = reporter.tick(Instant::now().as_millis(), &mut transport).await {
            events.publish_immediate(NodeEvent::Cycle(summary));
        }
        let wait_ms = reporter.schedule().due_in(Instant::now().as_millis());
        Timer::after_millis(wait_ms).await;
    }
}

/// Report an unrecoverable start-up error forever.
async fn halt(error: NodeError) -> ! {
    loop {
        error!("Start-up failed: {}", error);
        Timer::after_secs(60).await;
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!(LevelFilter::Info);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized");

    let endpoint = match settings::endpoint() {
        Ok(endpoint) => endpoint,
        Err(e) => halt(e).await,
    };
    let config = CONFIG.init(ReporterConfig {
        endpoint,
        ..ReporterConfig::DEFAULT
    });

    // Converters
    let i2c = match hardware::create_i2c_bus(peripherals.I2C0, peripherals.GPIO12, peripherals.GPIO11) {
        Ok(i2c) => i2c,
        Err(e) => halt(e).await,
    };
    let bus = hardware::share_i2c_bus(i2c);
    let reporter = match Reporter::new(*config, |device| hardware::converter(bus, device)) {
        Ok(reporter) => reporter,
        Err(e) => halt(e.into()).await,
    };

    // Radio and network stack
    let radio = match esp_radio::init() {
        Ok(radio) => RADIO.init(radio),
        Err(e) => {
            error!("Radio init failed: {:?}", e);
            halt(NodeError::wifi("radio init failed")).await
        }
    };
    let (controller, interfaces) = match esp_radio::wifi::new(radio, peripherals.WIFI, Default::default()) {
        Ok(parts) => parts,
        Err(e) => {
            error!("WiFi driver init failed: {:?}", e);
            halt(NodeError::wifi("driver init failed")).await
        }
    };

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::<3>::new()),
        seed,
    );

    let status_events = NODE_EVENTS
        .subscriber()
        .expect("event channel has a subscriber slot");
    let wifi_events = NODE_EVENTS
        .publisher()
        .expect("event channel has a publisher slot for WiFi");
    let reporter_events = NODE_EVENTS
        .publisher()
        .expect("event channel has a publisher slot for the reporter");

    spawner.spawn(status_task(status_events).expect("status task spawns"));
    spawner.spawn(net_task(runner).expect("net task spawns"));
    spawner.spawn(wifi_task(controller, stack, config.join, wifi_events).expect("wifi task spawns"));
    spawner.spawn(
        reporter_task(
            reporter,
            TcpTransport::new(stack, config.timeouts),
            reporter_events,
        )
        .expect("reporter task spawns"),
    );

    info!(
        "Reporting {} channels to {}:{}{} every {} ms",
        config.channel_count(),
        config.endpoint.host,
        config.endpoint.port,
        config.endpoint.path,
        config.interval_ms
    );

    loop {
        Timer::after_secs(3600).await;
    }
}
