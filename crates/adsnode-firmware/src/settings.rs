//! Build-time node settings, injected by `build.rs`.

use core::net::Ipv4Addr;

use adsnode_core::app_state::NodeError;
use adsnode_core::config::{Endpoint, InternetConfig, SENSOR_DATA_PATH};

pub const WIFI_SSID: &str = env!("ADSNODE_WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("ADSNODE_WIFI_PASSWORD");
pub const SERVER_HOST: &str = env!("ADSNODE_SERVER_HOST");
pub const SERVER_PORT: &str = env!("ADSNODE_SERVER_PORT");

pub const INTERNET: InternetConfig<'static> = InternetConfig {
    ssid: WIFI_SSID,
    password: WIFI_PASSWORD,
};

/// The report endpoint. `build.rs` already rejected malformed values, so an
/// error here means the binary was built some other way.
pub fn endpoint() -> Result<Endpoint<'static>, NodeError> {
    let host: Ipv4Addr = SERVER_HOST
        .parse()
        .map_err(|_| NodeError::network("server host is not an IPv4 address"))?;
    let port: u16 = SERVER_PORT
        .parse()
        .map_err(|_| NodeError::network("server port is not a number"))?;

    Ok(Endpoint {
        host,
        port,
        path: SENSOR_DATA_PATH,
    })
}
