//! Bakes WiFi credentials and the report endpoint into the firmware.
//!
//! Values come from the environment, or from a `.env` file found in this
//! directory or any parent. Missing values fall back to the defaults below.

use std::net::Ipv4Addr;

const DEFAULTS: [(&str, &str); 4] = [
    ("ADSNODE_WIFI_SSID", "adsnode"),
    ("ADSNODE_WIFI_PASSWORD", ""),
    ("ADSNODE_SERVER_HOST", "172.16.26.53"),
    ("ADSNODE_SERVER_PORT", "5176"),
];

fn main() {
    if let Ok(path) = dotenvy::dotenv() {
        println!("cargo:rerun-if-changed={}", path.display());
    }

    for (key, default) in DEFAULTS {
        println!("cargo:rerun-if-env-changed={key}");
        let value = std::env::var(key).unwrap_or_else(|_| default.to_owned());
        println!("cargo:rustc-env={key}={value}");
    }

    let host = std::env::var("ADSNODE_SERVER_HOST").unwrap_or_else(|_| DEFAULTS[2].1.to_owned());
    if host.parse::<Ipv4Addr>().is_err() {
        panic!("ADSNODE_SERVER_HOST must be an IPv4 address, got {host:?}");
    }
    let port = std::env::var("ADSNODE_SERVER_PORT").unwrap_or_else(|_| DEFAULTS[3].1.to_owned());
    if port.parse::<u16>().is_err() {
        panic!("ADSNODE_SERVER_PORT must be a port number, got {port:?}");
    }

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
