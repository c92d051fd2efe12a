use crate::commandline::CliArgs;
use anyhow::Context;
use evse_gateway_lib::tokio_common::{BAUD_RATE, RESPONSE_TIMEOUT};
use serde::Deserialize;
use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModbusConfig {
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_address")]
    pub address: u8,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            baud_rate: default_baud_rate(),
            timeout: default_timeout(),
            address: default_address(),
        }
    }
}

fn default_device() -> String {
    String::from("/dev/serial/by-id/usb-1a86_USB_Serial-if00-port0")
}

fn default_baud_rate() -> u32 {
    BAUD_RATE
}

fn default_timeout() -> Duration {
    RESPONSE_TIMEOUT
}

fn default_address() -> u8 {
    50
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub modbus: ModbusConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    fn apply_overrides(mut self, args: &CliArgs) -> Self {
        if let Some(device) = &args.device {
            self.modbus.device = device.clone();
        }
        if let Some(address) = args.address {
            self.modbus.address = address;
        }
        if let Some(timeout) = args.timeout {
            self.modbus.timeout = timeout;
        }
        if let Some(listen) = args.listen {
            self.http.listen = listen;
        }
        self
    }
}

pub(crate) fn get_config(args: &CliArgs) -> anyhow::Result<Config> {
    let config = match get_config_file_path(args) {
        Some(path) => {
            log::debug!("Loading config file from {:?}", &path);
            let config_file =
                File::open(&path).with_context(|| format!("Cannot open config file {path:?}"))?;
            serde_yaml::from_reader(&config_file)
                .with_context(|| format!("Cannot parse config file {path:?}"))?
        }
        None => {
            log::debug!("No config file found, using defaults");
            Config::default()
        }
    };
    Ok(config.apply_overrides(args))
}

fn get_config_file_path(args: &CliArgs) -> Option<PathBuf> {
    let default_file = Path::new(DEFAULT_CONFIG_FILE);
    match (&args.config, default_file) {
        (Some(config), _) => Some(config.clone()),
        (None, config) if config.exists() => Some(config.to_path_buf()),
        _ => None,
    }
}
