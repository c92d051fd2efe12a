use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Lowest and highest unicast Modbus slave address.
const ADDRESS_MIN: u8 = 1;
const ADDRESS_MAX: u8 = 247;

fn parse_address(s: &str) -> Result<u8, String> {
    let address =
        clap_num::maybe_hex::<u8>(s).map_err(|e| format!("Invalid address format: {e}"))?;
    if (ADDRESS_MIN..=ADDRESS_MAX).contains(&address) {
        Ok(address)
    } else {
        Err(format!(
            "Address {address} out of range, must be between {ADDRESS_MIN} and {ADDRESS_MAX}"
        ))
    }
}

const fn about_text() -> &'static str {
    "EVSE Gateway - Serve an EVSE charging controller's Modbus RTU registers as a REST API."
}

#[derive(Parser, Debug)]
#[command(name = "evse-gateway", author, version, about = about_text(), long_about = None)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for debug, -vv for trace, -q for warnings only.
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// YAML configuration file.
    /// Defaults to "config.yml" in the working directory if it exists.
    #[arg(short, long, verbatim_doc_comment)]
    pub config: Option<PathBuf>,

    /// Serial port device name, overrides the configuration file.
    /// Example: "/dev/ttyUSB0".
    #[arg(short, long, verbatim_doc_comment)]
    pub device: Option<String>,

    /// Modbus slave address of the EVSE (1 to 247), overrides the configuration file.
    /// Can be specified in decimal or hexadecimal (e.g., "0x32").
    #[arg(short, long, value_parser = parse_address, verbatim_doc_comment)]
    pub address: Option<u8>,

    /// Modbus response timeout, overrides the configuration file.
    /// Examples: "1s", "500ms".
    #[arg(long, value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub timeout: Option<Duration>,

    /// Socket address the HTTP server listens on, overrides the configuration file.
    /// Example: "127.0.0.1:8000".
    #[arg(short, long, verbatim_doc_comment)]
    pub listen: Option<SocketAddr>,
}
