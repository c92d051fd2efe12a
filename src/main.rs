//! EVSE Gateway
//!
//! Serves the registers of an EVSE charging controller, reachable over a
//! Modbus RTU serial link, as a REST API with JSON bodies.
//!
//! Connection parameters come from an optional YAML configuration file and
//! command-line overrides. The serial link is opened once at startup and
//! shared by all requests.

use anyhow::{Context, Result};
use clap::Parser;
use evse_gateway_lib::{api, tokio_async_safe_client::SafeClient, tokio_common};
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use std::panic;

mod commandline;
mod config;

fn logging_init(loglevel: LevelFilter) -> Result<LoggerHandle> {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .context("Cannot init logging")?
        .start()
        .context("Cannot start logging")?;

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown_file>", 0, 0));

        let cause_str = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            *s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "<unknown_panic_cause>"
        };

        error!(
            target: "panic",
            "Thread '{}' panicked at '{}': {}:{} - Cause: {}",
            std::thread::current().name().unwrap_or("<unnamed>"),
            filename,
            line,
            column,
            cause_str
        );
    }));
    Ok(log_handle)
}

/// Opens the serial port and binds a Modbus RTU context to the EVSE slave.
fn create_client(modbus: &config::ModbusConfig) -> Result<SafeClient> {
    info!(
        "Opening {} (Address: {}, Baud: {}, Timeout: {:?})",
        modbus.device, modbus.address, modbus.baud_rate, modbus.timeout
    );
    let builder = tokio_common::serial_port_builder(&modbus.device, modbus.baud_rate);
    let port = tokio_serial::SerialStream::open(&builder)
        .with_context(|| format!("Cannot open serial port {}", modbus.device))?;
    let ctx = tokio_modbus::client::rtu::attach_slave(port, tokio_modbus::Slave(modbus.address));
    Ok(SafeClient::new(tokio_common::ModbusBus::new(
        ctx,
        modbus.timeout,
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = commandline::CliArgs::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter())?;
    info!(
        "EVSE gateway started. Log level: {}",
        args.verbose.log_level_filter()
    );

    let config = config::get_config(&args)?;
    let client = create_client(&config.modbus)?;

    let listener = tokio::net::TcpListener::bind(config.http.listen)
        .await
        .with_context(|| format!("Cannot listen on {}", config.http.listen))?;
    info!("Serving HTTP on {}", config.http.listen);

    axum::serve(listener, api::router(client))
        .await
        .context("HTTP server failed")
}
