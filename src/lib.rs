//! A library for exposing an EVSE charging controller over HTTP/JSON via Modbus RTU.
//!
//! The controller is reachable only over a half-duplex serial link. This crate
//! maps its register layout to a small set of REST resources:
//!
//! 1.  **Register codec** ([`protocol`]): pure conversions between raw 16-bit
//!     register words and integers, 32-bit longs and floats, and packed ASCII
//!     strings.
//! 2.  **Register map** ([`register_map`]): the static table of every
//!     resource group and the partial update payloads.
//! 3.  **Transport** ([`tokio_common`], [`tokio_async`]): one Modbus exchange
//!     per call, with every fault reported as a [`tokio_common::TransportError`].
//! 4.  **Device session** ([`tokio_async_safe_client::SafeClient`]): a
//!     cloneable handle that serializes all access to the serial link.
//! 5.  **HTTP routes** ([`api`]): an `axum` router over the device session.
//!
//! ## Quick Start
//!
//! ```no_run
//! use evse_gateway_lib::{
//!     api,
//!     tokio_async_safe_client::SafeClient,
//!     tokio_common::{serial_port_builder, ModbusBus, BAUD_RATE, RESPONSE_TIMEOUT},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let builder = serial_port_builder("/dev/ttyUSB0", BAUD_RATE);
//!     let port = tokio_serial::SerialStream::open(&builder)?;
//!     let ctx = tokio_modbus::client::rtu::attach_slave(port, tokio_modbus::Slave(50));
//!     let client = SafeClient::new(ModbusBus::new(ctx, RESPONSE_TIMEOUT));
//!
//!     let status = client.read_status().await?;
//!     println!("{}", serde_json::to_string(&status)?);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, api::router(client)).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod protocol;
pub mod register_map;
pub mod tokio_async;
pub mod tokio_async_safe_client;
pub mod tokio_common;
