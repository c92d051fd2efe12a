//! This module provides the serial link settings, the transport error type and
//! the [`RegisterBus`] abstraction used by the `tokio` based clients.
//!
//! A [`RegisterBus`] performs exactly one Modbus request/response exchange per
//! call. [`ModbusBus`] implements it on top of a `tokio-modbus` RTU context.

use async_trait::async_trait;
use std::time::Duration;
use tokio_modbus::prelude::{Reader, Writer};

/// Any failure of a Modbus exchange.
///
/// Timeouts, CRC and framing faults, exception responses and malformed
/// replies all end up here. Only the message is kept.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<tokio_modbus::Error> for TransportError {
    fn from(err: tokio_modbus::Error) -> Self {
        Self::new(format!("Modbus error: {err}"))
    }
}

impl From<tokio_modbus::ExceptionCode> for TransportError {
    fn from(err: tokio_modbus::ExceptionCode) -> Self {
        Self::new(format!("Modbus exception: {err}"))
    }
}

impl From<tokio::task::JoinError> for TransportError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::new(format!("Device task failed: {err}"))
    }
}

/// The result type for tokio operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// The baud rate of the EVSE serial link.
pub const BAUD_RATE: u32 = 57_600;
/// The parity used for serial communication.
pub const PARITY: &tokio_serial::Parity = &tokio_serial::Parity::None;
/// The number of stop bits used for serial communication.
pub const STOP_BITS: &tokio_serial::StopBits = &tokio_serial::StopBits::Two;
/// The number of data bits used for serial communication.
pub const DATA_BITS: &tokio_serial::DataBits = &tokio_serial::DataBits::Eight;
/// How long to wait for the slave to answer a request.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Creates a `tokio_serial::SerialPortBuilder` with the specified settings.
///
/// # Arguments
///
/// * `device` - The path to the serial port device (e.g., `/dev/ttyUSB0`).
/// * `baud_rate` - The baud rate for the serial communication.
pub fn serial_port_builder(device: &str, baud_rate: u32) -> tokio_serial::SerialPortBuilder {
    tokio_serial::new(device, baud_rate)
        .parity(*PARITY)
        .stop_bits(*STOP_BITS)
        .data_bits(*DATA_BITS)
        .flow_control(tokio_serial::FlowControl::None)
}

/// One Modbus request/response exchange per call, against a fixed slave.
#[async_trait]
pub trait RegisterBus: Send + std::fmt::Debug {
    /// Function code 0x03.
    async fn read_holding_registers(&mut self, address: u16, quantity: u16) -> Result<Vec<u16>>;

    /// Function code 0x10.
    async fn write_multiple_registers(&mut self, address: u16, words: &[u16]) -> Result<()>;
}

/// [`RegisterBus`] backed by a `tokio-modbus` client context.
pub struct ModbusBus {
    ctx: tokio_modbus::client::Context,
    timeout: Duration,
}

impl ModbusBus {
    /// Wraps a context already bound to the EVSE slave address.
    pub fn new(ctx: tokio_modbus::client::Context, timeout: Duration) -> Self {
        Self { ctx, timeout }
    }

    /// Helper function to map a timed tokio result to our result.
    fn map_tokio_result<T>(
        &self,
        result: std::result::Result<tokio_modbus::Result<T>, tokio::time::error::Elapsed>,
    ) -> Result<T> {
        match result {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(err))) => Err(err.into()), // Modbus exception
            Ok(Err(err)) => Err(err.into()),     // IO or protocol error
            Err(_) => Err(TransportError::new(format!(
                "No response from the slave within {:?}",
                self.timeout
            ))),
        }
    }
}

impl std::fmt::Debug for ModbusBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModbusBus")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RegisterBus for ModbusBus {
    async fn read_holding_registers(&mut self, address: u16, quantity: u16) -> Result<Vec<u16>> {
        let result = tokio::time::timeout(
            self.timeout,
            self.ctx.read_holding_registers(address, quantity),
        )
        .await;
        self.map_tokio_result(result)
    }

    async fn write_multiple_registers(&mut self, address: u16, words: &[u16]) -> Result<()> {
        let result = tokio::time::timeout(
            self.timeout,
            self.ctx.write_multiple_registers(address, words),
        )
        .await;
        self.map_tokio_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    #[test]
    fn exception_message() {
        let err = TransportError::from(tokio_modbus::ExceptionCode::IllegalDataAddress);
        assert!(err.message().starts_with("Modbus exception: "));
    }

    #[test]
    fn io_error_message() {
        let err = TransportError::from(tokio_modbus::Error::Transport(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "timed out",
        )));
        assert!(err.to_string().starts_with("Modbus error: "));
        assert!(err.message().contains("timed out"));
    }

    const SLAVE: tokio_modbus::Slave = tokio_modbus::Slave(0x32);

    /// Read of one holding register at 0x0100, as sent by the client.
    const READ_EVSE_STATE: [u8; 8] = [0x32, 0x03, 0x01, 0x00, 0x00, 0x01, 0x80, 0x35];

    /// Answers the next request with the raw `response` frame.
    async fn reply_once(mut device: DuplexStream, response: &[u8]) -> DuplexStream {
        let mut request = [0u8; READ_EVSE_STATE.len()];
        device.read_exact(&mut request).await.unwrap();
        assert_eq!(request, READ_EVSE_STATE);
        device.write_all(response).await.unwrap();
        device
    }

    #[tokio::test]
    async fn silent_slave_times_out() {
        let (port, _device) = tokio::io::duplex(256);
        let ctx = tokio_modbus::client::rtu::attach_slave(port, SLAVE);
        let mut bus = ModbusBus::new(ctx, Duration::from_millis(50));

        let err = bus.read_holding_registers(0x0100, 1).await.unwrap_err();
        assert!(
            err.message().starts_with("No response from the slave within"),
            "{err}"
        );
    }

    #[tokio::test]
    async fn exception_frame_is_reported() {
        let (port, device) = tokio::io::duplex(256);
        let ctx = tokio_modbus::client::rtu::attach_slave(port, SLAVE);
        let mut bus = ModbusBus::new(ctx, RESPONSE_TIMEOUT);

        // illegal data address
        let (result, _device) = tokio::join!(
            bus.read_holding_registers(0x0100, 1),
            reply_once(device, &[0x32, 0x83, 0x02, 0x30, 0xFE]),
        );
        let err = result.unwrap_err();
        assert!(err.message().starts_with("Modbus exception: "), "{err}");
    }

    #[tokio::test]
    async fn register_words_are_returned() {
        let (port, device) = tokio::io::duplex(256);
        let ctx = tokio_modbus::client::rtu::attach_slave(port, SLAVE);
        let mut bus = ModbusBus::new(ctx, RESPONSE_TIMEOUT);

        let (result, _device) = tokio::join!(
            bus.read_holding_registers(0x0100, 1),
            reply_once(device, &[0x32, 0x03, 0x02, 0x00, 0x03, 0xFC, 0x41]),
        );
        assert_eq!(result, Ok(vec![3]));
    }
}
