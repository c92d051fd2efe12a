//! Asynchronous register access for the EVSE controller.
//!
//! This module provides stateless functions (`Evse` struct) that issue one
//! Modbus exchange each and convert between raw register words and the types
//! defined in [`crate::protocol`]. They operate on any [`RegisterBus`] and
//! do not synchronize access on their own; use
//! [`crate::tokio_async_safe_client::SafeClient`] when the bus is shared.
//!
//! # Example
//!
//! ```no_run
//! use evse_gateway_lib::tokio_async::Evse;
//! use evse_gateway_lib::tokio_common::{serial_port_builder, ModbusBus, BAUD_RATE, RESPONSE_TIMEOUT};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let builder = serial_port_builder("/dev/ttyUSB0", BAUD_RATE);
//!     let port = tokio_serial::SerialStream::open(&builder)?;
//!     let ctx = tokio_modbus::client::rtu::attach_slave(port, tokio_modbus::Slave(50));
//!     let mut bus = ModbusBus::new(ctx, RESPONSE_TIMEOUT);
//!
//!     let evse_state = Evse::read_register(&mut bus, 0x0100).await?;
//!     println!("EVSE state: {evse_state}");
//!     Ok(())
//! }
//! ```

use crate::{
    protocol::{self as proto, Aggregate, Field, RegisterRef, Value},
    register_map::RegisterWrite,
    tokio_common::{RegisterBus, Result, TransportError},
};

#[derive(Debug)]
pub struct Evse;

impl Evse {
    /// Reads `quantity` holding registers and checks the reply length.
    async fn read_words(
        bus: &mut dyn RegisterBus,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>> {
        log::trace!("read {quantity} register(s) at {address:#06x}");
        let words = bus.read_holding_registers(address, quantity).await?;
        if words.len() != quantity as usize {
            return Err(TransportError::new(format!(
                "Malformed response: expected {quantity} register(s) at {address:#06x}, got {}",
                words.len()
            )));
        }
        Ok(words)
    }

    async fn write_words(bus: &mut dyn RegisterBus, address: u16, words: &[u16]) -> Result<()> {
        log::trace!("write {words:04x?} at {address:#06x}");
        bus.write_multiple_registers(address, words).await
    }

    async fn read_pair(bus: &mut dyn RegisterBus, address: u16) -> Result<[u16; 2]> {
        let words = Self::read_words(bus, address, 2).await?;
        Ok([words[0], words[1]])
    }

    /// Reads a single 16-bit register.
    pub async fn read_register(bus: &mut dyn RegisterBus, address: u16) -> Result<u16> {
        let words = Self::read_words(bus, address, 1).await?;
        Ok(proto::decode_integer(words[0]))
    }

    /// Reads an unsigned 32-bit integer spanning two registers.
    pub async fn read_long(bus: &mut dyn RegisterBus, address: u16) -> Result<u32> {
        Ok(proto::decode_long(Self::read_pair(bus, address).await?))
    }

    /// Reads an IEEE-754 float spanning two registers.
    pub async fn read_float(bus: &mut dyn RegisterBus, address: u16) -> Result<f32> {
        Ok(proto::decode_float(Self::read_pair(bus, address).await?))
    }

    /// Reads a packed ASCII string of `length` characters.
    pub async fn read_string(
        bus: &mut dyn RegisterBus,
        address: u16,
        length: u16,
    ) -> Result<String> {
        let words = Self::read_words(bus, address, proto::string_quantity(length)).await?;
        Ok(proto::decode_string(&words, length as usize))
    }

    /// Writes a single 16-bit register.
    pub async fn write_register(
        bus: &mut dyn RegisterBus,
        address: u16,
        value: u16,
    ) -> Result<()> {
        Self::write_words(bus, address, &[proto::encode_integer(value)]).await
    }

    /// Writes a float into two consecutive registers.
    pub async fn write_float(bus: &mut dyn RegisterBus, address: u16, value: f32) -> Result<()> {
        Self::write_words(bus, address, &proto::encode_float(value)).await
    }

    /// Reads one register reference with a single exchange.
    pub async fn read_value(bus: &mut dyn RegisterBus, register: &RegisterRef) -> Result<Value> {
        let words = Self::read_words(bus, register.address, register.encoding.quantity()).await?;
        Ok(Value::decode(&register.encoding, &words))
    }

    /// Reads all `fields` in order. The first failing read aborts the sequence.
    pub async fn read_fields(bus: &mut dyn RegisterBus, fields: &[Field]) -> Result<Aggregate> {
        let mut aggregate = Aggregate::with_capacity(fields.len());
        for field in fields {
            let value = Self::read_value(bus, &field.register).await?;
            aggregate.push(field.name, value);
        }
        Ok(aggregate)
    }

    /// Applies `writes` in order. Stops at the first failure; earlier writes are not undone.
    pub async fn write_all(bus: &mut dyn RegisterBus, writes: &[RegisterWrite]) -> Result<()> {
        for write in writes {
            match *write {
                RegisterWrite::Integer { address, value } => {
                    Self::write_register(bus, address, value).await?
                }
                RegisterWrite::Float { address, value } => {
                    Self::write_float(bus, address, value).await?
                }
            }
        }
        Ok(())
    }
}
