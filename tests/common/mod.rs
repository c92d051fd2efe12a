//! In-memory register bus recording every exchange.

#![allow(dead_code)]

use async_trait::async_trait;
use evse_gateway_lib::{
    protocol,
    tokio_common::{RegisterBus, Result, TransportError},
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Exchange {
    Read { address: u16, quantity: u16 },
    Write { address: u16, words: Vec<u16> },
}

impl Exchange {
    pub fn address(&self) -> u16 {
        match self {
            Exchange::Read { address, .. } | Exchange::Write { address, .. } => *address,
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, Exchange::Read { .. })
    }
}

#[derive(Debug, Default)]
struct State {
    registers: HashMap<u16, u16>,
    exchanges: Vec<Exchange>,
    fail_on_read: Option<usize>,
    fail_on_write: Option<usize>,
    short_reply: bool,
    latency: Option<Duration>,
}

/// Cloneable handle; clones share registers and the exchange log.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<State>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registers(self, registers: &[(u16, u16)]) -> Self {
        self.state.lock().unwrap().registers.extend(registers.iter().copied());
        self
    }

    pub fn with_long(self, address: u16, value: u32) -> Self {
        let [high, low] = protocol::encode_long(value);
        self.with_registers(&[(address, high), (address + 1, low)])
    }

    pub fn with_float(self, address: u16, value: f32) -> Self {
        let [high, low] = protocol::encode_float(value);
        self.with_registers(&[(address, high), (address + 1, low)])
    }

    pub fn with_text(self, address: u16, text: &str) -> Self {
        let registers: Vec<(u16, u16)> = text
            .as_bytes()
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| {
                let low = pair.get(1).copied().unwrap_or(0);
                (address + i as u16, u16::from_be_bytes([pair[0], low]))
            })
            .collect();
        self.with_registers(&registers)
    }

    /// The `n`-th read (1-based) fails.
    pub fn failing_on_read(self, n: usize) -> Self {
        self.state.lock().unwrap().fail_on_read = Some(n);
        self
    }

    /// The `n`-th write (1-based) fails.
    pub fn failing_on_write(self, n: usize) -> Self {
        self.state.lock().unwrap().fail_on_write = Some(n);
        self
    }

    /// Every read returns one register less than requested.
    pub fn with_short_replies(self) -> Self {
        self.state.lock().unwrap().short_reply = true;
        self
    }

    /// Each exchange takes `latency` to complete.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().unwrap().latency = Some(latency);
        self
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.state.lock().unwrap().exchanges.clone()
    }

    pub fn reads(&self) -> usize {
        self.exchanges().iter().filter(|e| e.is_read()).count()
    }

    pub fn writes(&self) -> Vec<(u16, Vec<u16>)> {
        self.exchanges()
            .into_iter()
            .filter_map(|e| match e {
                Exchange::Write { address, words } => Some((address, words)),
                Exchange::Read { .. } => None,
            })
            .collect()
    }

    pub fn register(&self, address: u16) -> u16 {
        self.state
            .lock()
            .unwrap()
            .registers
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    async fn wait(&self) {
        let latency = self.state.lock().unwrap().latency;
        match latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }
    }
}

#[async_trait]
impl RegisterBus for MockBus {
    async fn read_holding_registers(&mut self, address: u16, quantity: u16) -> Result<Vec<u16>> {
        let (failing, short) = {
            let mut state = self.state.lock().unwrap();
            state.exchanges.push(Exchange::Read { address, quantity });
            let reads = state.exchanges.iter().filter(|e| e.is_read()).count();
            (state.fail_on_read == Some(reads), state.short_reply)
        };
        self.wait().await;
        if failing {
            return Err(TransportError::new("No communication with the instrument (no answer)"));
        }
        let state = self.state.lock().unwrap();
        let count = if short { quantity - 1 } else { quantity };
        Ok((address..address + count)
            .map(|a| state.registers.get(&a).copied().unwrap_or(0))
            .collect())
    }

    async fn write_multiple_registers(&mut self, address: u16, words: &[u16]) -> Result<()> {
        let failing = {
            let mut state = self.state.lock().unwrap();
            state.exchanges.push(Exchange::Write {
                address,
                words: words.to_vec(),
            });
            let writes = state.exchanges.iter().filter(|e| !e.is_read()).count();
            state.fail_on_write == Some(writes)
        };
        self.wait().await;
        if failing {
            return Err(TransportError::from(
                tokio_modbus::ExceptionCode::IllegalDataAddress,
            ));
        }
        let mut state = self.state.lock().unwrap();
        for (offset, word) in words.iter().enumerate() {
            state.registers.insert(address + offset as u16, *word);
        }
        Ok(())
    }
}

/// Register contents of a charging EVSE used across tests.
pub fn charging_evse() -> MockBus {
    MockBus::new()
        .with_registers(&[(0x0000, 2), (0x0011, 3), (0x0012, 0x0A01)])
        .with_text(0x0001, "2.4.1")
        .with_text(0x0009, "SN00012345")
        .with_registers(&[(0x0100, 3), (0x0101, 1), (0x0102, 0), (0x0103, 1)])
        .with_long(0x0104, 123_456)
        .with_float(0x0300, 6.0)
        .with_float(0x0302, 16.0)
        .with_float(0x0304, 32.0)
        .with_float(0x0306, 16.0)
        .with_registers(&[(0x030A, 1)])
        .with_float(0x0500, 15.5)
        .with_float(0x0506, 230.5)
        .with_float(0x050C, 3572.75)
        .with_float(0x0512, 3572.75)
        .with_float(0x0B00, 16.0)
        .with_float(0x0B02, 7.25)
        .with_long(0x0B04, 3600)
        .with_registers(&[(0x0D03, 1), (0x0D05, 1)])
        .with_long(0x0E00, 0x0001_0002)
}
