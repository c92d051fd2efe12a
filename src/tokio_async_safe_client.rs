//! Asynchronous, shareable client for the EVSE controller.
//!
//! `SafeClient` owns the device session: one [`RegisterBus`] behind a mutex.
//! Every method holds the lock for its whole register sequence, so exchanges
//! of concurrent callers never overlap. The device work runs on a spawned
//! task; dropping the returned future does not abort an exchange that is
//! already on the wire.
//!
//! All client methods are `async` and must be `.await`ed.

use crate::{
    protocol::Aggregate,
    register_map::{ConfigurationUpdate, FunctionsUpdate, RegisterWrite, ResourceGroup},
    tokio_async::Evse,
    tokio_common::{RegisterBus, Result},
};
use std::{future::Future, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};

type SharedBus = Arc<Mutex<Box<dyn RegisterBus>>>;

/// Asynchronous client for interacting with the EVSE controller over Modbus.
///
/// Cloning is cheap; all clones share the same bus.
#[derive(Debug, Clone)]
pub struct SafeClient {
    bus: SharedBus,
}

impl SafeClient {
    /// Creates a new `SafeClient` taking ownership of `bus`.
    pub fn new(bus: impl RegisterBus + 'static) -> Self {
        Self::from_boxed(Box::new(bus))
    }

    pub fn from_boxed(bus: Box<dyn RegisterBus>) -> Self {
        Self {
            bus: Arc::new(Mutex::new(bus)),
        }
    }

    /// Acquires the bus and runs `op` to completion on its own task.
    async fn exclusive<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce(OwnedMutexGuard<Box<dyn RegisterBus>>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let bus = self.bus.clone().lock_owned().await;
        tokio::spawn(op(bus)).await?
    }

    /// Reads all fields of `group` in table order.
    pub async fn read_group(&self, group: ResourceGroup) -> Result<Aggregate> {
        log::debug!("Reading {group}");
        self.exclusive(move |mut bus| async move {
            Evse::read_fields(&mut **bus, group.fields()).await
        })
        .await
    }

    async fn write(&self, writes: Vec<RegisterWrite>) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        self.exclusive(move |mut bus| async move { Evse::write_all(&mut **bus, &writes).await })
            .await
    }

    /// Layout version, firmware version, serial number, hardware version and product id.
    pub async fn read_version_info(&self) -> Result<Aggregate> {
        self.read_group(ResourceGroup::VersionInfo).await
    }

    pub async fn read_status(&self) -> Result<Aggregate> {
        self.read_group(ResourceGroup::Status).await
    }

    pub async fn read_configuration(&self) -> Result<Aggregate> {
        self.read_group(ResourceGroup::Configuration).await
    }

    /// Writes every present field of `update`.
    pub async fn update_configuration(&self, update: &ConfigurationUpdate) -> Result<()> {
        log::debug!("Updating configuration: {update:?}");
        self.write(update.register_writes()).await
    }

    /// Currents (A), voltages (V) and powers (W) per phase and the overall power.
    pub async fn read_output_measurements(&self) -> Result<Aggregate> {
        self.read_group(ResourceGroup::OutputMeasurements).await
    }

    pub async fn read_charging_session(&self) -> Result<Aggregate> {
        self.read_group(ResourceGroup::ChargingSession).await
    }

    pub async fn read_functions(&self) -> Result<Aggregate> {
        self.read_group(ResourceGroup::Functions).await
    }

    /// Writes every present field of `update`, in the order the device expects.
    ///
    /// A failure leaves the fields written before it in place.
    pub async fn update_functions(&self, update: &FunctionsUpdate) -> Result<()> {
        log::debug!("Updating functions: {update:?}");
        self.write(update.register_writes()).await
    }

    pub async fn read_diagnostic(&self) -> Result<Aggregate> {
        self.read_group(ResourceGroup::Diagnostic).await
    }
}
