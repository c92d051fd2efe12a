//! Static register map of the EVSE controller.
//!
//! Each resource group is a fixed table of named fields. The handlers read
//! the table in order and the response keeps that order.

use crate::protocol::{Field, RegisterRef};
use serde::{de::Error as _, Deserialize, Deserializer};

/// Resource groups exposed by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceGroup {
    VersionInfo,
    Status,
    Configuration,
    OutputMeasurements,
    ChargingSession,
    Functions,
    Diagnostic,
}

impl ResourceGroup {
    pub const ALL: [ResourceGroup; 7] = [
        ResourceGroup::VersionInfo,
        ResourceGroup::Status,
        ResourceGroup::Configuration,
        ResourceGroup::OutputMeasurements,
        ResourceGroup::ChargingSession,
        ResourceGroup::Functions,
        ResourceGroup::Diagnostic,
    ];

    pub const fn fields(&self) -> &'static [Field] {
        match self {
            ResourceGroup::VersionInfo => VERSION_INFO,
            ResourceGroup::Status => STATUS,
            ResourceGroup::Configuration => CONFIGURATION,
            ResourceGroup::OutputMeasurements => OUTPUT_MEASUREMENTS,
            ResourceGroup::ChargingSession => CHARGING_SESSION,
            ResourceGroup::Functions => FUNCTIONS,
            ResourceGroup::Diagnostic => DIAGNOSTIC,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            ResourceGroup::VersionInfo => "version_info",
            ResourceGroup::Status => "status",
            ResourceGroup::Configuration => "configuration",
            ResourceGroup::OutputMeasurements => "output_measurements",
            ResourceGroup::ChargingSession => "charging_session",
            ResourceGroup::Functions => "functions",
            ResourceGroup::Diagnostic => "diagnostic",
        }
    }
}

impl std::fmt::Display for ResourceGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub const VERSION_INFO: &[Field] = &[
    Field::new("layout_version", RegisterRef::integer(0x0000)),
    Field::new("firmware_version", RegisterRef::text(0x0001, 8)),
    Field::new("serial_number", RegisterRef::text(0x0009, 8)),
    Field::new("hw_version", RegisterRef::integer(0x0011)),
    Field::new("product_id", RegisterRef::integer(0x0012)),
];

pub const STATUS: &[Field] = &[
    Field::new("evse_state", RegisterRef::integer(0x0100)),
    Field::new("external_charging_release_state", RegisterRef::integer(0x0101)),
    Field::new("external_downgrading_state", RegisterRef::integer(0x0102)),
    Field::new("phase_rotation", RegisterRef::integer(0x0103)),
    Field::new("bootup_token", RegisterRef::long(0x0104)),
];

pub const CONFIGURATION: &[Field] = &[
    Field::new("external_downgrading_current", RegisterRef::float(0x0300)),
    Field::new(
        "external_charging_current_limitation",
        RegisterRef::float(EXTERNAL_CHARGING_CURRENT_LIMITATION_ADDR),
    ),
    Field::new("max_current_evse_group", RegisterRef::float(0x0304)),
    Field::new("max_current_evse", RegisterRef::float(0x0306)),
    Field::new("selective_phase_switching_option", RegisterRef::integer(0x030A)),
];

pub const OUTPUT_MEASUREMENTS: &[Field] = &[
    Field::new("current_l1", RegisterRef::float(0x0500)),
    Field::new("current_l2", RegisterRef::float(0x0502)),
    Field::new("current_l3", RegisterRef::float(0x0504)),
    Field::new("voltage_l1", RegisterRef::float(0x0506)),
    Field::new("voltage_l2", RegisterRef::float(0x0508)),
    Field::new("voltage_l3", RegisterRef::float(0x050A)),
    Field::new("power_l1", RegisterRef::float(0x050C)),
    Field::new("power_l2", RegisterRef::float(0x050E)),
    Field::new("power_l3", RegisterRef::float(0x0510)),
    Field::new("power_overall", RegisterRef::float(0x0512)),
];

pub const CHARGING_SESSION: &[Field] = &[
    Field::new("max_session_charging_current", RegisterRef::float(0x0B00)),
    Field::new("session_charging_energy", RegisterRef::float(0x0B02)),
    Field::new("session_duration", RegisterRef::long(0x0B04)),
];

pub const FUNCTIONS: &[Field] = &[
    Field::new("solar_charge_mode", RegisterRef::integer(SOLAR_CHARGE_MODE_ADDR)),
    Field::new("req_phase_usage", RegisterRef::integer(REQ_PHASE_USAGE_ADDR)),
    Field::new("charging_release", RegisterRef::integer(CHARGING_RELEASE_ADDR)),
    Field::new("lockmode", RegisterRef::integer(LOCKMODE_ADDR)),
];

pub const DIAGNOSTIC: &[Field] = &[Field::new("last_error_code", RegisterRef::long(0x0E00))];

pub const EXTERNAL_CHARGING_CURRENT_LIMITATION_ADDR: u16 = 0x0302;
pub const MASTER_HEARTBEAT_ADDR: u16 = 0x0D00;
pub const SOLAR_CHARGE_MODE_ADDR: u16 = 0x0D03;
pub const REQ_PHASE_USAGE_ADDR: u16 = 0x0D04;
pub const CHARGING_RELEASE_ADDR: u16 = 0x0D05;
pub const LOCKMODE_ADDR: u16 = 0x0D06;

/// Value the master writes to the heartbeat register to signal it is alive.
pub const MASTER_HEARTBEAT_PATTERN: u16 = 0x55AA;

/// A single register write produced from an update payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegisterWrite {
    Integer { address: u16, value: u16 },
    Float { address: u16, value: f32 },
}

/// Partial update of the configuration group. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigurationUpdate {
    /// External charging current limitation in amperes per phase.
    #[serde(default, deserialize_with = "deserialize_register_float")]
    pub external_charging_current_limitation: Option<f32>,
}

/// Accepts only numbers that fit a finite single precision float.
fn deserialize_register_float<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer)?
        .map(|value| {
            if value.is_finite() && value.abs() <= f64::from(f32::MAX) {
                Ok(value as f32)
            } else {
                Err(D::Error::custom(format!(
                    "{value} is out of range for a 32-bit float register"
                )))
            }
        })
        .transpose()
}

impl ConfigurationUpdate {
    pub fn register_writes(&self) -> Vec<RegisterWrite> {
        self.external_charging_current_limitation
            .map(|value| RegisterWrite::Float {
                address: EXTERNAL_CHARGING_CURRENT_LIMITATION_ADDR,
                value,
            })
            .into_iter()
            .collect()
    }
}

/// Partial update of the functions group. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FunctionsUpdate {
    /// Heartbeat of the master, signalled with [`MASTER_HEARTBEAT_PATTERN`].
    pub master_heartbeat: Option<u16>,
    /// 0 = not supported, 1 = normal charging, 2 = sunshine mode, 4 = sunshine+ mode.
    pub solar_charge_mode: Option<u16>,
    pub req_phase_usage: Option<u16>,
    /// 0 = charging not allowed, 1 = charging released.
    pub charging_release: Option<u16>,
    /// 0 = not locked, 1 = locked (charging not possible).
    pub lockmode: Option<u16>,
}

impl FunctionsUpdate {
    /// Writes for every present field, in the order the device expects them.
    pub fn register_writes(&self) -> Vec<RegisterWrite> {
        [
            (MASTER_HEARTBEAT_ADDR, self.master_heartbeat),
            (SOLAR_CHARGE_MODE_ADDR, self.solar_charge_mode),
            (REQ_PHASE_USAGE_ADDR, self.req_phase_usage),
            (CHARGING_RELEASE_ADDR, self.charging_release),
            (LOCKMODE_ADDR, self.lockmode),
        ]
        .into_iter()
        .filter_map(|(address, value)| {
            value.map(|value| RegisterWrite::Integer { address, value })
        })
        .collect()
    }
}
