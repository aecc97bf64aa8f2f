// Installation document model
// Typed representation of the installation-config JSON, validated at the
// load boundary so downstream components never touch raw JSON shapes.

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed installation-config document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub areas: Vec<Area>,
    #[serde(default)]
    pub metadata: Option<InstallationMetadata>,
}

/// Top-level document metadata (name + revision info).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub major: Option<i64>,
    #[serde(default)]
    pub minor: Option<i64>,
}

/// A controllable or observable unit in the installation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(default)]
    pub visualization_type: Option<String>,
    /// UUIDs of the partitions this endpoint is installed in.
    #[serde(default)]
    pub partitions: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub default_parameter: Option<String>,
}

/// A named physical zone containing one or more partitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub partitions: Vec<PartitionRef>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
}

/// A partition reference inside an area. Real documents contain both full
/// objects and bare UUID strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartitionRef {
    Entry {
        uuid: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        id: Option<i64>,
    },
    Uuid(String),
}

impl PartitionRef {
    #[inline]
    pub fn uuid(&self) -> &str {
        match self {
            PartitionRef::Entry { uuid, .. } | PartitionRef::Uuid(uuid) => uuid,
        }
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        match self {
            PartitionRef::Entry { name, .. } => name.as_deref(),
            PartitionRef::Uuid(_) => None,
        }
    }
}

/// A single configurable/observable attribute of a device.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub data_type: Option<i64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub unit_prefix: Option<String>,
    #[serde(default)]
    pub operation: Option<Operation>,
    #[serde(default)]
    pub log_type: Option<i64>,
    #[serde(default)]
    pub default_state_value: Option<Value>,
    #[serde(default)]
    pub notify_frequency: Option<i64>,
    #[serde(default)]
    pub min_val: Vec<f64>,
    #[serde(default)]
    pub max_val: Vec<f64>,
    #[serde(default)]
    pub enumeration_val: Vec<Value>,
}

/// Supported operation of a parameter (switch, button, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Operation {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Log type code for continuously measured values.
pub const LOG_TYPE_MEASUREMENT: i64 = 3;
/// Log type code for configuration parameters (not logged).
pub const LOG_TYPE_CONFIG: i64 = 0;

impl Parameter {
    /// A parameter is control-capable if it can be switched or triggered.
    #[inline]
    pub fn is_control(&self) -> bool {
        self.operation
            .as_ref()
            .is_some_and(|op| op.kind == "switch" || op.kind == "button")
    }

    #[inline]
    pub fn is_measurement(&self) -> bool {
        self.log_type == Some(LOG_TYPE_MEASUREMENT)
    }

    #[inline]
    pub fn is_config(&self) -> bool {
        self.log_type == Some(LOG_TYPE_CONFIG)
    }

    #[inline]
    pub fn has_enumeration(&self) -> bool {
        !self.enumeration_val.is_empty()
    }
}

impl Endpoint {
    #[inline]
    pub fn has_control_params(&self) -> bool {
        self.parameters.iter().any(Parameter::is_control)
    }

    #[inline]
    pub fn has_measurement_params(&self) -> bool {
        self.parameters.iter().any(Parameter::is_measurement)
    }

    #[inline]
    pub fn has_enumeration_params(&self) -> bool {
        self.parameters.iter().any(Parameter::has_enumeration)
    }

    #[inline]
    pub fn has_config_params(&self) -> bool {
        self.parameters.iter().any(Parameter::is_config)
    }

    /// Distinct measurement units across all parameters, in first-seen order.
    #[inline]
    pub fn parameter_units(&self) -> Vec<String> {
        let mut units = Vec::new();
        for param in &self.parameters {
            if let Some(unit) = param.unit.as_deref() {
                if !unit.is_empty() && !units.iter().any(|u| u == unit) {
                    units.push(unit.to_string());
                }
            }
        }
        units
    }

    /// Distinct data type codes across all parameters, in first-seen order.
    #[inline]
    pub fn parameter_data_types(&self) -> Vec<i64> {
        let mut types = Vec::new();
        for param in &self.parameters {
            if let Some(data_type) = param.data_type {
                if !types.contains(&data_type) {
                    types.push(data_type);
                }
            }
        }
        types
    }

    #[inline]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| "Unnamed Device".to_string())
    }
}

/// A known device category with its retrieval vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct DeviceCategory {
    pub id: i64,
    pub name: &'static str,
    pub key_params: &'static [&'static str],
    pub visualization_types: &'static [&'static str],
}

/// Category vocabulary of the installations this pipeline targets.
pub const DEVICE_CATEGORIES: &[DeviceCategory] = &[
    DeviceCategory {
        id: 0,
        name: "controller",
        key_params: &["mac_address", "firmware_version", "bsp_version"],
        visualization_types: &["BOXIO", "SMABIT_AV2010_32", "LED_DRIVER", "GEWISS_GWA1531"],
    },
    DeviceCategory {
        id: 11,
        name: "energy_meter",
        key_params: &["total_active_energy", "phase_1_current", "total_system_power"],
        visualization_types: &["EASTRON_SDM630"],
    },
    DeviceCategory {
        id: 15,
        name: "smart_light",
        key_params: &["line_1", "line_2", "active_power", "voltage"],
        visualization_types: &["WS558"],
    },
    DeviceCategory {
        id: 18,
        name: "sensor",
        key_params: &["temperature", "presence", "fall"],
        visualization_types: &["VAYYAR_CARE"],
    },
];

/// Resolve a category code to its vocabulary name.
#[inline]
pub fn category_name(category: i64) -> String {
    DEVICE_CATEGORIES
        .iter()
        .find(|c| c.id == category)
        .map_or_else(|| format!("Category_{category}"), |c| c.name.to_string())
}
