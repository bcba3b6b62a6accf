// Portal data model
//
// Wire types mirror the portal's camelCase JSON. Fields use
// `#[serde(default)]` where the portal omits them on some gateways.
// Domain types (`Device`, `Parameter`, `Value`) are what callers see.

use serde::{Deserialize, Serialize};

// ── Devices ──────────────────────────────────────────────────────────

/// One heating system from `GetSystemList`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: i64,
    pub gateway_id: i64,
    pub name: String,
}

/// Entry of the `GetSystemStateList` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SystemState {
    pub gateway_state: GatewayState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GatewayState {
    pub is_online: bool,
}

// ── GUI description ──────────────────────────────────────────────────

/// Root of `GetGuiDescriptionForGateway`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuiDescription {
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    #[serde(default)]
    pub tab_views: Vec<TabView>,
}

/// One tab of the GUI description.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabView {
    pub tab_name: String,
    #[serde(default)]
    pub parameter_descriptors: Vec<RawDescriptor>,
    /// Heating schema diagram; only present on the system overview tab.
    #[serde(default, rename = "SVGHeatingSchemaConfigDevices")]
    pub schema_devices: Option<Vec<SchemaDevice>>,
}

/// Parameter descriptor as the portal sends it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDescriptor {
    pub value_id: i64,
    pub name: String,
    pub parameter_id: i64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub list_items: Option<Vec<RawListItem>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListItem {
    pub value: serde_json::Value,
    pub display_text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaDevice {
    #[serde(default)]
    pub parameters: Vec<SchemaParameter>,
}

/// Diagram annotation; `unit` is the only field the mapper uses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaParameter {
    pub value_id: i64,
    #[serde(default)]
    pub unit: Option<String>,
}

// ── Parameters ───────────────────────────────────────────────────────

/// Selectable option of a list-item parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub value: serde_json::Value,
    pub display_text: String,
}

/// Identity shared by every parameter variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub value_id: i64,
    pub name: String,
    /// Name of the tab the parameter was declared on.
    pub parent: String,
    pub parameter_id: i64,
}

/// A classified parameter. The variant is fixed at mapping time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Parameter {
    Simple(ParameterInfo),
    Temperature(ParameterInfo),
    Pressure(ParameterInfo),
    Percentage(ParameterInfo),
    Hours(ParameterInfo),
    ListItem {
        #[serde(flatten)]
        info: ParameterInfo,
        items: Vec<ListItem>,
    },
}

/// Fieldless mirror of [`Parameter`] for display and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Simple,
    Temperature,
    Pressure,
    Percentage,
    Hours,
    ListItem,
}

impl ParameterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Temperature => "temperature",
            Self::Pressure => "pressure",
            Self::Percentage => "percentage",
            Self::Hours => "hours",
            Self::ListItem => "list",
        }
    }
}

impl std::fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Parameter {
    pub fn info(&self) -> &ParameterInfo {
        match self {
            Self::Simple(info)
            | Self::Temperature(info)
            | Self::Pressure(info)
            | Self::Percentage(info)
            | Self::Hours(info)
            | Self::ListItem { info, .. } => info,
        }
    }

    pub fn value_id(&self) -> i64 {
        self.info().value_id
    }

    pub fn name(&self) -> &str {
        &self.info().name
    }

    pub fn parent(&self) -> &str {
        &self.info().parent
    }

    pub fn parameter_id(&self) -> i64 {
        self.info().parameter_id
    }

    pub fn kind(&self) -> ParameterKind {
        match self {
            Self::Simple(_) => ParameterKind::Simple,
            Self::Temperature(_) => ParameterKind::Temperature,
            Self::Pressure(_) => ParameterKind::Pressure,
            Self::Percentage(_) => ParameterKind::Percentage,
            Self::Hours(_) => ParameterKind::Hours,
            Self::ListItem { .. } => ParameterKind::ListItem,
        }
    }

    /// Display unit for unit-bearing variants.
    pub fn unit(&self) -> Option<&'static str> {
        match self {
            Self::Temperature(_) => Some("°C"),
            Self::Pressure(_) => Some("bar"),
            Self::Percentage(_) => Some("%"),
            Self::Hours(_) => Some("h"),
            Self::Simple(_) | Self::ListItem { .. } => None,
        }
    }

    /// Render a live value for humans.
    ///
    /// List parameters resolve the raw value to its option text; unit-bearing
    /// parameters append their unit. Unknown list values fall back to the raw value.
    pub fn display_value(&self, value: &Value) -> String {
        let raw = value.raw_text();
        match self {
            Self::ListItem { items, .. } => items
                .iter()
                .find(|item| same_raw(&item.value, &value.value))
                .map_or(raw, |item| item.display_text.clone()),
            _ => match self.unit() {
                Some(unit) => format!("{raw} {unit}"),
                None => raw,
            },
        }
    }
}

/// Portal values arrive as numbers or numeric strings depending on firmware.
fn same_raw(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    a == b || text_of(a) == text_of(b)
}

fn text_of(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── Values ───────────────────────────────────────────────────────────

/// One live reading from `GetParameterValues`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub value_id: i64,
    pub value: serde_json::Value,
    /// Portal quality indicator for the reading, when reported.
    pub state: Option<i64>,
}

impl Value {
    /// The raw value without JSON string quoting.
    pub fn raw_text(&self) -> String {
        text_of(&self.value)
    }
}

/// Successful `GetParameterValues` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValuesResponse {
    #[serde(default)]
    pub last_access: Option<String>,
    #[serde(default)]
    pub values: Vec<RawValue>,
}

/// Values without a `value` field are placeholders and get dropped.
/// An explicit `"value": null` is a reading and is kept.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawValue {
    pub value_id: i64,
    #[serde(default, deserialize_with = "present")]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub state: Option<i64>,
}

/// `Some` for any field that is present, `null` included.
fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl RawValue {
    pub(crate) fn into_value(self) -> Option<Value> {
        let value = self.value?;
        Some(Value {
            value_id: self.value_id,
            value,
            state: self.state,
        })
    }
}
