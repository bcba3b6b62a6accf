// Parameter descriptor classification
//
// Turns one raw GUI descriptor into exactly one `Parameter` variant.
// A recognized unit wins over list items; an unrecognized unit makes the
// parameter `Simple` even when the descriptor also carries list items.

use crate::models::{ListItem, Parameter, ParameterInfo, RawDescriptor};

pub const CELSIUS_TEMPERATURE: &str = "°C";
pub const BAR: &str = "bar";
pub const PERCENTAGE: &str = "%";
pub const HOUR: &str = "Std";

/// Classify a descriptor declared on the tab named `parent`.
pub fn map_parameter(descriptor: &RawDescriptor, parent: &str) -> Parameter {
    let info = ParameterInfo {
        value_id: descriptor.value_id,
        name: descriptor.name.clone(),
        parent: parent.to_owned(),
        parameter_id: descriptor.parameter_id,
    };

    if let Some(unit) = descriptor.unit.as_deref() {
        return match unit {
            CELSIUS_TEMPERATURE => Parameter::Temperature(info),
            BAR => Parameter::Pressure(info),
            PERCENTAGE => Parameter::Percentage(info),
            HOUR => Parameter::Hours(info),
            _ => Parameter::Simple(info),
        };
    }

    match descriptor.list_items.as_deref() {
        Some(items) => Parameter::ListItem {
            info,
            items: items
                .iter()
                .map(|item| ListItem {
                    value: item.value.clone(),
                    display_text: item.display_text.clone(),
                })
                .collect(),
        },
        None => Parameter::Simple(info),
    }
}
