// Tab view flattening
//
// Maps every tab of the GUI description and merges the per-tab lists into
// one deduplicated list. Tabs are walked last-to-first and the first
// parameter seen for a value id or name is kept, so on collisions the
// parameter of the last declared tab wins.

use std::collections::{HashMap, HashSet};

use crate::mapper::map_parameter;
use crate::models::{Parameter, TabView};

/// Map all descriptors of one tab.
///
/// When the tab carries a heating schema diagram, units annotated on the
/// diagram are injected into the matching descriptors before mapping.
pub fn map_view(view: &TabView) -> Vec<Parameter> {
    let Some(schema) = view.schema_devices.as_ref().and_then(|devices| devices.first()) else {
        return view
            .parameter_descriptors
            .iter()
            .map(|descriptor| map_parameter(descriptor, &view.tab_name))
            .collect();
    };

    let units: HashMap<i64, &str> = schema
        .parameters
        .iter()
        .filter_map(|p| p.unit.as_deref().map(|unit| (p.value_id, unit)))
        .collect();

    view.parameter_descriptors
        .iter()
        .map(|descriptor| match units.get(&descriptor.value_id) {
            Some(unit) => {
                let mut enriched = descriptor.clone();
                enriched.unit = Some((*unit).to_owned());
                map_parameter(&enriched, &view.tab_name)
            }
            None => map_parameter(descriptor, &view.tab_name),
        })
        .collect()
}

/// Flatten all tabs into one list with unique value ids and unique names.
pub fn flatten_views(views: &[TabView]) -> Vec<Parameter> {
    let mut per_view: Vec<Vec<Parameter>> = views.iter().map(map_view).collect();
    per_view.reverse();

    let mut seen_ids = HashSet::new();
    let mut seen_names = HashSet::new();
    let mut flattened = Vec::new();

    for param in per_view.into_iter().flatten() {
        if seen_ids.contains(&param.value_id()) || seen_names.contains(param.name()) {
            continue;
        }
        seen_ids.insert(param.value_id());
        seen_names.insert(param.name().to_owned());
        flattened.push(param);
    }

    flattened
}
