//! Shared helpers for command handlers.

use wolflink_api::{Device, Parameter, PortalClient};

use crate::error::CliError;

/// Resolve a system identifier (numeric id or name) against the account.
pub async fn resolve_system(client: &PortalClient, identifier: &str) -> Result<Device, CliError> {
    let systems = client.fetch_system_list().await?;
    find_system(systems, identifier)
}

/// Id match wins over a name match; names compare case-insensitively.
pub fn find_system(mut systems: Vec<Device>, identifier: &str) -> Result<Device, CliError> {
    let id = identifier.parse::<i64>().ok();
    let by_id = systems.iter().position(|s| Some(s.id) == id);
    let by_name = || {
        systems
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(identifier))
    };

    let position = by_id
        .or_else(by_name)
        .ok_or_else(|| not_found(identifier))?;
    Ok(systems.swap_remove(position))
}

fn not_found(identifier: &str) -> CliError {
    CliError::NotFound {
        resource_type: "system".into(),
        identifier: identifier.into(),
        list_command: "systems".into(),
    }
}

/// Narrow a parameter list to one tab and/or a set of value ids.
///
/// An empty `value_ids` keeps every id.
pub fn filter_parameters(
    parameters: Vec<Parameter>,
    tab: Option<&str>,
    value_ids: &[i64],
) -> Vec<Parameter> {
    parameters
        .into_iter()
        .filter(|p| tab.is_none_or(|tab| p.parent().eq_ignore_ascii_case(tab)))
        .filter(|p| value_ids.is_empty() || value_ids.contains(&p.value_id()))
        .collect()
}

/// Fetch and filter the parameters of `system`. Nothing left is an error.
pub async fn select_parameters(
    client: &PortalClient,
    system: &Device,
    tab: Option<&str>,
    value_ids: &[i64],
) -> Result<Vec<Parameter>, CliError> {
    let all = client.fetch_parameters(system.gateway_id, system.id).await?;
    let selected = filter_parameters(all, tab, value_ids);
    if selected.is_empty() && (tab.is_some() || !value_ids.is_empty()) {
        let identifier = tab.map_or_else(
            || {
                value_ids
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            },
            String::from,
        );
        return Err(CliError::NotFound {
            resource_type: "parameter".into(),
            identifier,
            list_command: format!("parameters {}", system.id),
        });
    }
    Ok(selected)
}
