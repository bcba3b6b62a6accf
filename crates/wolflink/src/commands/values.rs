//! Live value reads.

use std::collections::HashMap;

use serde::Serialize;
use tabled::Tabled;
use tracing::debug;
use wolflink_api::{Parameter, PortalClient, Value};

use crate::cli::{GlobalOpts, OutputFormat, ValuesArgs};
use crate::error::CliError;
use crate::output;

use super::util;

/// A value joined with the parameter it belongs to.
#[derive(Debug, Serialize)]
pub struct Reading {
    pub value_id: i64,
    pub tab: String,
    pub name: String,
    /// Human form: list text or value with unit.
    pub display: String,
    pub raw: serde_json::Value,
    pub state: Option<i64>,
}

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Value ID")]
    value_id: i64,
    #[tabled(rename = "Tab")]
    tab: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    display: String,
}

impl From<&Reading> for ReadingRow {
    fn from(r: &Reading) -> Self {
        Self {
            value_id: r.value_id,
            tab: r.tab.clone(),
            name: r.name.clone(),
            display: r.display.clone(),
        }
    }
}

/// Pair values with their parameters, in parameter order.
///
/// Values for ids that were not requested are dropped.
pub fn readings(parameters: &[Parameter], values: Vec<Value>) -> Vec<Reading> {
    let mut by_id: HashMap<i64, Value> = values.into_iter().map(|v| (v.value_id, v)).collect();

    let readings: Vec<Reading> = parameters
        .iter()
        .filter_map(|p| {
            let value = by_id.remove(&p.value_id())?;
            Some(Reading {
                value_id: p.value_id(),
                tab: p.parent().to_owned(),
                name: p.name().to_owned(),
                display: p.display_value(&value),
                raw: value.value,
                state: value.state,
            })
        })
        .collect();

    if !by_id.is_empty() {
        debug!(count = by_id.len(), "dropping values without a matching parameter");
    }
    readings
}

pub fn render(format: &OutputFormat, readings: &[Reading]) -> Result<String, CliError> {
    output::render_list(
        format,
        readings,
        |r| ReadingRow::from(r),
        |r| format!("{}\t{}", r.value_id, r.display),
    )
}

pub async fn handle(
    client: &PortalClient,
    args: ValuesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let system = util::resolve_system(client, &args.system).await?;
    let parameters =
        util::select_parameters(client, &system, args.tab.as_deref(), &args.value_ids).await?;

    let values = client
        .fetch_values(system.gateway_id, system.id, &parameters)
        .await?;

    let out = render(&global.output, &readings(&parameters, values))?;
    output::print_output(&out, global.quiet);
    Ok(())
}
