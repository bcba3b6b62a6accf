//! Parameter catalogue of a system.

use tabled::Tabled;
use wolflink_api::{Parameter, PortalClient};

use crate::cli::{GlobalOpts, ParametersArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct ParameterRow {
    #[tabled(rename = "Value ID")]
    value_id: i64,
    #[tabled(rename = "Tab")]
    tab: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Unit")]
    unit: String,
}

impl From<&Parameter> for ParameterRow {
    fn from(p: &Parameter) -> Self {
        let kind = match p {
            Parameter::ListItem { items, .. } => format!("{} ({} options)", p.kind(), items.len()),
            _ => p.kind().to_string(),
        };
        Self {
            value_id: p.value_id(),
            tab: p.parent().to_owned(),
            name: p.name().to_owned(),
            kind,
            unit: p.unit().unwrap_or_default().to_owned(),
        }
    }
}

pub async fn handle(
    client: &PortalClient,
    args: ParametersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let system = util::resolve_system(client, &args.system).await?;
    let parameters = util::select_parameters(client, &system, args.tab.as_deref(), &[]).await?;

    let out = output::render_list(
        &global.output,
        &parameters,
        |p| ParameterRow::from(p),
        |p| p.value_id().to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
