//! System listing.

use tabled::Tabled;
use wolflink_api::{Device, PortalClient};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct SystemRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Gateway")]
    gateway_id: i64,
}

impl From<&Device> for SystemRow {
    fn from(d: &Device) -> Self {
        Self {
            id: d.id,
            name: d.name.clone(),
            gateway_id: d.gateway_id,
        }
    }
}

pub async fn handle(client: &PortalClient, global: &GlobalOpts) -> Result<(), CliError> {
    let systems = client.fetch_system_list().await?;
    let out = output::render_list(
        &global.output,
        &systems,
        |d| SystemRow::from(d),
        |d| d.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
