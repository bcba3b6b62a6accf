//! Gateway online state.

use serde::Serialize;
use wolflink_api::PortalClient;

use crate::cli::{GlobalOpts, SystemArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct SystemStatus {
    system_id: i64,
    gateway_id: i64,
    name: String,
    online: bool,
}

pub async fn handle(
    client: &PortalClient,
    args: SystemArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let system = util::resolve_system(client, &args.system).await?;
    let online = client
        .fetch_system_state(system.id, system.gateway_id)
        .await?;

    let status = SystemStatus {
        system_id: system.id,
        gateway_id: system.gateway_id,
        name: system.name,
        online,
    };
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &status,
        |s| {
            format!(
                "{} ({}): {}",
                s.name,
                s.system_id,
                output::online_label(s.online, color)
            )
        },
        |s| output::online_label(s.online, false),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
