//! Periodic value polling.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use wolflink_api::{Error, PortalClient};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::{util, values};

/// Poll until Ctrl-C. A device that misses one read is retried on the
/// next tick; any other failure ends the watch.
pub async fn handle(
    client: &PortalClient,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let WatchArgs { values: args, interval } = args;
    let system = util::resolve_system(client, &args.system).await?;
    let parameters =
        util::select_parameters(client, &system, args.tab.as_deref(), &args.value_ids).await?;

    info!(system = %system.name, parameters = parameters.len(), interval, "watching values");

    let mut ticker = tokio::time::interval(Duration::from_secs(interval));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result?;
                debug!("watch interrupted");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        match client
            .fetch_values(system.gateway_id, system.id, &parameters)
            .await
        {
            Ok(fetched) => {
                if matches!(global.output, OutputFormat::Table) && !global.quiet {
                    eprintln!("── {} ──", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
                }
                let out = values::render(&global.output, &values::readings(&parameters, fetched))?;
                output::print_output(&out, global.quiet);
            }
            Err(Error::ParameterRead { .. }) => {
                warn!(system = %system.name, "device did not answer, polling again in {interval}s");
            }
            Err(e) => return Err(e.into()),
        }
    }
}
