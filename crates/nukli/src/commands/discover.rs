//! Cloud discovery handler. Runs without a bridge client or token.

use std::time::Duration;

use tabled::Tabled;

use nukli_api::{Discovery, DiscoveryConfig, DiscoveredBridge};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct BridgeRow {
    #[tabled(rename = "BRIDGE ID")]
    id: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "PORT")]
    port: u16,
    #[tabled(rename = "UPDATED")]
    updated: String,
}

fn to_row(bridge: &DiscoveredBridge) -> BridgeRow {
    BridgeRow {
        id: bridge
            .bridge_id
            .map_or_else(|| "-".into(), |id| id.to_string()),
        ip: bridge.ip.clone(),
        port: bridge.port,
        updated: bridge.date_updated.clone().unwrap_or_else(|| "-".into()),
    }
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = DiscoveryConfig::default();
    if let Some(timeout) = global.timeout {
        config.timeout = Duration::from_secs(timeout);
    }
    let discovery = Discovery::new(config)?;
    util::spawn_observer(discovery.observe());

    let bridges = discovery.discover().await;
    let rendered = output::render_list(&global.output, &bridges, to_row, |bridge| {
        format!("{}:{}", bridge.ip, bridge.port)
    });
    output::print_output(&rendered, global.quiet);
    Ok(())
}
