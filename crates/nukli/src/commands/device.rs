//! Paired-device command handlers.
//!
//! Device type and action codes are validated by the clap value parsers, so
//! a bad code never reaches the network.

use nukli_api::BridgeClient;

use crate::cli::{DeviceArgs, GlobalOpts, LockActionArgs};
use crate::error::CliError;
use crate::output;

pub async fn lock_state(
    client: &BridgeClient,
    args: DeviceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let body = client.lock_state(args.nuki_id, args.device_type).await?;
    output::print_output(&output::render_value(&global.output, &body), global.quiet);
    Ok(())
}

pub async fn lock(
    client: &BridgeClient,
    args: DeviceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let body = client.lock(args.nuki_id, args.device_type).await?;
    output::print_output(&output::render_value(&global.output, &body), global.quiet);
    Ok(())
}

pub async fn unlock(
    client: &BridgeClient,
    args: DeviceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let body = client.unlock(args.nuki_id, args.device_type).await?;
    output::print_output(&output::render_value(&global.output, &body), global.quiet);
    Ok(())
}

pub async fn lock_action(
    client: &BridgeClient,
    args: LockActionArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let body = client
        .lock_action(args.nuki_id, args.device_type, args.action)
        .await?;
    output::print_output(&output::render_value(&global.output, &body), global.quiet);
    Ok(())
}
