//! Bridge-level command handlers (auth, info, log, maintenance).

use nukli_api::BridgeClient;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// Obtain a token. The bridge only hands one out while its button is
/// pressed, so the client runs with the long auth timeout and the user is
/// prompted on stderr; the token itself goes to stdout.
pub async fn auth(client: &BridgeClient, global: &GlobalOpts) -> Result<(), CliError> {
    if !global.quiet {
        eprintln!("press the button on the Nuki bridge to obtain a token");
    }
    match client.auth().await? {
        Some(token) => {
            output::print_output(&token, false);
            Ok(())
        }
        None => Err(CliError::AuthPending),
    }
}

pub async fn info(client: &BridgeClient, global: &GlobalOpts) -> Result<(), CliError> {
    let body = client.info().await?;
    output::print_output(&output::render_value(&global.output, &body), global.quiet);
    Ok(())
}

pub async fn getlog(client: &BridgeClient, global: &GlobalOpts) -> Result<(), CliError> {
    let body = client.log().await?;
    output::print_output(&output::render_value(&global.output, &body), global.quiet);
    Ok(())
}

pub async fn clearlog(client: &BridgeClient, global: &GlobalOpts) -> Result<(), CliError> {
    let body = client.clearlog().await?;
    output::print_output(&output::render_value(&global.output, &body), global.quiet);
    Ok(())
}

pub async fn reboot(client: &BridgeClient, global: &GlobalOpts) -> Result<(), CliError> {
    let body = client.reboot().await?;
    output::print_output(&output::render_value(&global.output, &body), global.quiet);
    Ok(())
}

pub async fn fwupdate(client: &BridgeClient, global: &GlobalOpts) -> Result<(), CliError> {
    let body = client.fwupdate().await?;
    output::print_output(&output::render_value(&global.output, &body), global.quiet);
    Ok(())
}

pub async fn list(client: &BridgeClient, global: &GlobalOpts) -> Result<(), CliError> {
    let body = client.list().await?;
    output::print_output(&output::render_value(&global.output, &body), global.quiet);
    Ok(())
}
