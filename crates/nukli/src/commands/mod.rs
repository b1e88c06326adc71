//! Command dispatch: bridges CLI args -> client operations -> output.

pub mod bridge;
pub mod callback;
pub mod device;
pub mod discover;
pub mod eventlog;
pub mod util;

use nukli_api::BridgeClient;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a bridge-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    client: &BridgeClient,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Auth => bridge::auth(client, global).await,
        Command::Info => bridge::info(client, global).await,
        Command::Getlog => bridge::getlog(client, global).await,
        Command::Clearlog => bridge::clearlog(client, global).await,
        Command::Reboot => bridge::reboot(client, global).await,
        Command::Fwupdate => bridge::fwupdate(client, global).await,
        Command::List => bridge::list(client, global).await,
        Command::LockState(args) => device::lock_state(client, args, global).await,
        Command::Lock(args) => device::lock(client, args, global).await,
        Command::Unlock(args) => device::unlock(client, args, global).await,
        Command::LockAction(args) => device::lock_action(client, args, global).await,
        Command::Eventlog(args) => eventlog::handle(client, args, global).await,
        Command::CallbackList => callback::list(client, global).await,
        Command::CallbackRemove(args) => callback::remove(client, args, global).await,
        // Discover and Completions are handled before a client exists.
        Command::Discover | Command::Completions(_) => unreachable!(),
    }
}
