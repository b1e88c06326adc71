//! Clap derive structures for the `nukli` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

use nukli_api::{DeviceType, Encryption};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nukli -- command line interface to the Nuki bridge HTTP API
#[derive(Debug, Parser)]
#[command(
    name = "nukli",
    version,
    about = "Manage Nuki bridges and paired locks from the command line",
    long_about = "Command line interface to the Nuki bridge HTTP API.\n\n\
        Talks to a bridge on the local network, discovers bridges through\n\
        the vendor's cloud directory, and can stream push events through a\n\
        local callback listener.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Bridge profile from the config file
    #[arg(long, short = 'p', env = "NB_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Bridge hostname or IP, with an optional :port (default port 8080)
    #[arg(long, short = 'H', env = "NB_HOST", global = true)]
    pub host: Option<String>,

    /// Bridge API token (obtain one with `nukli auth`)
    #[arg(long, short = 'T', env = "NB_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Token protection scheme for authenticated requests
    #[arg(long, short = 'E', value_enum, global = true)]
    pub encryption: Option<EncryptionArg>,

    /// Request timeout in seconds (auth always waits 60s for the button)
    #[arg(
        long,
        short = 't',
        env = "NB_TIMEOUT",
        global = true,
        value_parser = clap::value_parser!(u64).range(1..=60)
    )]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NB_OUTPUT",
        default_value = "json",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Value enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EncryptionArg {
    /// Token in clear text (trusted LAN only)
    None,
    /// Deprecated timestamp+hash scheme (old firmware)
    HashedToken,
    /// Authenticated encryption (default)
    EncryptedToken,
}

impl From<EncryptionArg> for Encryption {
    fn from(value: EncryptionArg) -> Self {
        match value {
            EncryptionArg::None => Encryption::None,
            EncryptionArg::HashedToken => Encryption::HashedToken,
            EncryptionArg::EncryptedToken => Encryption::EncryptedToken,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON (default)
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Pretty table (list-shaped results)
    Table,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover reachable bridges via the vendor's cloud directory
    Discover,

    /// Obtain a bridge token (requires pressing the bridge button)
    Auth,

    /// Show bridge info
    Info,

    /// Fetch the bridge's internal log
    Getlog,

    /// Clear the bridge's internal log
    Clearlog,

    /// Reboot the bridge
    Reboot,

    /// Trigger a firmware update of the bridge and paired devices
    Fwupdate,

    /// List paired devices with their last known states
    #[command(alias = "ls")]
    List,

    /// Refresh and show the state of one paired device
    LockState(DeviceArgs),

    /// Lock a paired device
    Lock(DeviceArgs),

    /// Unlock a paired device
    Unlock(DeviceArgs),

    /// Send a raw action code to a paired device
    LockAction(LockActionArgs),

    /// Subscribe to bridge callbacks and stream events to stdout
    Eventlog(EventlogArgs),

    /// List bridge callback subscriptions
    CallbackList,

    /// Remove a bridge callback subscription
    CallbackRemove(CallbackRemoveArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Per-command arguments ────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DeviceArgs {
    /// Device ID (from `nukli list`)
    pub nuki_id: u64,

    /// Device type: 0 smart lock, 2 opener, 3 smart door, 4 smart lock 3.0
    #[arg(value_parser = parse_device_type)]
    pub device_type: u8,
}

#[derive(Debug, Args)]
pub struct LockActionArgs {
    /// Device ID (from `nukli list`)
    pub nuki_id: u64,

    /// Device type: 0 smart lock, 2 opener, 3 smart door, 4 smart lock 3.0
    #[arg(value_parser = parse_device_type)]
    pub device_type: u8,

    /// Action code 1-5 (lock table, or the opener table for openers)
    #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
    pub action: u8,
}

#[derive(Debug, Args)]
pub struct EventlogArgs {
    /// Compact single-line JSON (no whitespace)
    #[arg(long, short = 'n')]
    pub compact: bool,

    /// Omit timestamps (useful when running as a service)
    #[arg(long, short = 's')]
    pub service: bool,
}

#[derive(Debug, Args)]
pub struct CallbackRemoveArgs {
    /// Subscription ID (from `nukli callback-list`)
    pub id: u64,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Validate a device-type code against the vendor table (1 was never
/// assigned).
fn parse_device_type(value: &str) -> Result<u8, String> {
    let code: u8 = value
        .parse()
        .map_err(|_| format!("{value}: not a device type code"))?;
    DeviceType::from_repr(code)
        .map(|_| code)
        .ok_or_else(|| format!("{value}: unknown device type (expected 0, 2, 3 or 4)"))
}
