mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nukli_api::BridgeClient;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Shell completions generation needs no bridge
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "nukli", &mut std::io::stdout());
            Ok(())
        }

        // Discovery talks to the cloud directory, not a bridge
        Command::Discover => commands::discover::handle(&cli.global).await,

        // All other commands require a bridge client
        cmd => {
            let for_auth = matches!(cmd, Command::Auth);
            let bridge_config = config::resolve(&cli.global, for_auth)?;
            let client = BridgeClient::new(bridge_config)?;
            commands::util::spawn_observer(client.observe());

            tracing::debug!(command = ?cmd, host = client.host(), "dispatching command");
            commands::dispatch(cmd, &client, &cli.global).await
        }
    }
}
