//! Callback subscription management handlers.

use tabled::Tabled;

use nukli_api::{BridgeClient, CallbackSubscription};

use crate::cli::{CallbackRemoveArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct SubscriptionRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "URL")]
    url: String,
}

fn to_row(subscription: &CallbackSubscription) -> SubscriptionRow {
    SubscriptionRow {
        id: subscription.id,
        url: subscription.url.clone(),
    }
}

pub async fn list(client: &BridgeClient, global: &GlobalOpts) -> Result<(), CliError> {
    let rendered = match global.output {
        OutputFormat::Table | OutputFormat::Plain => {
            let subscriptions = client.callbacks().await?;
            output::render_list(&global.output, &subscriptions, to_row, |s| s.id.to_string())
        }
        _ => {
            let body = client.callback_list().await?;
            output::render_value(&global.output, &body)
        }
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}

pub async fn remove(
    client: &BridgeClient,
    args: CallbackRemoveArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let body = client.callback_remove(args.id).await?;
    output::print_output(&output::render_value(&global.output, &body), global.quiet);
    Ok(())
}
