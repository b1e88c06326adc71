//! Event streaming: subscribe to bridge callbacks and print events as they
//! arrive, until interrupted.
//!
//! Flow: init the client, start a callback listener, register the client,
//! ask the bridge to add the listener's URL as a subscription, then stream.
//! On Ctrl-C the bridge-side subscription is removed again (best effort,
//! matched by URL) before the listener shuts down.

use chrono::Utc;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use nukli_api::BridgeClient;
use nukli_listener::{CallbackListener, ListenerEvent};

use crate::cli::{EventlogArgs, GlobalOpts};
use crate::error::CliError;

pub async fn handle(
    client: &BridgeClient,
    args: EventlogArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    client.init().await?;

    let listener = CallbackListener::new(0);
    spawn_lifecycle_logger(listener.subscribe());

    // Subscribe before registering so the first event cannot slip past.
    let mut events = client.events();
    let callback_url = listener.add_client(client).await?;

    let response = client.callback_add(&callback_url).await?;
    if !response
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        let message = response
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("callback subscription rejected")
            .to_owned();
        listener.remove_client(client).await?;
        return Err(CliError::Rejected { message });
    }
    if !global.quiet {
        eprintln!("streaming events from {} (Ctrl-C to stop)", callback_url);
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => print_event(&event, &args),
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c => break,
        }
    }

    cleanup(client, &listener, &callback_url).await
}

/// Remove the bridge-side subscription matching our URL, then deregister
/// from the listener (which closes it, being the only client).
async fn cleanup(
    client: &BridgeClient,
    listener: &CallbackListener,
    callback_url: &str,
) -> Result<(), CliError> {
    match client.callbacks().await {
        Ok(subscriptions) => {
            for subscription in subscriptions.iter().filter(|s| s.url == callback_url) {
                info!(
                    id = subscription.id,
                    url = %subscription.url,
                    "removing bridge subscription"
                );
                if let Err(err) = client.callback_remove(subscription.id).await {
                    warn!(error = %err, "failed to remove bridge subscription");
                }
            }
        }
        Err(err) => warn!(error = %err, "could not enumerate bridge subscriptions"),
    }
    listener.remove_client(client).await?;
    Ok(())
}

fn spawn_lifecycle_logger(
    mut lifecycle: tokio::sync::broadcast::Receiver<ListenerEvent>,
) {
    tokio::spawn(async move {
        loop {
            match lifecycle.recv().await {
                Ok(ListenerEvent::Listening(url)) => info!("listening on {url}"),
                Ok(ListenerEvent::Close(url)) => info!("closed {url}"),
                Ok(ListenerEvent::Error(message)) => warn!("listener: {message}"),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn print_event(event: &Value, args: &EventlogArgs) {
    let rendered = if args.compact {
        event.to_string()
    } else {
        serde_json::to_string_pretty(event).unwrap_or_else(|_| event.to_string())
    };
    if args.service {
        println!("{rendered}");
    } else {
        println!("[{}] {rendered}", Utc::now().format("%Y-%m-%dT%H:%M:%SZ"));
    }
}
