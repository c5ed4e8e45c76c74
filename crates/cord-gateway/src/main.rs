//! Demo client: connects, logs incoming messages until Ctrl-C
//!
//! Run with:
//! ```bash
//! CORD_TOKEN=... cargo run -p cord-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use cord_common::{try_init_tracing_with_config, ClientConfig, TracingConfig};
use cord_gateway::{Client, Event, EventKind, GatewayConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(&config).await {
        error!(error = %e, "Client failed");
        std::process::exit(1);
    }
}

async fn run(config: &ClientConfig) -> anyhow::Result<()> {
    info!(?config, "Starting client");

    let client = Client::builder(GatewayConfig::from(config))
        .listener(EventKind::MessageCreate, |event: &Event| -> anyhow::Result<()> {
            if let Event::MessageCreate { message } = event {
                let message = message.read();
                info!(
                    channel_id = %message.channel_id,
                    author_id = %message.author.id(),
                    content = message.preview(80),
                    "Message"
                );
            }
            Ok(())
        })
        .listener(EventKind::LostConnection, |_: &Event| -> anyhow::Result<()> {
            info!("Connection lost");
            Ok(())
        })
        .connect()
        .await?;

    if let Some(user) = client.yourself() {
        info!(user = %user.read().tag(), servers = client.cache().servers().len(), "Connected");
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    client.disconnect().await;
    Ok(())
}
