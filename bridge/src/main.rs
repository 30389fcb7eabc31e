// platform-bridge - device capability query host
// Entry point: serves the bridge channel over stdin/stdout

use platform_bridge::{app, host};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging; stdout carries responses, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "platform_bridge=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting platform bridge host");

    let state = app::setup();
    let served = host::serve_stdio(state.messenger, state.channel.name()).await?;

    tracing::info!("Input closed after {} requests", served);
    Ok(())
}
