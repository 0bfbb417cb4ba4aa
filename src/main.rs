use anyhow::Result;
use clap::Parser;
use loxrun::ServerConfig;
use tokio::runtime;
use tracing::debug;

fn setup_tracing() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_timer(fmt::time::ChronoLocal::rfc_3339())
        .finish()
        .with(ErrorLayer::default())
        .init();
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing();

    let config = ServerConfig::parse().resolve()?;
    config.validate()?;

    debug!(?config);

    let runtime = runtime::Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(loxrun::serve(config))
}
