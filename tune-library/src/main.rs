use anyhow::Result;
use tune_core::TuneConfig;
use tune_library::{LibrarySettings, ENV_PREFIX};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let mut config = TuneConfig::new();
    config.load_env(ENV_PREFIX);

    let addr = LibrarySettings::from_config(&config)?.addr();
    let ax = tune_library::build(config).await?;

    tracing::info!("[tune] serving on http://{addr}");
    ax.listen(addr).await?;

    Ok(())
}
