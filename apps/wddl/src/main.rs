//! wddl entry point.

mod app;
mod config;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting wddl");

    let path = config::config_path(std::env::args().nth(1));
    let config = config::Config::load(&path)?;
    tracing::info!(
        path = %path.display(),
        remote = %config.remote_root.display(),
        input = %config.input,
        output = %config.output.display(),
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("wddl shut down cleanly");
    Ok(())
}
