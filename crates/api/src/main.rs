use anyhow::Context;

use gatehouse_api::config::GatekeeperConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gatehouse_observability::init();

    let config = GatekeeperConfig::from_env()?;
    let bind_addr = config.bind_addr;
    let app = gatehouse_api::app::build_app(config)?;

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
