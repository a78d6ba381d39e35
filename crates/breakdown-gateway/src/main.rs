use breakdown_gateway::config::GatewayConfig;
use breakdown_gateway::routes;
use breakdown_gateway::state::AppState;
use media_pipeline::PipelineConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::logging::init_with_service("breakdown-gateway");

    let gateway_config = GatewayConfig::from_env()?;
    let pipeline_config = PipelineConfig::from_env()?;
    let state = AppState::new(pipeline_config);
    let shutdown = state.shutdown_token();

    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(&gateway_config.bind_addr).await?;
    info!(addr = %gateway_config.bind_addr, "breakdown gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received, cancelling in-flight runs");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
