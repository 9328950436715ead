use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webcache_engine::{CacheEngine, RedisKv};
use webcache_gateway::{handler, GatewayConfig, ReqwestOrigin};
use webcache_types::{SystemClock, SystemEntropy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env();
    tracing::info!(
        bind = %config.bind,
        redis = %config.redis_url,
        origin = %config.origin_url,
        "starting webcache gateway"
    );

    let kv = RedisKv::connect(&config.redis_url).await?;
    let origin = ReqwestOrigin::new(
        &config.origin_url,
        config.connect_timeout,
        config.read_timeout,
    )?;
    let engine = Arc::new(CacheEngine::new(
        Arc::new(kv),
        Arc::new(origin),
        Arc::new(SystemClock),
        Arc::new(SystemEntropy),
        config.engine.clone(),
    ));

    let app = handler::router(handler::AppState { engine })
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
