use pixelforge_api::config::ApiConfig;

#[tokio::main]
async fn main() {
    pixelforge_observability::init();

    let config = ApiConfig::from_env();
    let (app, worker) = pixelforge_api::app::build_app(&config)
        .await
        .unwrap_or_else(|e| panic!("failed to build application: {e}"));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {e}", config.bind_addr));

    tracing::info!("listening on {}", config.bind_addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "server exited with error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    worker.shutdown().await;
}
