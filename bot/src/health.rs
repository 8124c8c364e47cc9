use axum::{routing::get, Router};

/// Minimal liveness endpoint for the hosting platform's process supervision.
/// Failures here are logged and never take moderation down.
pub async fn serve(port: u16) {
    let app = Router::new().route("/", get(|| async { "Bot is running" }));

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("could not bind health endpoint on port {port}: {e}");
            return;
        }
    };

    log::info!("health endpoint listening on port {port}");
    if let Err(e) = axum::serve(listener, app).await {
        log::error!("health endpoint failed: {e}");
    }
}
