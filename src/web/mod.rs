//! HTTP accessors for the hosting page: emit entries, track interactions,
//! run timers and view, export, download or clear the logs.
mod api;

use crate::logging::Logger;
use anyhow::Result;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

pub fn router(logger: Logger) -> Router {
    Router::new()
        .route("/api/log/:level", post(api::emit))
        .route("/api/interactions", post(api::track_interaction))
        .route("/api/location", put(api::set_location))
        .route("/api/logs", get(api::list_logs).delete(api::clear_logs))
        .route("/api/logs/errors", get(api::list_errors))
        .route("/api/logs/export", get(api::export_logs))
        .route("/api/logs/download", post(api::download_logs))
        .route(
            "/api/timers/:label",
            post(api::start_timer).delete(api::end_timer),
        )
        .layer(CorsLayer::permissive())
        .with_state(logger)
}

pub async fn start_server(logger: Logger, port: u16) -> Result<()> {
    let app = router(logger);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Web server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("Web server stopped");
    Ok(())
}
