//! The `/metrics` HTTP endpoint.

use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{error::MetricsError, metrics::registry, runtime::conf::MetricsConf};

async fn metrics_handler() -> impl IntoResponse {
    match tokio::task::spawn_blocking(registry::render).await {
        Ok(Ok(body)) => (StatusCode::OK, body),
        Ok(Err(e)) => {
            error!(
                event.name = "metrics.encode_failed",
                error.message = %e,
                "failed to encode metrics"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {e}"),
            )
        }
        Err(e) => {
            error!(
                event.name = "metrics.gather_failed",
                error.message = %e,
                "metrics gathering task panicked"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to gather metrics".to_string(),
            )
        }
    }
}

fn router() -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
}

/// Serves [`registry::REGISTRY`] at `<listen_address>:<port>/metrics` until
/// the task is dropped or the listener fails.
pub async fn start_metrics_server(conf: MetricsConf) -> Result<(), MetricsError> {
    if !conf.enabled {
        info!(
            event.name = "metrics.disabled",
            "metrics server is disabled in configuration"
        );
        return Ok(());
    }

    let bind_address = format!("{}:{}", conf.listen_address, conf.port);
    let listener =
        TcpListener::bind(&bind_address)
            .await
            .map_err(|source| MetricsError::BindAddress {
                address: bind_address.clone(),
                source,
            })?;

    info!(
        event.name = "metrics.started",
        net.listen.address = %bind_address,
        "metrics server started"
    );

    axum::serve(listener, router())
        .await
        .map_err(MetricsError::Serve)
}
