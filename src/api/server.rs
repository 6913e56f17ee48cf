use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    http::{Method, StatusCode},
    routing::{any, get},
    Router,
};
use bytes::Bytes;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::{
    api::dispatch::dispatch_blocking,
    config::HttpConfig,
    error::{JsondsError, Result},
    metrics,
    registry::{Endpoint, Registry},
};

async fn status_ok(method: Method) -> (StatusCode, &'static str) {
    debug!(method = %method, "root endpoint called");
    (StatusCode::OK, "OK")
}

async fn metrics_text() -> String {
    metrics::gather()
}

/// Builds the router serving every configured endpoint.
///
/// Paths must start with `/` and be unique across endpoints and the metrics
/// route.
pub fn build_router(registry: Arc<Registry>, metrics_path: Option<&str>) -> Result<Router> {
    let mut seen = HashSet::new();
    let mut claim = |path: &str| -> Result<()> {
        if !path.starts_with('/') {
            return Err(JsondsError::Config(format!("path {:?} must start with '/'", path)));
        }
        if !seen.insert(path.to_string()) {
            return Err(JsondsError::Config(format!("path {:?} is used more than once", path)));
        }
        Ok(())
    };

    let routes: Vec<(Endpoint, String)> = registry
        .endpoints()
        .map(|(endpoint, path)| (endpoint, path.to_string()))
        .collect();

    let mut router = Router::new();
    for (endpoint, path) in routes {
        claim(&path)?;
        if endpoint == Endpoint::Root {
            router = router.route(&path, get(status_ok));
            continue;
        }

        let registry = registry.clone();
        router = router.route(
            &path,
            any(move |method: Method, body: Bytes| {
                let registry = registry.clone();
                async move { dispatch_blocking(registry, endpoint, method, body).await }
            }),
        );
    }

    if let Some(path) = metrics_path {
        claim(path)?;
        router = router.route(path, get(metrics_text));
    }

    Ok(router.layer(TraceLayer::new_for_http()))
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn serve(config: &HttpConfig, registry: Arc<Registry>) -> Result<()> {
    let app = build_router(registry, config.metrics_path.as_deref())?;

    let listener = TcpListener::bind(&config.address).await.map_err(|e| {
        JsondsError::Internal(format!("Failed to bind to address {}: {}", config.address, e))
    })?;
    info!("Starting JSON datasource on {}", config.address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| JsondsError::Internal(format!("Server error: {}", e)))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
