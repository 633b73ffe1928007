pub use crate::common::RouteResult;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::HeaderValue,
    routing::get,
    Json, Router,
};
use cache::EphemeralStore;
use orchestrator::Services;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod common;

#[derive(Clone, FromRef)]
pub struct WebState {
    pub services: Arc<Services>,
}

impl auth::AuthState for WebState {
    fn jwt_secret(&self) -> &str {
        self.services.config.jwt_secret.as_str()
    }
}

pub async fn start_web_server(state: WebState) -> std::io::Result<()> {
    let port = state.services.config.port;
    let cors = build_cors(&state.services.config.cors_origin);

    let routes = Router::new()
        .route("/health", get(health))
        .with_state(state.clone())
        .nest_service("/api", api::routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "listening");
    axum::serve(listener, routes.into_make_service()).await?;

    Ok(())
}

/// Permissive when `cors_origin` is the `*` default; otherwise locked to the
/// single configured frontend origin.
fn build_cors(cors_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if cors_origin == "*" {
        layer.allow_origin(Any)
    } else {
        match cors_origin.parse::<HeaderValue>() {
            Ok(origin) => layer.allow_origin(origin),
            Err(_) => {
                tracing::warn!(cors_origin, "invalid CORS_ORIGIN, falling back to permissive");
                layer.allow_origin(Any)
            }
        }
    }
}

/// Liveness/readiness probe. Pings the database and the ephemeral cache so
/// an orchestrator deployment can tell "process is up" apart from
/// "process can actually serve traffic".
async fn health(axum::extract::State(state): axum::extract::State<WebState>) -> Json<serde_json::Value> {
    let db_ok = sqlx::query("SELECT 1")
        .execute(state.services.db.pool())
        .await
        .is_ok();
    let cache_ok = state.services.cache.set("health:probe", "1", std::time::Duration::from_secs(5))
        .await
        .is_ok();

    Json(json!({
        "success": true,
        "data": { "status": if db_ok && cache_ok { "ok" } else { "degraded" }, "database": db_ok, "cache": cache_ok }
    }))
}
