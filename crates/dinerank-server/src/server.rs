use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use dinerank_cache::{CacheStore, create_cache_store};
use dinerank_engine::RankingEngine;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{config::AppConfig, handlers, seed, service::RestaurantService};

const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RestaurantService>,
}

pub struct DineRankServer {
    addr: SocketAddr,
    app: Router,
}

/// Build the engine, cache store and router for `cfg`.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let engine = Arc::new(RankingEngine::new());
    if cfg.bootstrap.seed_sample_data {
        seed::seed_sample_data(&engine)?;
    }
    let store = create_cache_store(&cfg.redis).await;
    tracing::info!(mode = store.mode(), "cache store selected");
    spawn_expiry_sweep(Arc::clone(&store));

    let service = Arc::new(RestaurantService::new(engine, store, cfg));
    Ok(router(AppState { service }, cfg.server.body_limit_bytes))
}

/// Periodically drop expired entries from stores without native expiry.
fn spawn_expiry_sweep(store: Arc<dyn CacheStore>) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(EXPIRY_SWEEP_INTERVAL);
        loop {
            tick.tick().await;
            let removed = store.purge_expired();
            if removed > 0 {
                tracing::debug!(removed, "expired cache entries purged");
            }
        }
    });
}

pub fn router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/api/restaurants",
            get(handlers::list_restaurants).post(handlers::create_restaurant),
        )
        .route("/api/restaurants/top", get(handlers::top_restaurants))
        .route("/api/restaurants/stats", get(handlers::ranking_stats))
        .route("/api/restaurants/search", get(handlers::search_restaurants))
        .route(
            "/api/restaurants/{id}",
            get(handlers::get_restaurant).put(handlers::update_restaurant),
        )
        .route(
            "/api/restaurants/{id}/deactivate",
            post(handlers::deactivate_restaurant),
        )
        .route(
            "/api/restaurants/{id}/percentile",
            get(handlers::restaurant_percentile),
        )
        .route("/api/cache/stats", get(handlers::cache_stats))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = tracing::field::Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<DineRankServer> {
        let app = build_app(&self.config).await?;
        Ok(DineRankServer {
            addr: self.addr,
            app,
        })
    }
}

impl DineRankServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn app() -> Router {
        let mut cfg = AppConfig::default();
        cfg.bootstrap.seed_sample_data = true;
        build_app(&cfg).await.unwrap()
    }

    #[tokio::test]
    async fn top_route_uses_default_k() {
        let resp = app()
            .await
            .oneshot(
                Request::get("/api/restaurants/top")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_query_string_is_a_stable_400() {
        let resp = app()
            .await
            .oneshot(
                Request::get("/api/restaurants/top?k=many")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_id_is_404() {
        let resp = app()
            .await
            .oneshot(
                Request::get("/api/restaurants/999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
