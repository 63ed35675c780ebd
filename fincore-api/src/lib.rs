//! HTTP surface from spec.md §6, grounded on the teacher's `rpc` crate's
//! use of `axum` + `tower-http`. Unlike the teacher's single JSON-RPC
//! dispatch table, fincore exposes a small REST surface — one route per
//! operation in [`fincore_coordinator::Coordinator`] — so this crate is
//! a router builder rather than a method registry.

mod envelope;
mod error;
mod identity;
mod logging;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

use fincore_config::Config;
use fincore_coordinator::Coordinator;

pub use error::ApiError;
pub use identity::Identity;

/// Shared, cheaply-cloned handle every route extracts via `State`.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(coordinator: Arc<Coordinator>, config: Arc<Config>) -> Self {
        Self { coordinator, config }
    }
}

/// Builds the full router. The caller is responsible for binding and
/// serving it — this crate only describes the surface (spec.md §6).
/// Routes are served behind [`Identity`], which refuses anything that
/// didn't arrive from the configured trusted-gateway address with a
/// valid `X-Kratos-Authenticated-Identity-Id` header, before any
/// transaction opens.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/transfers", routes::transfers::router())
        .nest("/api/cards", routes::cards::router())
        .nest("/api/bills", routes::bills::router())
        .nest("/api/budgets", routes::budgets::router())
        .layer(axum::middleware::from_fn(logging::access_log))
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    use axum::body::Body;
    use axum::extract::connect_info::ConnectInfo;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use fincore_config::Argon2Params;
    use fincore_db::Gateway;

    use super::*;

    fn test_config() -> Config {
        Config {
            aes_key: [9u8; 32],
            database_url: "sqlite::memory:".to_string(),
            trusted_gateway_addr: "127.0.0.1".to_string(),
            bind_address: "0.0.0.0:0".to_string(),
            argon2: Argon2Params::default(),
            default_card_limits: fincore_config::DefaultLimits::default(),
            default_user_daily_limit_cents: 2_000_000,
            default_user_monthly_limit_cents: 20_000_000,
            db_pool_size: 1,
        }
    }

    async fn test_state() -> AppState {
        let gateway = Gateway::connect("sqlite::memory:", 1).await.unwrap();
        gateway.apply_schema().await.unwrap();
        AppState::new(Arc::new(Coordinator::new(gateway)), Arc::new(test_config()))
    }

    #[tokio::test]
    async fn missing_identity_header_is_rejected_before_any_route_logic() {
        let app = router(test_state().await);
        let mut request = Request::builder()
            .method("GET")
            .uri("/api/cards")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 54321)));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn request_from_an_untrusted_peer_is_rejected_even_with_a_header() {
        let app = router(test_state().await);
        let mut request = Request::builder()
            .method("GET")
            .uri("/api/cards")
            .header("x-kratos-authenticated-identity-id", uuid::Uuid::new_v4().to_string())
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9)), 1)));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn trusted_peer_with_a_valid_header_reaches_the_route() {
        let app = router(test_state().await);
        let mut request = Request::builder()
            .method("GET")
            .uri("/api/cards")
            .header("x-kratos-authenticated-identity-id", uuid::Uuid::new_v4().to_string())
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 54321)));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
