use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Request, State};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use common_auth::{JwtVerifier, TokenSigner};
use common_observability::ServiceMetrics;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServiceConfig;
use crate::guard::Guard;
use crate::handlers;
use crate::store::Store;

pub const SERVICE_NAME: &str = "restaurant-service";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub signer: Arc<TokenSigner>,
    pub guard: Guard,
    pub config: Arc<ServiceConfig>,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Wires signer, verifier and guard around `store` using the shared JWT secret.
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> anyhow::Result<Self> {
        let signer = TokenSigner::new(&config.jwt_secret, config.jwt.clone())
            .context("Failed to build token signer")?;
        let verifier = JwtVerifier::new(&config.jwt_secret, config.jwt.clone())
            .context("Failed to build token verifier")?;
        let guard = Guard::new(Arc::new(verifier), store.clone());
        info!(issuer = %config.jwt.issuer, ttl_seconds = config.jwt.ttl_seconds, "JWT signer initialised");

        Ok(Self {
            store,
            signer: Arc::new(signer),
            guard,
            config: Arc::new(config),
            metrics: Arc::new(ServiceMetrics::new()),
        })
    }
}

pub async fn http_error_metrics(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let resp = next.run(req).await;
    let status = resp.status();
    if status.as_u16() >= 400 {
        let code = resp
            .headers()
            .get("X-Error-Code")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        state
            .metrics
            .http_errors_total
            .with_label_values(&[SERVICE_NAME, code, status.as_str()])
            .inc();
    }
    resp
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            state
                .config
                .cors_allowed_origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION]);

    Router::new()
        .route("/healthz", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/documentation", get(handlers::documentation))
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/menu", get(handlers::list_menu))
        .route("/menu/:id", post(handlers::place_order))
        .route("/admin/menu", post(handlers::add_menu_item))
        .route("/admin/menu/:id", delete(handlers::remove_menu_item))
        .route("/admin/revenue", get(handlers::revenue))
        .route("/admin/:id", patch(handlers::update_order_status))
        .layer(middleware::from_fn_with_state(state.clone(), http_error_metrics))
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
