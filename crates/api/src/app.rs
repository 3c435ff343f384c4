use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::{AccessRequestStore, Notifier, RedemptionGate, RequestLifecycle};
use persistence::store::PgAccessRequestStore;

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_admin, security_headers_middleware, trace_id,
};
use crate::routes::{health, redeem, reply, requests};
use crate::services::{CompositeNotifier, EmailService, SmsService};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub store: Arc<dyn AccessRequestStore>,
    pub lifecycle: Arc<RequestLifecycle>,
    pub gate: Arc<RedemptionGate>,
}

/// Build the application with its production collaborators: the
/// Postgres store and the SMS/email notifier.
pub fn create_app(config: Config, pool: PgPool) -> Router {
    let config = Arc::new(config);

    let store: Arc<dyn AccessRequestStore> =
        Arc::new(PgAccessRequestStore::new(pool.clone()));
    let notifier: Arc<dyn Notifier> = Arc::new(CompositeNotifier::new(
        SmsService::new(config.notify.clone()),
        EmailService::new(config.notify.clone()),
    ));
    build_router(config, pool, store, notifier)
}

/// Assemble the router from explicit collaborators.
///
/// Tests pass the in-memory store and a recording notifier here to
/// drive full request flows without a database or delivery providers.
pub fn build_router(
    config: Arc<Config>,
    pool: PgPool,
    store: Arc<dyn AccessRequestStore>,
    notifier: Arc<dyn Notifier>,
) -> Router {
    let passcode_ttl = chrono::Duration::days(config.access.passcode_ttl_days);
    let lifecycle = Arc::new(RequestLifecycle::new(
        store.clone(),
        notifier,
        passcode_ttl,
    ));
    let gate = Arc::new(RedemptionGate::new(store.clone()));

    let state = AppState {
        pool,
        config: config.clone(),
        store,
        lifecycle,
        gate,
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Production: only allow specified origins
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/requests", post(requests::create_request))
        .route("/api/v1/redeem", post(redeem::redeem))
        // The reply webhook authenticates itself via HMAC signature
        .route("/api/v1/reply", post(reply::reply));

    // Admin routes (require the static admin key)
    let admin_routes = Router::new()
        .route("/api/v1/admin/requests", get(requests::list_requests))
        .route("/api/v1/admin/requests/:id", get(requests::get_request))
        .route(
            "/api/v1/admin/requests/:id/approve",
            post(requests::approve_request),
        )
        .route(
            "/api/v1/admin/requests/:id/deny",
            post(requests::deny_request),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Merge all routes
    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware)) // Security headers
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware)) // Prometheus metrics
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id)) // Request ID and logging
        .layer(cors)
        .with_state(state)
}
