//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;

use crate::handlers::{
    advance_step, autosave_draft, finalize_application, get_draft, get_session, health, ready,
    reset_password, sign_in, sign_out, sign_up, submit_application, update_password, upload_cv,
    upload_photo, validate_step,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, rate_limit_middleware, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let auth_routes = Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/update-password", post(update_password));

    let application_routes = Router::new()
        .route("/session", get(get_session))
        .route("/application/draft", get(get_draft).put(autosave_draft))
        .route("/application/steps/:step", post(advance_step))
        .route("/application/validate/:step", post(validate_step))
        .route("/application/submit", post(submit_application))
        .route("/application/finalize", post(finalize_application));

    // Size rules are enforced per kind in the handler; the overall cap is
    // the request body limit below.
    let upload_routes = Router::new()
        .route("/uploads/cv", post(upload_cv))
        .route("/uploads/photo", post(upload_photo))
        .layer(DefaultBodyLimit::disable());

    let api_routes = Router::new()
        .merge(auth_routes)
        .merge(application_routes)
        .merge(upload_routes)
        .layer(middleware::from_fn_with_state(
            state.rate_limits.clone(),
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = match metrics_handle {
        Some(handle) => Router::new().route("/metrics", get(move || async move { handle.render() })),
        None => Router::new(),
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
