use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::error_handling::HandleErrorLayer;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{HeaderValue, Method, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{BoxError, Router, routing::get};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower_http::cors::CorsLayer;

use super::account::account_router;
use super::repos::repos_router;
use super::response::ApiError;
use crate::auth::IdentityProvider;
use crate::config::ServerConfig;
use crate::store::Store;

/// Lower bound for the request body limit. File content has no size cap of its own.
const MIN_BODY_LIMIT: usize = 16 * 1024 * 1024;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: ServerConfig,
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

async fn handle_timeout(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        tracing::warn!("Request timed out");
        ApiError::unavailable("Service unavailable: request timed out")
    } else {
        tracing::error!("Unhandled middleware error: {err}");
        ApiError::internal(err.to_string())
    }
}

/// Wraps the router so a request running past `timeout` answers 503.
fn with_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout))
            .layer(TimeoutLayer::new(timeout)),
    )
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(_)) => {
            tracing::warn!("Ignoring invalid CORS origin");
            layer
        }
        None => layer,
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let timeout = state.config.request_timeout();
    let cors = cors_layer(state.config.cors_origin.as_deref());
    // A base64 avatar is a third larger than the image it carries.
    let body_limit = MIN_BODY_LIMIT.max(state.config.max_avatar_bytes * 2);

    let routes = Router::new()
        .route("/health", get(health))
        .merge(account_router())
        .merge(repos_router())
        .layer(DefaultBodyLimit::max(body_limit));

    with_timeout(routes, timeout)
        .layer(cors)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
