//! HTTP router.
//!
//! Layers, outermost first: CORS, then the access log, then the handler.
//! Unknown paths fall through to a JSON 404 in the shared error envelope.

use std::sync::Arc;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::response::error_response;
use crate::api::ApiContext;
use crate::core_state::CoreState;

/// Build the complete application router.
pub fn api_router(core: Arc<CoreState>) -> Router {
    let cors = cors_layer(&core.config().frontend_url);
    build_router(ApiContext::new(core)).layer(cors)
}

fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let api = Router::new()
        .route(
            "/rfps",
            post(endpoints::rfps::create).get(endpoints::rfps::list),
        )
        .route("/rfps/:id", get(endpoints::rfps::detail))
        .route("/rfps/:id/send", post(endpoints::rfps::send))
        .route(
            "/vendors",
            post(endpoints::vendors::create).get(endpoints::vendors::list),
        )
        .route(
            "/vendors/:id",
            get(endpoints::vendors::detail)
                .put(endpoints::vendors::update)
                .delete(endpoints::vendors::remove),
        )
        .route(
            "/proposals/check-emails",
            post(endpoints::proposals::check_emails),
        )
        .route(
            "/proposals/rfp/:rfpId",
            get(endpoints::proposals::list_for_rfp),
        )
        .route(
            "/proposals/rfp/:rfpId/compare",
            get(endpoints::proposals::compare),
        )
        .route("/proposals/:id", get(endpoints::proposals::detail));

    Router::new()
        .route("/health", get(endpoints::health::check))
        .nest("/api", api)
        .fallback(route_not_found)
        .with_state(ctx)
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]);

    match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            tracing::warn!(frontend_url, error = %e, "FRONTEND_URL is not a valid origin; CORS disabled");
            cors
        }
    }
}

async fn route_not_found() -> Response {
    error_response("Route not found", StatusCode::NOT_FOUND, "NOT_FOUND")
}
