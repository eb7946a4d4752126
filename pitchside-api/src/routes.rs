use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

const MAX_BODY_SIZE: usize = 1024 * 1024;

/// CORS is driven by `CORS_ALLOWED_ORIGINS`: a comma-separated origin
/// list, or `*` to allow any origin. Unset denies cross-origin use;
/// the club frontend is served same-origin in production and needs no
/// CORS at all.
fn cors_layer() -> CorsLayer {
    let origin = match std::env::var("CORS_ALLOWED_ORIGINS") {
        Ok(origins) if origins.trim() == "*" => {
            tracing::warn!("CORS_ALLOWED_ORIGINS=*, allowing any origin");
            AllowOrigin::any()
        }
        Ok(origins) if !origins.trim().is_empty() => parse_origin_list(&origins),
        _ => {
            tracing::warn!(
                "CORS_ALLOWED_ORIGINS not set, denying cross-origin requests. \
                 Set CORS_ALLOWED_ORIGINS=* for development or list allowed origins."
            );
            AllowOrigin::list(Vec::new())
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

fn parse_origin_list(raw: &str) -> AllowOrigin {
    let origins: Vec<HeaderValue> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS contained no usable origins, denying cross-origin requests");
        AllowOrigin::list(Vec::new())
    } else {
        tracing::info!(count = origins.len(), "CORS restricted to configured origins");
        AllowOrigin::list(origins)
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_v1())
        .layer(cors_layer())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_v1() -> Router<AppState> {
    Router::new()
        .nest("/subscribers", subscriber_routes())
        .nest("/notifications", notification_routes())
}

fn subscriber_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_subscribers))
        .route("/{user_id}", get(handlers::get_subscriber))
        .route("/{user_id}/channels", put(handlers::upsert_channel))
        .route(
            "/{user_id}/channels/{provider}",
            delete(handlers::remove_channel),
        )
}

fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::send_notification))
        .route("/recent", get(handlers::recent_dispatches))
}
