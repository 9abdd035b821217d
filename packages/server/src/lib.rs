pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod metadata;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shrink File Compression API",
        version = "1.0.0",
        description = "Upload PDFs and images, get back smaller copies"
    ),
    tags(
        (name = "Files", description = "Upload, download, list and delete compressed files"),
        (name = "Health", description = "Liveness"),
    ),
)]
struct ApiDoc;

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age))
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(routes::api_routes(&state.config))
        .split_for_parts();

    router
        .with_state(state)
        .route(
            "/api-docs/openapi.json",
            axum::routing::get({
                let api = api.clone();
                move || async move { axum::Json(api) }
            }),
        )
        .merge(Scalar::with_url("/scalar", api))
        .layer(cors)
}
