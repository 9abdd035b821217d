use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::health::root))
        .routes(routes!(handlers::files::download_file))
        .routes(routes!(handlers::files::list_files))
        .routes(routes!(handlers::files::delete_file))
        .merge(upload_routes(config))
}

fn upload_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::upload::upload_file))
        .layer(handlers::upload::upload_body_limit(config.upload.max_bytes))
}
