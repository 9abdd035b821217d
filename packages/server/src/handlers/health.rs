#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    operation_id = "root",
    summary = "Liveness banner",
    responses((status = 200, description = "Service is up", body = String, content_type = "text/plain")),
)]
pub async fn root() -> &'static str {
    "File compression service is running"
}
