//! Router configuration for the HTTP API.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::dto::{
    CreateFolderRequest, CreatedFolderResponse, FolderListResponse, UploadResponse,
    UploadedFileResponse,
};
use super::handlers::{self, create_folder, list_folders, upload_files, AppState};
use super::middleware::create_cors_layer;

/// OpenAPI document for the HTTP API.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::folder::list_folders,
        handlers::folder::create_folder,
        handlers::upload::upload_files,
    ),
    components(schemas(
        FolderListResponse,
        CreateFolderRequest,
        CreatedFolderResponse,
        UploadResponse,
        UploadedFileResponse,
    )),
    tags(
        (name = "folders", description = "Upload folders"),
        (name = "upload", description = "File upload")
    )
)]
pub struct ApiDoc;

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    cors_origins: &[String],
    request_timeout: Duration,
) -> Router {
    // Upload size is enforced per file while streaming
    let api_routes = Router::new()
        .route("/folders", get(list_folders).post(create_folder))
        .route(
            "/upload",
            post(upload_files).layer(DefaultBodyLimit::disable()),
        );

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Create the Swagger UI router serving the OpenAPI document.
pub fn create_swagger_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

/// Create a router serving the static frontend, if the directory exists.
pub fn create_static_router(static_path: &str) -> Option<Router> {
    let path = Path::new(static_path);
    if !path.is_dir() {
        tracing::warn!(
            "Static directory {} not found, frontend will not be served",
            static_path
        );
        return None;
    }

    tracing::info!("Serving static files from {}", static_path);
    Some(Router::new().fallback_service(ServeDir::new(path).append_index_html_on_directories(true)))
}
