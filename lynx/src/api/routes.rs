use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use super::handlers;
use super::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root,
        handlers::health_check,
        handlers::get_options,
        handlers::recognize_base64,
        handlers::recognize_upload,
    ),
    components(schemas(
        crate::models::OcrRequest,
        crate::models::OcrOptions,
        crate::models::OcrTextBlock,
        crate::models::OcrResponse,
        crate::models::ImageUploadResponse,
        crate::models::EngineKind,
        crate::models::OutputFormat,
    )),
    tags(
        (name = "ocr", description = "Unified OCR endpoints"),
        (name = "meta", description = "Service metadata and health"),
    )
)]
struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Base64 inflates the wire body to ~4/3 of the decoded ceiling; double
    // it to leave room for multipart framing and option fields.
    let body_limit = state.config.limits.max_image_bytes.saturating_mul(2);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/ocr/options", get(handlers::get_options))
        .route("/ocr/recognize", post(handlers::recognize_upload))
        .route("/ocr/recognize/base64", post(handlers::recognize_base64))
        .route("/openapi.json", get(openapi_json))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
