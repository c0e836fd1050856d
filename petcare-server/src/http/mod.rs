//! HTTP server module

mod analysis;
mod api;
pub mod upload;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::AppState;

pub use analysis::{GenerateTextRequest, MAX_NEW_TOKENS, ModelQuery};
pub use api::HealthResponse;

/// Request body cap; leaves room for multipart framing around a max-size video.
pub const BODY_LIMIT: usize = upload::MAX_VIDEO_SIZE + 1024 * 1024;

/// Create the HTTP router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    let ai = Router::new()
        .route("/models", get(api::list_models))
        .route("/analyze-pet", post(analysis::analyze_pet))
        .route("/analyze-audio", post(analysis::analyze_audio))
        .route("/analyze-activity", post(analysis::analyze_activity))
        .route("/analyze-pet-video", post(analysis::analyze_pet_video))
        .route("/generate-text", post(analysis::generate_text));

    Router::new()
        .route("/health", get(api::health))
        .nest("/api/v1/gemini", ai)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

/// CORS layer for the configured origins; `*` allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}
