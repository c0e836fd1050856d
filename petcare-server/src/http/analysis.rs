//! Analysis endpoints
//!
//! Each handler resolves the requested model and checks its capability
//! before reading the upload, then calls the analyzer. Failures are mapped to statuses by [`ApiError`].

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Query, State, rejection::JsonRejection},
};
use petcare_models::{Capability, ModelId};
use petcare_models::analysis::{
    ActivityAnalysis, AudioAnalysis, GeneratedText, PetAnalysis, VideoAnalysis,
};
use serde::{Deserialize, Serialize};

use super::upload::{UploadKind, read_upload};
use crate::AppState;
use crate::error::ApiError;

/// Largest accepted `max_new_tokens`
pub const MAX_NEW_TOKENS: u32 = 2048;

fn default_max_new_tokens() -> u32 {
    512
}

/// `?model=` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct ModelQuery {
    pub model: Option<String>,
}

/// Request body for POST /api/v1/gemini/generate-text
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateTextRequest {
    /// Text prompt
    pub prompt: String,
    /// Max tokens to generate (1..=2048)
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
}

impl GenerateTextRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.prompt.is_empty() {
            return Err(ApiError::BadRequest("prompt must not be empty".to_string()));
        }
        if !(1..=MAX_NEW_TOKENS).contains(&self.max_new_tokens) {
            return Err(ApiError::BadRequest(format!(
                "max_new_tokens must be between 1 and {MAX_NEW_TOKENS}"
            )));
        }
        Ok(())
    }
}

/// POST /api/v1/gemini/analyze-pet - species and breed percentages
pub async fn analyze_pet(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelQuery>,
    multipart: Multipart,
) -> Result<Json<PetAnalysis>, ApiError> {
    let analyzer = state.registry.resolve(query.model.as_deref())?;
    analyzer.ensure(Capability::Image)?;
    let upload = read_upload(multipart, UploadKind::Image).await?;
    let result = analyzer
        .analyze_image(&upload.bytes, &upload.content_type)
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/gemini/analyze-audio - mood and species from a clip
pub async fn analyze_audio(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelQuery>,
    multipart: Multipart,
) -> Result<Json<AudioAnalysis>, ApiError> {
    let analyzer = state.registry.resolve(query.model.as_deref())?;
    analyzer.ensure(Capability::Audio)?;
    let upload = read_upload(multipart, UploadKind::Audio).await?;
    let result = analyzer
        .analyze_audio(&upload.bytes, &upload.content_type)
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/gemini/analyze-activity - sleep, meals and activity from a frame
pub async fn analyze_activity(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelQuery>,
    multipart: Multipart,
) -> Result<Json<ActivityAnalysis>, ApiError> {
    let analyzer = state.registry.resolve(query.model.as_deref())?;
    analyzer.ensure(Capability::Activity)?;
    let upload = read_upload(multipart, UploadKind::Image).await?;
    let result = analyzer
        .analyze_activity(&upload.bytes, &upload.content_type)
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/gemini/analyze-pet-video - habits from a video
pub async fn analyze_pet_video(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelQuery>,
    multipart: Multipart,
) -> Result<Json<VideoAnalysis>, ApiError> {
    let analyzer = state.registry.resolve(query.model.as_deref())?;
    analyzer.ensure(Capability::Video)?;
    let upload = read_upload(multipart, UploadKind::Video).await?;
    tracing::debug!(
        size = upload.bytes.len(),
        file_name = ?upload.file_name,
        "analyzing video"
    );
    let result = analyzer
        .analyze_video(&upload.bytes, &upload.content_type)
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/gemini/generate-text - text completion (defaults to `llama`)
pub async fn generate_text(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelQuery>,
    body: Result<Json<GenerateTextRequest>, JsonRejection>,
) -> Result<Json<GeneratedText>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    request.validate()?;

    let model = query
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| ModelId::Llama.as_str().to_string());
    let analyzer = state.registry.resolve(Some(&model))?;
    let generated_text = analyzer
        .generate_text(&request.prompt, request.max_new_tokens)
        .await?;

    Ok(Json(GeneratedText {
        model,
        generated_text,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_defaults_tokens() {
        let request: GenerateTextRequest = serde_json::from_str(r#"{"prompt": "hi"}"#).unwrap();
        assert_eq!(request.max_new_tokens, 512);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn generate_request_bounds() {
        let request = GenerateTextRequest {
            prompt: "hi".into(),
            max_new_tokens: 0,
        };
        assert!(request.validate().is_err());

        let request = GenerateTextRequest {
            prompt: "hi".into(),
            max_new_tokens: MAX_NEW_TOKENS + 1,
        };
        assert!(request.validate().is_err());

        let request = GenerateTextRequest {
            prompt: String::new(),
            max_new_tokens: 10,
        };
        assert!(request.validate().is_err());
    }
}
