//! Gemini provider.
//!
//! Talks to the Generative Language REST API. Images and activity frames are
//! sent inline; audio and videos go through the Files API first and are
//! referenced by URI once processing finishes. Every call runs through
//! [`invoke_with_rotation`] so a rate-limited key is swapped for the next one.
//!
//! # Example
//!
//! ```ignore
//! use petcare_models::auth::CredentialPool;
//! use petcare_models::providers::GeminiAnalyzer;
//!
//! let gemini = GeminiAnalyzer::new("gemini-1.5-flash", CredentialPool::from_env("gemini"))?;
//! let gemini = gemini.with_base_url("http://localhost:8089");
//! ```

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::analysis::{
    ActivityAnalysis, AudioAnalysis, PetAnalysis, VideoAnalysis, normalize_activity,
    normalize_audio, normalize_pet, normalize_video, parse_model_json,
};
use crate::auth::{ApiKey, CredentialPool};
use crate::rotation::invoke_with_rotation;
use crate::{Error, Result};

/// Default Generative Language API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const PROVIDER: &str = "gemini";
const API_KEY_HEADER: &str = "x-goog-api-key";

const IMAGE_PROMPT: &str = r#"Analyze this image of an animal (pet or wildlife). Return ONLY a single JSON object with no markdown or explanation, using this exact structure. Percentages must sum to 100 per category when multiple options are given.

{
  "species": [{"species": "<name>", "percentage": <0-100>}, ...],
  "breeds": [{"breed": "<name>", "percentage": <0-100>}, ...]
}

Rules:
- species: list possible species with confidence percentages. If only one animal is clearly one species, use one entry with 100.
- breeds: list possible breeds with confidence when applicable. If no breed concept, use [].
- Return only the JSON object, nothing else."#;

const AUDIO_PROMPT: &str = r#"Analyze this audio of an animal (pet sounds: barking, meowing, etc.). Return ONLY a single JSON object with no markdown, using this structure:

{
  "mood": "<inferred mood or state: e.g. excited, anxious, playful, distressed, calm, curious>",
  "confidence": <0.0-1.0 number for how confident you are in the analysis>,
  "species": [{"species": "<name>", "percentage": <0-100>}, ...],
  "breeds": [{"breed": "<name>", "percentage": <0-100>}, ...],
  "description": "<short description of the sound>"
}

Return only the JSON object."#;

const ACTIVITY_PROMPT: &str = r#"Look at this image of a pet (or pet environment). Infer from visible cues (e.g. resting, food bowl, time of day) and return ONLY a single JSON object with no markdown:

{
  "sleep_minutes": <integer, estimated sleep or rest minutes for the day so far; 0 if unknown>,
  "meals_count": <integer, estimated number of meals today; 0 if unknown>,
  "activity": "<one of: Low, Normal, High, or Unknown>"
}

Return only the JSON object."#;

const VIDEO_PROMPT: &str = r#"Watch this video of a pet. Analyze the full video and return ONLY a single JSON object with no markdown or explanation. Estimate based on what you see in the video (and infer typical patterns if the video is a short clip).

{
  "activity_summary": "<string: concise summary of what the pet did in the video - activities, behaviors, notable moments>",
  "hours_slept_per_day": <number 0-24: estimated hours the pet sleeps per day; use 0 if no sleep/rest visible or unknown>,
  "hours_active": <number 0-24: estimated hours the pet is active per day; use 0 if unknown>,
  "eating_habits": "<string: observed or inferred eating habits - e.g. meal frequency, appetite, grazing, feeding behavior, or 'Not observed' if no eating in video>"
}

Rules:
- activity_summary: describe specific activities (playing, resting, eating, walking, etc.) seen in the video.
- hours_slept_per_day and hours_active: if the video is a short clip, estimate typical daily totals; otherwise base on what you see.
- eating_habits: only describe if eating is visible or strongly implied; otherwise use "Not observed".
Return only the JSON object, nothing else."#;

// ────────────────────────────────────────────────────────────────────────────
// Gemini API Types
// ────────────────────────────────────────────────────────────────────────────

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<GeminiContent>,
}

/// One turn of request content.
#[derive(Debug, Serialize)]
pub struct GeminiContent {
    pub parts: Vec<GeminiPart>,
}

/// A request part: text, inline bytes, or an uploaded file reference.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeminiPart {
    Text(String),
    InlineData { mime_type: String, data: String },
    FileData { mime_type: String, file_uri: String },
}

/// Response from `generateContent`.
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

/// One generated candidate.
#[derive(Debug, Deserialize)]
pub struct GeminiCandidate {
    pub content: Option<CandidateContent>,
}

/// Content of a generated candidate.
#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

/// A response part. Only text is read; other fields
/// (`inlineData`, `thoughtSignature`, ...) are ignored.
#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
    /// Set on reasoning summaries, which are not part of the answer.
    #[serde(default)]
    pub thought: Option<bool>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| p.thought != Some(true))
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

/// Response from a Files API upload.
#[derive(Debug, Deserialize)]
pub struct UploadFileResponse {
    pub file: GeminiFile,
}

/// File metadata from the Files API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiFile {
    /// Resource name, e.g. `files/abc-123`.
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// `PROCESSING`, `ACTIVE` or `FAILED`.
    #[serde(default)]
    pub state: Option<String>,
}

impl GeminiFile {
    fn is_active(&self) -> bool {
        self.state.as_deref().is_none_or(|s| s == "ACTIVE")
    }

    fn is_failed(&self) -> bool {
        self.state.as_deref() == Some("FAILED")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// GeminiAnalyzer
// ────────────────────────────────────────────────────────────────────────────

/// Gemini-backed analyzer with a rotating key pool.
#[derive(Debug)]
pub struct GeminiAnalyzer {
    base_url: String,
    model: String,
    client: reqwest::Client,
    pool: CredentialPool,
    poll_interval: Duration,
    max_polls: u32,
}

impl GeminiAnalyzer {
    /// Create an analyzer for `model` using the default API base URL.
    pub fn new(model: impl Into<String>, pool: CredentialPool) -> Result<Self> {
        Self::with_client(model, pool, reqwest::Client::builder())
    }

    /// Create an analyzer with a preconfigured HTTP client builder
    /// (e.g. with a request timeout).
    pub fn with_client(
        model: impl Into<String>,
        pool: CredentialPool,
        builder: reqwest::ClientBuilder,
    ) -> Result<Self> {
        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            client: builder.build()?,
            pool,
            poll_interval: Duration::from_secs(2),
            max_polls: 60,
        })
    }

    /// Point the analyzer at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Configure how uploaded videos are polled until they are ready.
    pub fn with_file_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    /// Get the base URL for this provider.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Provider-side model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Credential pool used for calls.
    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    /// Species and breed analysis of an image.
    pub async fn analyze_image(&self, bytes: &[u8], mime_type: &str) -> Result<PetAnalysis> {
        let raw = self.generate_inline(bytes, mime_type, IMAGE_PROMPT).await?;
        Ok(normalize_pet(&raw))
    }

    /// Mood analysis of an audio clip, uploaded through the Files API.
    pub async fn analyze_audio(&self, bytes: &[u8], mime_type: &str) -> Result<AudioAnalysis> {
        let raw = self.generate_uploaded(bytes, mime_type, AUDIO_PROMPT).await?;
        Ok(normalize_audio(&raw))
    }

    /// Sleep/meals/activity inference from one frame.
    pub async fn analyze_activity(
        &self,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<ActivityAnalysis> {
        let raw = self.generate_inline(bytes, mime_type, ACTIVITY_PROMPT).await?;
        Ok(normalize_activity(&raw))
    }

    /// Upload a video and analyze it once the file is active.
    pub async fn analyze_video(&self, bytes: &[u8], mime_type: &str) -> Result<VideoAnalysis> {
        let raw = self.generate_uploaded(bytes, mime_type, VIDEO_PROMPT).await?;
        Ok(normalize_video(&raw))
    }

    /// Upload, wait for processing, then generate against the file URI.
    ///
    /// Upload and generation share one key per attempt.
    async fn generate_uploaded(
        &self,
        bytes: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<Map<String, Value>> {
        invoke_with_rotation(&self.pool, |key| async move {
            let file = self.upload_file(&key, bytes, mime_type).await?;
            let file = self.wait_until_active(&key, file).await?;
            let parts = vec![
                GeminiPart::FileData {
                    mime_type: file.mime_type.unwrap_or_else(|| mime_type.to_string()),
                    file_uri: file.uri,
                },
                GeminiPart::Text(prompt.to_string()),
            ];
            self.generate(&key, parts).await
        })
        .await
    }

    async fn generate_inline(
        &self,
        bytes: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<Map<String, Value>> {
        let parts = vec![
            GeminiPart::InlineData {
                mime_type: mime_type.to_string(),
                data: BASE64.encode(bytes),
            },
            GeminiPart::Text(prompt.to_string()),
        ];
        let parts = &parts;
        invoke_with_rotation(&self.pool, |key| async move {
            self.generate(&key, parts.clone()).await
        })
        .await
    }

    async fn generate(&self, key: &ApiKey, parts: Vec<GeminiPart>) -> Result<Map<String, Value>> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateContentRequest {
            contents: vec![GeminiContent { parts }],
        };

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, key.expose_secret())
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: GenerateContentResponse = response.json().await?;
        let text = body.text();
        debug!(model = %self.model, chars = text.len(), "gemini generated content");
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        parse_model_json(&text)
    }

    async fn upload_file(&self, key: &ApiKey, bytes: &[u8], mime_type: &str) -> Result<GeminiFile> {
        let url = format!("{}/upload/v1beta/files", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, key.expose_secret())
            .header("X-Goog-Upload-Protocol", "raw")
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes.to_vec())
            .send()
            .await?;
        let response = check_status(response).await?;

        let uploaded: UploadFileResponse = response.json().await?;
        debug!(file = %uploaded.file.name, size = bytes.len(), "uploaded file to gemini");
        Ok(uploaded.file)
    }

    async fn wait_until_active(&self, key: &ApiKey, mut file: GeminiFile) -> Result<GeminiFile> {
        let mut polls = 0;
        while !file.is_active() {
            if file.is_failed() {
                return Err(Error::InvalidResponse(format!(
                    "gemini failed to process {}",
                    file.name
                )));
            }
            if polls >= self.max_polls {
                return Err(Error::InvalidResponse(format!(
                    "{} still processing after {} polls",
                    file.name, polls
                )));
            }
            polls += 1;
            tokio::time::sleep(self.poll_interval).await;

            let url = format!("{}/v1beta/{}", self.base_url, file.name);
            let response = self
                .client
                .get(&url)
                .header(API_KEY_HEADER, key.expose_secret())
                .send()
                .await?;
            file = check_status(response).await?.json().await?;
        }
        Ok(file)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(super::provider_error(PROVIDER, status.as_u16(), &body))
}
