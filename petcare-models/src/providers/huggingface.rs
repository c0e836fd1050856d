//! Hugging Face inference provider for the Llama variants.
//!
//! Both Llama analyzers go through the OpenAI-compatible chat completions
//! route of the Hugging Face inference router and share one
//! [`HuggingFaceClient`], so they also share one token pool and cursor.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analysis::{PetAnalysis, normalize_pet, parse_model_json};
use crate::auth::{ApiKey, CredentialPool};
use crate::rotation::invoke_with_rotation;
use crate::{Error, Result};

/// Default Hugging Face inference router base URL.
pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";

const PROVIDER: &str = "huggingface";

const VISION_PROMPT: &str = r#"Analyze this image of an animal (pet or wildlife). Return ONLY a single JSON object with no markdown or explanation, using this exact structure. Percentages must sum to 100 per category when multiple options are given.

{
  "species": [{"species": "<name>", "percentage": <0-100>}, ...],
  "breeds": [{"breed": "<name>", "percentage": <0-100>}, ...],
  "primary_breed_or_species": "<single display label>",
  "match_score": <0-100>,
  "description": "<1-3 sentences about traits and breed heritage>",
  "tags": ["<trait1>", "<trait2>", "<trait3>"]
}

Rules:
- species and breeds: as above. primary_breed_or_species: one label. match_score: 0-100. description: short paragraph. tags: 3-6 trait words.
- Return only the JSON object, nothing else."#;

const VISION_MAX_TOKENS: u32 = 512;

// ────────────────────────────────────────────────────────────────────────────
// Chat Completions Types
// ────────────────────────────────────────────────────────────────────────────

/// Request body for `/chat/completions`.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

/// A message in a chat completion request or response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: MessageContent) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }
}

/// Content of a message, either text or structured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content.
    Text(String),
    /// Structured content parts (text, images).
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Get content as text, joining parts if necessary.
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// A part of structured content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text content.
    Text { text: String },
    /// Image given as a URL (here always a base64 data URL).
    ImageUrl { image_url: ImageUrl },
}

/// Image reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Response from `/chat/completions`.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// One completion choice.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ResponseMessage,
}

/// Assistant message in a response; content may be null.
#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<MessageContent>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, trimmed.
    pub fn text(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .map(|c| c.as_text().trim().to_string())
            .unwrap_or_default()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HuggingFaceClient
// ────────────────────────────────────────────────────────────────────────────

/// Shared HTTP client and token pool for Hugging Face calls.
#[derive(Debug)]
pub struct HuggingFaceClient {
    base_url: String,
    client: reqwest::Client,
    pool: CredentialPool,
}

impl HuggingFaceClient {
    /// Create a client for `base_url`.
    pub fn new(base_url: impl Into<String>, pool: CredentialPool) -> Result<Self> {
        Self::with_client(base_url, pool, reqwest::Client::builder())
    }

    /// Create a client from a preconfigured builder.
    pub fn with_client(
        base_url: impl Into<String>,
        pool: CredentialPool,
        builder: reqwest::ClientBuilder,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: builder.build()?,
            pool,
        })
    }

    /// Get the base URL for this provider.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token pool used for calls.
    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    /// Run a chat completion, rotating tokens on rate limits.
    pub async fn complete(&self, request: &ChatCompletionRequest) -> Result<String> {
        invoke_with_rotation(&self.pool, |key| async move { self.send(&key, request).await })
            .await
    }

    async fn send(&self, key: &ApiKey, request: &ChatCompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(key.expose_secret())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(super::provider_error(PROVIDER, status.as_u16(), &body));
        }

        let body: ChatCompletionResponse = response.json().await?;
        let text = body.text();
        debug!(model = %request.model, chars = text.len(), "huggingface completion");
        Ok(text)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Analyzers
// ────────────────────────────────────────────────────────────────────────────

/// Llama 3.2 1B Instruct: text generation only.
#[derive(Debug)]
pub struct LlamaAnalyzer {
    client: Arc<HuggingFaceClient>,
    model: String,
}

impl LlamaAnalyzer {
    /// Create a text analyzer for `model`.
    pub fn new(client: Arc<HuggingFaceClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Provider-side model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Shared router client.
    pub fn client(&self) -> &HuggingFaceClient {
        &self.client
    }

    /// Generate a completion for `prompt`.
    pub async fn generate_text(&self, prompt: &str, max_new_tokens: u32) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(MessageContent::Text(prompt.to_string()))],
            max_tokens: max_new_tokens,
            temperature: 0.0,
            stream: false,
        };
        self.client.complete(&request).await
    }
}

/// Llama 3.2 11B Vision Instruct: image analysis only.
#[derive(Debug)]
pub struct LlamaVisionAnalyzer {
    client: Arc<HuggingFaceClient>,
    model: String,
}

impl LlamaVisionAnalyzer {
    /// Create a vision analyzer for `model`.
    pub fn new(client: Arc<HuggingFaceClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Provider-side model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Shared router client.
    pub fn client(&self) -> &HuggingFaceClient {
        &self.client
    }

    /// Species and breed analysis of an image.
    ///
    /// Output that is empty or not JSON yields [`PetAnalysis::unknown`].
    pub async fn analyze_image(&self, bytes: &[u8], mime_type: &str) -> Result<PetAnalysis> {
        let data_url = format!("data:{};base64,{}", mime_type, BASE64.encode(bytes));
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(MessageContent::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: data_url },
                },
                ContentPart::Text {
                    text: VISION_PROMPT.to_string(),
                },
            ]))],
            max_tokens: VISION_MAX_TOKENS,
            temperature: 0.0,
            stream: false,
        };

        let text = match self.client.complete(&request).await {
            Ok(text) => text,
            Err(Error::Provider {
                status: Some(401 | 403 | 404),
                ..
            }) => {
                return Err(Error::ModelUnavailable {
                    model: self.model.clone(),
                    hint: format!(
                        "Accept the model license at https://huggingface.co/{}",
                        self.model
                    ),
                });
            }
            Err(err) => return Err(err),
        };

        if text.is_empty() {
            return Ok(PetAnalysis::unknown());
        }
        match parse_model_json(&text) {
            Ok(raw) => Ok(normalize_pet(&raw)),
            Err(err) => {
                warn!(model = %self.model, error = %err, "unparsable vision output");
                Ok(PetAnalysis::unknown())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const TEXT_MODEL: &str = "meta-llama/Llama-3.2-1B-Instruct";
    const VISION_MODEL: &str = "meta-llama/Llama-3.2-11B-Vision-Instruct";

    fn client(server: &Server, tokens: &[&str]) -> Arc<HuggingFaceClient> {
        Arc::new(
            HuggingFaceClient::new(server.url(), CredentialPool::new("huggingface", tokens))
                .unwrap(),
        )
    }

    fn completion(text: &str) -> String {
        serde_json::json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]
        })
        .to_string()
    }

    #[test]
    fn image_part_serializes_openai_style() {
        let part = ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: "data:image/png;base64,AAAA".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_value(part).unwrap(),
            serde_json::json!({"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}})
        );
    }

    #[test]
    fn null_content_yields_empty_text() {
        let body: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert_eq!(body.text(), "");
    }

    #[tokio::test]
    async fn generate_text_sends_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer hf_one")
            .match_body(Matcher::Regex(format!(r#""model":"{TEXT_MODEL}""#)))
            .with_status(200)
            .with_body(completion("  Dogs love walks.  "))
            .create_async()
            .await;

        let llama = LlamaAnalyzer::new(client(&server, &["hf_one"]), TEXT_MODEL);
        let text = llama.generate_text("Tell me about dogs", 32).await.unwrap();

        mock.assert_async().await;
        assert_eq!(text, "Dogs love walks.");
    }

    #[tokio::test]
    async fn rate_limited_token_rotates() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer hf_one")
            .with_status(429)
            .with_body(r#"{"error": "Rate limit reached. Please retry later."}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer hf_two")
            .with_status(200)
            .with_body(completion("ok"))
            .create_async()
            .await;

        let shared = client(&server, &["hf_one", "hf_two"]);
        let llama = LlamaAnalyzer::new(Arc::clone(&shared), TEXT_MODEL);
        assert_eq!(llama.generate_text("hi", 8).await.unwrap(), "ok");
        assert_eq!(shared.pool().cursor(), 1);
    }

    #[tokio::test]
    async fn vision_parses_fenced_json() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Regex("data:image/png;base64,".to_string()))
            .with_status(200)
            .with_body(completion(
                "```json\n{\"species\": [{\"species\": \"cat\", \"percentage\": 100}], \"breeds\": [{\"breed\": \"Siamese\", \"percentage\": 70}], \"tags\": [\"vocal\"]}\n```",
            ))
            .create_async()
            .await;

        let vision = LlamaVisionAnalyzer::new(client(&server, &["hf_one"]), VISION_MODEL);
        let result = vision.analyze_image(b"\x89PNG", "image/png").await.unwrap();

        assert_eq!(result.species[0].species, "cat");
        assert_eq!(result.breeds[0].breed, "Siamese");
        assert_eq!(result.tags, vec!["vocal"]);
    }

    #[tokio::test]
    async fn vision_garbage_falls_back_to_unknown() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(completion("I think this is a cat."))
            .create_async()
            .await;

        let vision = LlamaVisionAnalyzer::new(client(&server, &["hf_one"]), VISION_MODEL);
        let result = vision.analyze_image(b"img", "image/jpeg").await.unwrap();
        assert_eq!(result, PetAnalysis::unknown());
    }

    #[tokio::test]
    async fn vision_gated_model_reports_license() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(403)
            .with_body(r#"{"error": "Access to model is restricted"}"#)
            .create_async()
            .await;

        let vision = LlamaVisionAnalyzer::new(client(&server, &["hf_one"]), VISION_MODEL);
        let err = vision.analyze_image(b"img", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable { .. }));
        assert!(err.to_string().contains("huggingface.co/meta-llama"));
    }
}
