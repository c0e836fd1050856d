//! Analyzer variants and capability dispatch.
//!
//! [`Analyzer`] is a closed set of provider-backed variants. Each variant
//! supports a fixed [`CapabilitySet`](crate::CapabilitySet); asking for any
//! other operation fails with [`Error::CapabilityNotSupported`] before a
//! provider is contacted.
//!
//! # Example
//!
//! ```ignore
//! use petcare_models::registry::AnalyzerRegistry;
//!
//! async fn breed(registry: &AnalyzerRegistry, photo: &[u8]) -> petcare_models::Result<()> {
//!     let analyzer = registry.resolve(Some("gemini-1.5-flash"))?;
//!     let result = analyzer.analyze_image(photo, "image/jpeg").await?;
//!     println!("{:?}", result.breeds);
//!     Ok(())
//! }
//! ```

mod gemini;
mod huggingface;

use serde_json::Value;

pub use gemini::{DEFAULT_BASE_URL as GEMINI_BASE_URL, GeminiAnalyzer};
pub use huggingface::{
    DEFAULT_BASE_URL as HUGGINGFACE_BASE_URL, HuggingFaceClient, LlamaAnalyzer,
    LlamaVisionAnalyzer,
};

use crate::analysis::{ActivityAnalysis, AudioAnalysis, PetAnalysis, VideoAnalysis};
use crate::{Capability, CapabilitySet, Error, ModelId, Result};

/// A provider-backed analyzer, tagged by what it can do.
#[derive(Debug)]
pub enum Analyzer {
    /// Gemini: image, audio, video and activity analysis.
    Gemini(GeminiAnalyzer),
    /// Llama 3.2 11B Vision via Hugging Face: image analysis.
    LlamaVision(LlamaVisionAnalyzer),
    /// Llama 3.2 1B Instruct via Hugging Face: text generation.
    Llama(LlamaAnalyzer),
}

impl Analyzer {
    /// Canonical id of this variant.
    pub fn id(&self) -> ModelId {
        match self {
            Analyzer::Gemini(_) => ModelId::Gemini,
            Analyzer::LlamaVision(_) => ModelId::LlamaVision,
            Analyzer::Llama(_) => ModelId::Llama,
        }
    }

    /// Operations this variant supports.
    pub fn capabilities(&self) -> CapabilitySet {
        self.id().capabilities()
    }

    /// Whether this variant supports `capability`.
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(capability)
    }

    /// Fail with `CapabilityNotSupported` unless `capability` is supported.
    pub fn ensure(&self, capability: Capability) -> Result<()> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(self.unsupported(capability))
        }
    }

    fn unsupported(&self, capability: Capability) -> Error {
        let id = self.id();
        Error::CapabilityNotSupported {
            model: id.display_name(),
            operation: capability.operation(),
            alternatives: id.alternatives_for(capability),
        }
    }

    /// Species and breed analysis of an image.
    pub async fn analyze_image(&self, bytes: &[u8], mime_type: &str) -> Result<PetAnalysis> {
        match self {
            Analyzer::Gemini(gemini) => gemini.analyze_image(bytes, mime_type).await,
            Analyzer::LlamaVision(vision) => vision.analyze_image(bytes, mime_type).await,
            Analyzer::Llama(_) => Err(self.unsupported(Capability::Image)),
        }
    }

    /// Mood and species analysis of an audio clip.
    pub async fn analyze_audio(&self, bytes: &[u8], mime_type: &str) -> Result<AudioAnalysis> {
        match self {
            Analyzer::Gemini(gemini) => gemini.analyze_audio(bytes, mime_type).await,
            _ => Err(self.unsupported(Capability::Audio)),
        }
    }

    /// Sleep/meals/activity inference from a single frame.
    pub async fn analyze_activity(
        &self,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<ActivityAnalysis> {
        match self {
            Analyzer::Gemini(gemini) => gemini.analyze_activity(bytes, mime_type).await,
            _ => Err(self.unsupported(Capability::Activity)),
        }
    }

    /// Habit analysis of a video.
    pub async fn analyze_video(&self, bytes: &[u8], mime_type: &str) -> Result<VideoAnalysis> {
        match self {
            Analyzer::Gemini(gemini) => gemini.analyze_video(bytes, mime_type).await,
            _ => Err(self.unsupported(Capability::Video)),
        }
    }

    /// Free-form text generation.
    pub async fn generate_text(&self, prompt: &str, max_new_tokens: u32) -> Result<String> {
        match self {
            Analyzer::Llama(llama) => llama.generate_text(prompt, max_new_tokens).await,
            _ => Err(self.unsupported(Capability::Text)),
        }
    }
}

/// Build a provider error from a non-success response body.
///
/// Understands `{"error": {"code", "message", "status"}}`,
/// `{"error": "..."}` and `{"message": "..."}`; anything else is kept verbatim.
pub(crate) fn provider_error(provider: &str, status: u16, body: &str) -> Error {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let (message, code) = match parsed.as_ref() {
        Some(Value::Object(map)) => match map.get("error") {
            Some(Value::Object(err)) => (
                err.get("message").and_then(Value::as_str).map(str::to_string),
                err.get("status").and_then(Value::as_str).map(str::to_string),
            ),
            Some(Value::String(msg)) => (Some(msg.clone()), None),
            _ => (
                map.get("message").and_then(Value::as_str).map(str::to_string),
                None,
            ),
        },
        _ => (None, None),
    };

    Error::Provider {
        provider: provider.to_string(),
        status: Some(status),
        code,
        message: message.unwrap_or_else(|| body.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialPool;
    use std::sync::Arc;

    fn llama() -> Analyzer {
        let client = Arc::new(
            HuggingFaceClient::new("http://127.0.0.1:9", CredentialPool::empty("huggingface"))
                .unwrap(),
        );
        Analyzer::Llama(LlamaAnalyzer::new(client, "meta-llama/Llama-3.2-1B-Instruct"))
    }

    fn llama_vision() -> Analyzer {
        let client = Arc::new(
            HuggingFaceClient::new("http://127.0.0.1:9", CredentialPool::empty("huggingface"))
                .unwrap(),
        );
        Analyzer::LlamaVision(LlamaVisionAnalyzer::new(
            client,
            "meta-llama/Llama-3.2-11B-Vision-Instruct",
        ))
    }

    fn gemini() -> Analyzer {
        Analyzer::Gemini(
            GeminiAnalyzer::new("gemini-1.5-flash", CredentialPool::empty("gemini")).unwrap(),
        )
    }

    #[tokio::test]
    async fn audio_on_text_only_variant_suggests_gemini() {
        let err = llama().analyze_audio(b"RIFF", "audio/wav").await.unwrap_err();
        assert!(matches!(
            err,
            Error::CapabilityNotSupported {
                operation: "audio analysis",
                ..
            }
        ));
        assert!(err.to_string().contains("gemini"));
    }

    #[tokio::test]
    async fn image_on_text_only_variant_suggests_both_vision_models() {
        let err = llama().analyze_image(b"\xff\xd8", "image/jpeg").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("model=gemini"));
        assert!(message.contains("model=llama_vision"));
    }

    #[tokio::test]
    async fn text_generation_on_gemini_suggests_llama() {
        let err = gemini().generate_text("hello", 10).await.unwrap_err();
        assert!(err.to_string().contains("model=llama"));
    }

    #[tokio::test]
    async fn video_on_vision_variant_is_rejected() {
        let err = llama_vision()
            .analyze_video(b"....", "video/mp4")
            .await
            .unwrap_err();
        assert!(err.is_user_error());
        assert!(err.to_string().contains("video analysis"));
    }

    #[tokio::test]
    async fn supported_capability_without_keys_reports_missing_credentials() {
        let err = gemini().analyze_image(b"\xff\xd8", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, Error::NoCredentialsConfigured { .. }));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn ensure_matches_capability_set() {
        let analyzer = gemini();
        assert!(analyzer.ensure(Capability::Video).is_ok());
        assert!(analyzer.ensure(Capability::Text).is_err());
        assert_eq!(llama().id(), ModelId::Llama);
        assert!(llama_vision().supports(Capability::Image));
    }

    #[test]
    fn provider_error_reads_google_shape() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        let err = provider_error("gemini", 429, body);
        assert!(err.is_rate_limit());
        match err {
            Error::Provider { code, message, .. } => {
                assert_eq!(code.as_deref(), Some("RESOURCE_EXHAUSTED"));
                assert_eq!(message, "Quota exceeded");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn provider_error_reads_string_error_and_plain_text() {
        let err = provider_error("huggingface", 503, r#"{"error": "Model is loading"}"#);
        assert!(err.to_string().contains("Model is loading"));

        let err = provider_error("huggingface", 502, "Bad Gateway\n");
        assert!(err.to_string().ends_with("Bad Gateway"));
        assert!(!err.is_rate_limit());
    }
}
