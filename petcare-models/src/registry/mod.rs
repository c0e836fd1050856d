//! Analyzer registry.
//!
//! Builds one analyzer per canonical model id at startup and resolves
//! caller-supplied ids (or aliases) to them. Analyzers live as long as the
//! registry, so each provider's rotation cursor persists across requests.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::auth::CredentialPool;
use crate::providers::{
    Analyzer, GEMINI_BASE_URL, GeminiAnalyzer, HUGGINGFACE_BASE_URL, HuggingFaceClient,
    LlamaAnalyzer, LlamaVisionAnalyzer,
};
use crate::{ModelId, ModelInfo, Result};

/// Settings for building the analyzers.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    /// Id used when a request names no model (alias allowed).
    pub default_model: String,
    /// Gemini model name.
    pub gemini_model: String,
    /// Hugging Face text model.
    pub llama_model: String,
    /// Hugging Face vision model.
    pub llama_vision_model: String,
    /// Gemini API base URL.
    pub gemini_base_url: String,
    /// Hugging Face router base URL.
    pub huggingface_base_url: String,
    /// Timeout for one outbound HTTP request.
    pub request_timeout: Duration,
    /// Delay between Gemini file-state polls.
    pub file_poll_interval: Duration,
    /// Maximum Gemini file-state polls before giving up.
    pub file_max_polls: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_model: "gemini-1.5-flash".to_string(),
            gemini_model: "gemini-1.5-flash".to_string(),
            llama_model: "meta-llama/Llama-3.2-1B-Instruct".to_string(),
            llama_vision_model: "meta-llama/Llama-3.2-11B-Vision-Instruct".to_string(),
            gemini_base_url: GEMINI_BASE_URL.to_string(),
            huggingface_base_url: HUGGINGFACE_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(120),
            file_poll_interval: Duration::from_secs(2),
            file_max_polls: 60,
        }
    }
}

/// Registry of the three analyzer variants.
#[derive(Debug)]
pub struct AnalyzerRegistry {
    default_model: String,
    gemini: Arc<Analyzer>,
    llama_vision: Arc<Analyzer>,
    llama: Arc<Analyzer>,
}

impl AnalyzerRegistry {
    /// Build analyzers from explicit credential pools.
    pub fn new(
        config: &RegistryConfig,
        gemini_pool: CredentialPool,
        huggingface_pool: CredentialPool,
    ) -> Result<Self> {
        let builder = || reqwest::Client::builder().timeout(config.request_timeout);

        let gemini = GeminiAnalyzer::with_client(&config.gemini_model, gemini_pool, builder())?
            .with_base_url(&config.gemini_base_url)
            .with_file_polling(config.file_poll_interval, config.file_max_polls);

        let huggingface = Arc::new(HuggingFaceClient::with_client(
            &config.huggingface_base_url,
            huggingface_pool,
            builder(),
        )?);

        Ok(Self {
            default_model: config.default_model.clone(),
            gemini: Arc::new(Analyzer::Gemini(gemini)),
            llama_vision: Arc::new(Analyzer::LlamaVision(LlamaVisionAnalyzer::new(
                Arc::clone(&huggingface),
                &config.llama_vision_model,
            ))),
            llama: Arc::new(Analyzer::Llama(LlamaAnalyzer::new(
                huggingface,
                &config.llama_model,
            ))),
        })
    }

    /// Build analyzers with credential pools read from the environment.
    pub fn from_env(config: &RegistryConfig) -> Result<Self> {
        Self::new(
            config,
            CredentialPool::from_env("gemini"),
            CredentialPool::from_env("huggingface"),
        )
    }

    /// Resolve a model id or alias; `None` or blank uses the default model.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownModel` when the id is not recognized.
    pub fn resolve(&self, model_id: Option<&str>) -> Result<Arc<Analyzer>> {
        let requested = model_id.map(str::trim).filter(|id| !id.is_empty());
        let id = ModelId::resolve(requested.unwrap_or(&self.default_model))?;
        debug!(requested = ?model_id, resolved = %id, "resolved analyzer");
        Ok(self.get(id))
    }

    /// Analyzer for a canonical id.
    pub fn get(&self, id: ModelId) -> Arc<Analyzer> {
        match id {
            ModelId::Gemini => Arc::clone(&self.gemini),
            ModelId::LlamaVision => Arc::clone(&self.llama_vision),
            ModelId::Llama => Arc::clone(&self.llama),
        }
    }

    /// Canonical ids with their labels, in listing order.
    pub fn list_models(&self) -> Vec<(&'static str, &'static str)> {
        ModelId::ALL.iter().map(|id| (id.as_str(), id.label())).collect()
    }

    /// Detailed information for every registered model.
    pub fn models(&self) -> Vec<ModelInfo> {
        ModelId::ALL
            .iter()
            .map(|id| {
                let (provider, model, credentials) = match self.get(*id).as_ref() {
                    Analyzer::Gemini(g) => ("gemini", g.model().to_string(), g.pool().len()),
                    Analyzer::LlamaVision(v) => {
                        ("huggingface", v.model().to_string(), v.client().pool().len())
                    }
                    Analyzer::Llama(l) => {
                        ("huggingface", l.model().to_string(), l.client().pool().len())
                    }
                };
                ModelInfo {
                    id: *id,
                    label: id.label(),
                    provider,
                    model,
                    capabilities: id.capabilities(),
                    credentials,
                }
            })
            .collect()
    }
}
