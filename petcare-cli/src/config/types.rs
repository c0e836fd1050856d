use serde::{Deserialize, Serialize};

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPetcareConfig {
    #[serde(default)]
    pub server: RawServerConfig,

    #[serde(default)]
    pub models: RawModelsConfig,
}

/// Server config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerConfig {
    /// Host to bind
    pub host: Option<String>,

    /// Port for the petcare server
    pub port: Option<u16>,

    /// Origins allowed by CORS
    pub cors_origins: Option<Vec<String>>,
}

/// Model settings as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawModelsConfig {
    pub default_model: Option<String>,
    pub gemini_model: Option<String>,
    pub llama_model: Option<String>,
    pub llama_vision_model: Option<String>,
    pub gemini_base_url: Option<String>,
    pub huggingface_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PetcareConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub models: ModelsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Host to bind
    pub host: String,

    /// Port for the petcare server
    pub port: u16,

    /// Origins allowed by CORS (`*` for any)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelsConfig {
    /// Model id used when a request names none (aliases allowed)
    pub default_model: String,
    pub gemini_model: String,
    pub llama_model: String,
    pub llama_vision_model: String,
    pub gemini_base_url: String,
    pub huggingface_base_url: String,
    /// Timeout for one outbound provider request
    pub request_timeout_secs: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        let registry = petcare_models::RegistryConfig::default();
        Self {
            default_model: registry.default_model,
            gemini_model: registry.gemini_model,
            llama_model: registry.llama_model,
            llama_vision_model: registry.llama_vision_model,
            gemini_base_url: registry.gemini_base_url,
            huggingface_base_url: registry.huggingface_base_url,
            request_timeout_secs: registry.request_timeout.as_secs(),
        }
    }
}

impl ModelsConfig {
    /// Registry settings for these values
    pub fn to_registry_config(&self) -> petcare_models::RegistryConfig {
        petcare_models::RegistryConfig {
            default_model: self.default_model.clone(),
            gemini_model: self.gemini_model.clone(),
            llama_model: self.llama_model.clone(),
            llama_vision_model: self.llama_vision_model.clone(),
            gemini_base_url: self.gemini_base_url.clone(),
            huggingface_base_url: self.huggingface_base_url.clone(),
            request_timeout: std::time::Duration::from_secs(self.request_timeout_secs),
            ..petcare_models::RegistryConfig::default()
        }
    }
}

/// Default host for the petcare server
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default port for the petcare server
pub const DEFAULT_PORT: u16 = 8000;

/// Default CORS origins (local frontend dev servers)
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3000"];
