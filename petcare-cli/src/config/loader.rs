use super::types::{
    DEFAULT_HOST, DEFAULT_PORT, ModelsConfig, PetcareConfig, RawModelsConfig, RawPetcareConfig,
    RawServerConfig, ServerConfig,
};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<PetcareConfig> {
        Self::load_layers(
            Self::user_config_path().as_deref(),
            &Self::project_config_path(),
        )
    }

    /// Load and merge the given layers; missing files are skipped
    pub fn load_layers(user: Option<&Path>, project: &Path) -> Result<PetcareConfig> {
        let mut raw = RawPetcareConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(user_path)?);
        }

        // Layer 2: Project config
        if project.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(project)?);
        }

        Ok(Self::finalize(raw))
    }

    fn read_raw(path: &Path) -> Result<RawPetcareConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let raw = toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config layer");
        Ok(raw)
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "petcare").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with PETCARE_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("PETCARE_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".petcare/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawPetcareConfig, overlay: RawPetcareConfig) -> RawPetcareConfig {
        RawPetcareConfig {
            server: RawServerConfig {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
                cors_origins: overlay.server.cors_origins.or(base.server.cors_origins),
            },
            models: RawModelsConfig {
                default_model: overlay.models.default_model.or(base.models.default_model),
                gemini_model: overlay.models.gemini_model.or(base.models.gemini_model),
                llama_model: overlay.models.llama_model.or(base.models.llama_model),
                llama_vision_model: overlay
                    .models
                    .llama_vision_model
                    .or(base.models.llama_vision_model),
                gemini_base_url: overlay.models.gemini_base_url.or(base.models.gemini_base_url),
                huggingface_base_url: overlay
                    .models
                    .huggingface_base_url
                    .or(base.models.huggingface_base_url),
                request_timeout_secs: overlay
                    .models
                    .request_timeout_secs
                    .or(base.models.request_timeout_secs),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawPetcareConfig) -> PetcareConfig {
        let server_defaults = ServerConfig::default();
        let models = ModelsConfig::default();

        PetcareConfig {
            server: ServerConfig {
                host: raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: raw.server.port.unwrap_or(DEFAULT_PORT),
                cors_origins: raw
                    .server
                    .cors_origins
                    .unwrap_or(server_defaults.cors_origins),
            },
            models: ModelsConfig {
                default_model: raw.models.default_model.unwrap_or(models.default_model),
                gemini_model: raw.models.gemini_model.unwrap_or(models.gemini_model),
                llama_model: raw.models.llama_model.unwrap_or(models.llama_model),
                llama_vision_model: raw
                    .models
                    .llama_vision_model
                    .unwrap_or(models.llama_vision_model),
                gemini_base_url: raw.models.gemini_base_url.unwrap_or(models.gemini_base_url),
                huggingface_base_url: raw
                    .models
                    .huggingface_base_url
                    .unwrap_or(models.huggingface_base_url),
                request_timeout_secs: raw
                    .models
                    .request_timeout_secs
                    .unwrap_or(models.request_timeout_secs),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_files_use_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_layers(
            Some(&temp_dir.path().join("nope.toml")),
            &temp_dir.path().join("also-nope.toml"),
        )
        .unwrap();
        assert_eq!(config, PetcareConfig::default());
    }

    #[test]
    fn test_project_overrides_user() {
        let temp_dir = TempDir::new().unwrap();
        let user = write(
            &temp_dir,
            "user.toml",
            "[server]\nport = 9000\nhost = \"127.0.0.1\"\n\n[models]\ndefault_model = \"llama\"\n",
        );
        let project = write(&temp_dir, "project.toml", "[server]\nport = 9100\n");

        let config = ConfigLoader::load_layers(Some(&user), &project).unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.models.default_model, "llama");
        assert_eq!(config.models.gemini_model, "gemini-1.5-flash");
    }

    #[test]
    fn test_cors_origins_replaced_not_merged() {
        let temp_dir = TempDir::new().unwrap();
        let user = write(
            &temp_dir,
            "user.toml",
            "[server]\ncors_origins = [\"http://a.test\", \"http://b.test\"]\n",
        );
        let project = write(&temp_dir, "project.toml", "[server]\ncors_origins = [\"*\"]\n");

        let config = ConfigLoader::load_layers(Some(&user), &project).unwrap();
        assert_eq!(config.server.cors_origins, vec!["*".to_string()]);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let project = write(&temp_dir, "project.toml", "[server\nport = ");

        let err = ConfigLoader::load_layers(None, &project).unwrap_err();
        assert!(err.to_string().contains("parsing"));
    }

    #[test]
    #[serial]
    fn test_project_config_path_env_override() {
        let temp_dir = TempDir::new().unwrap();
        // SAFETY: serialized with other env-mutating tests
        unsafe { std::env::set_var("PETCARE_PROJECT_CONFIG_DIR", temp_dir.path()) };
        let path = ConfigLoader::project_config_path();
        unsafe { std::env::remove_var("PETCARE_PROJECT_CONFIG_DIR") };

        assert_eq!(path, temp_dir.path().join("config.toml"));
        assert_eq!(
            ConfigLoader::project_config_path(),
            PathBuf::from(".petcare/config.toml")
        );
    }
}
