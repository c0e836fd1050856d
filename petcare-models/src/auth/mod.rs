//! Credential pools for provider API keys.
//!
//! Keys are read from environment variables. A provider may have several
//! keys configured (`GEMINI_API_KEY`, `GEMINI_API_KEY2`, ...) which are
//! rotated through when one hits a rate limit. See [`crate::rotation`].
//!
//! # Example
//!
//! ```ignore
//! use petcare_models::auth::CredentialPool;
//!
//! let pool = CredentialPool::from_env("gemini");
//! println!("{} gemini keys configured", pool.len());
//! ```

use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

/// A secure API key that prevents accidental logging.
///
/// The key is wrapped in `SecretString` which:
/// - Implements `Debug` as `"[REDACTED]"`
/// - Zeroizes memory on drop
/// - Requires explicit `.expose_secret()` to access the value
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Create a new API key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    /// Expose the secret key value.
    ///
    /// Use sparingly - only when actually sending to an API.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey([REDACTED])")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Base environment variable names for each provider.
const ENV_VARS: &[(&str, &str)] = &[("gemini", "GEMINI_API_KEY"), ("huggingface", "HF_TOKEN")];

/// Highest numbered suffix scanned after the base variable (`KEY2`..`KEY9`).
const MAX_ENV_SUFFIX: usize = 9;

/// Get the base environment variable name for a provider.
pub fn env_var_for_provider(provider: &str) -> Option<&'static str> {
    ENV_VARS
        .iter()
        .find(|(p, _)| *p == provider)
        .map(|(_, v)| *v)
}

/// Ordered pool of API keys for one provider with a shared rotation cursor.
///
/// The cursor is atomic so a pool can sit behind an `Arc` and be used by
/// concurrent requests.
pub struct CredentialPool {
    provider: String,
    keys: Vec<ApiKey>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    /// Create a pool from raw key strings.
    ///
    /// Keys are trimmed; empty entries are dropped. Order is preserved.
    pub fn new<I, S>(provider: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .filter_map(|k| {
                let trimmed = k.as_ref().trim();
                (!trimmed.is_empty()).then(|| ApiKey::new(trimmed))
            })
            .collect();

        Self {
            provider: provider.into(),
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    /// An empty pool; any call through it fails with `NoCredentialsConfigured`.
    pub fn empty(provider: impl Into<String>) -> Self {
        Self::new(provider, Vec::<String>::new())
    }

    /// Load a provider's keys from the environment.
    ///
    /// Reads the base variable (e.g. `GEMINI_API_KEY`) followed by the
    /// numbered variants `GEMINI_API_KEY2` through `GEMINI_API_KEY9`.
    pub fn from_env(provider: &str) -> Self {
        let Some(base) = env_var_for_provider(provider) else {
            debug!(provider, "no environment variable registered for provider");
            return Self::empty(provider);
        };

        let names = std::iter::once(base.to_string())
            .chain((2..=MAX_ENV_SUFFIX).map(|n| format!("{base}{n}")));
        let values: Vec<String> = names.filter_map(|name| env::var(name).ok()).collect();

        let pool = Self::new(provider, values);
        debug!(provider, keys = pool.len(), "loaded credential pool from environment");
        pool
    }

    /// Provider this pool belongs to.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Number of usable keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys are configured.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Index of the key the next call will start with.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Key at `index` (wrapped into range).
    pub(crate) fn key_at(&self, index: usize) -> Option<&ApiKey> {
        if self.keys.is_empty() {
            return None;
        }
        self.keys.get(index % self.keys.len())
    }

    /// Move the cursor past `used`, unless another caller already moved it.
    ///
    /// Returns the cursor after the call.
    pub(crate) fn advance_from(&self, used: usize) -> usize {
        let next = (used + 1) % self.keys.len().max(1);
        match self
            .cursor
            .compare_exchange(used, next, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => next,
            Err(current) => current,
        }
    }

    /// Message telling operators which variables to set.
    pub fn missing_hint(&self) -> String {
        match env_var_for_provider(&self.provider) {
            Some(base) => format!(
                "Set {base} (and optionally {base}2, {base}3, ... for rotation)."
            ),
            None => format!("Configure at least one API key for {}.", self.provider),
        }
    }
}

impl std::fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPool")
            .field("provider", &self.provider)
            .field("keys", &self.keys.len())
            .field("cursor", &self.cursor())
            .finish()
    }
}
