use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::CoreError;

/// Prefix of the environment variables read by [`Settings::load`],
/// e.g. `FINANCIARY_REMOTE__BASE_URL`.
pub const ENV_PREFIX: &str = "FINANCIARY";

/// PocketBase refuses pages larger than this.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How to reach the remote record store.
    pub remote: RemoteSettings,

    /// Where the auth credential is persisted between runs.
    /// `None` keeps it in memory only.
    pub credentials_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote: RemoteSettings::default(),
            credentials_path: None,
        }
    }
}

/// Connection settings for the remote record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Root URL of the backend (e.g., "http://127.0.0.1:8090")
    pub base_url: String,

    /// Auth collection holding the user accounts
    pub users_collection: String,

    /// Collection holding the transaction records
    pub transactions_collection: String,

    /// Per-request timeout. Not applied on wasm32, where the browser owns timeouts.
    pub timeout_secs: u64,

    /// Extra attempts for idempotent reads (listing, token refresh) after a network failure.
    /// Writes are never retried.
    pub max_retries: u32,

    /// Records fetched per listing request
    pub page_size: u32,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8090".to_string(),
            users_collection: "users".to_string(),
            transactions_collection: "transactions".to_string(),
            timeout_secs: 30,
            max_retries: 0,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

impl Settings {
    /// Load settings from an optional file (TOML, JSON, YAML... by extension)
    /// and `FINANCIARY_*` environment variables, on top of the defaults.
    ///
    /// Nested keys use a double underscore: `FINANCIARY_REMOTE__TIMEOUT_SECS=10`.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        self.remote.base_url()?;
        if self.remote.page_size == 0 || self.remote.page_size > MAX_PAGE_SIZE {
            return Err(CoreError::Config(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.remote.page_size
            )));
        }
        if self.remote.users_collection.trim().is_empty()
            || self.remote.transactions_collection.trim().is_empty()
        {
            return Err(CoreError::Config("collection names must not be empty".into()));
        }
        Ok(())
    }
}

impl RemoteSettings {
    /// The parsed base URL, always ending with a `/` so that joins append.
    pub fn base_url(&self) -> Result<Url, CoreError> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)
            .map_err(|e| CoreError::Config(format!("invalid base_url '{}': {e}", self.base_url)))?;
        if url.cannot_be_a_base() {
            return Err(CoreError::Config(format!(
                "invalid base_url '{}': not a base URL",
                self.base_url
            )));
        }
        Ok(url)
    }
}
