use database_api::ClientParams;
use serde::Deserialize;
use thiserror::Error;
use tracing as log;
use url::Url;

use crate::DEFAULT_TABLE;

pub const URL_VAR: &str = "SUPABASE_URL";
pub const KEY_VAR: &str = "SUPABASE_ANON_KEY";

// Local development stack only, production must set both variables
const DEV_URL: &str = "http://127.0.0.1:54321";
const DEV_KEY: &str = "local-development-anon-key";

fn default_table() -> Box<str> {
    DEFAULT_TABLE.into()
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing {0}, set it in the environment or the config file")]
    Missing(&'static str),
    #[error("SUPABASE_URL is not a valid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("SUPABASE_URL must use http or https, got {0:?}")]
    UnsupportedScheme(String),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Connection settings as read from a config file and the environment.
#[derive(Deserialize, Debug, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub url: Option<Box<str>>,
    #[serde(default)]
    pub key: Option<Box<str>>,
    #[serde(default = "default_table")]
    pub table: Box<str>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            table: default_table(),
        }
    }
}

/// Validated settings the store is built from.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub url: Url,
    pub key: Box<str>,
    pub table: Box<str>,
}

impl StoreSettings {
    pub fn client_params(&self) -> ClientParams {
        ClientParams {
            url: self.url.clone(),
            key: self.key.clone(),
        }
    }
}

impl StoreConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Overrides file values with non-blank values found through `lookup`.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty()).map(String::into_boxed_str);
        if let Some(url) = var(URL_VAR) {
            self.url = Some(url);
        }
        if let Some(key) = var(KEY_VAR) {
            self.key = Some(key);
        }
        self
    }

    /// Validates the configuration, falling back to the local development
    /// endpoint and key when `allow_fallback` is set.
    pub fn resolve(self, allow_fallback: bool) -> Result<StoreSettings, ConfigError> {
        let url = pick(self.url, URL_VAR, DEV_URL, allow_fallback)?;
        let key = pick(self.key, KEY_VAR, DEV_KEY, allow_fallback)?;

        let url = Url::parse(&url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_owned()));
        }

        Ok(StoreSettings {
            url,
            key,
            table: self.table,
        })
    }
}

fn pick(
    value: Option<Box<str>>,
    name: &'static str,
    fallback: &str,
    allow_fallback: bool,
) -> Result<Box<str>, ConfigError> {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => Ok(v.trim().into()),
        None if allow_fallback => {
            log::warn!("{} is not set, using the local development default", name);
            Ok(fallback.into())
        }
        None => Err(ConfigError::Missing(name)),
    }
}
