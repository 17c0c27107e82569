//! Client configuration.
//!
//! Resolves the Supabase project endpoints and the photo bucket from
//! environment-style lookups. Only public values belong here: the anon key is
//! safe to ship, user credentials are never stored in this struct.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const ENV_SUPABASE_URL: &str = "TANDEM_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "TANDEM_SUPABASE_ANON_KEY";
pub const ENV_PHOTO_BUCKET: &str = "TANDEM_PHOTO_BUCKET";

const LEGACY_ENV_SUPABASE_URL: &str = "VITE_SUPABASE_URL";
const LEGACY_ENV_SUPABASE_ANON_KEY: &str = "VITE_SUPABASE_ANON_KEY";

pub const DEFAULT_PHOTO_BUCKET: &str = "milestone-photos";

/// Runtime configuration for the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Project base URL, without a trailing slash.
    pub supabase_url: String,
    /// Public anon key sent as `apikey` on every request.
    pub supabase_anon_key: String,
    /// Storage bucket holding milestone photos.
    #[serde(default = "default_photo_bucket")]
    pub photo_bucket: String,
}

impl ClientConfig {
    /// Build a config from explicit values, validating and normalizing them.
    pub fn new(
        supabase_url: impl Into<String>,
        supabase_anon_key: impl Into<String>,
    ) -> Result<Self> {
        let supabase_url = normalize_url(supabase_url.into(), ENV_SUPABASE_URL)?;
        let supabase_anon_key = normalize_text_option(Some(supabase_anon_key.into()))
            .ok_or_else(|| Error::Config(format!("{ENV_SUPABASE_ANON_KEY} must not be empty")))?;

        Ok(Self {
            supabase_url,
            supabase_anon_key,
            photo_bucket: default_photo_bucket(),
        })
    }

    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// `TANDEM_*` variables win; the `VITE_*` names of the web build are
    /// accepted as fallbacks.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |primary: &str, fallback: &str| {
            normalize_text_option(lookup(primary))
                .or_else(|| normalize_text_option(lookup(fallback)))
        };

        let url = read(ENV_SUPABASE_URL, LEGACY_ENV_SUPABASE_URL)
            .ok_or_else(|| Error::Config(format!("{ENV_SUPABASE_URL} is not set")))?;
        let anon_key = read(ENV_SUPABASE_ANON_KEY, LEGACY_ENV_SUPABASE_ANON_KEY)
            .ok_or_else(|| Error::Config(format!("{ENV_SUPABASE_ANON_KEY} is not set")))?;

        let mut config = Self::new(url, anon_key)?;
        if let Some(bucket) = normalize_text_option(lookup(ENV_PHOTO_BUCKET)) {
            config.photo_bucket = bucket;
        }
        Ok(config)
    }

    #[must_use]
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.supabase_url)
    }

    #[must_use]
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.supabase_url)
    }

    #[must_use]
    pub fn storage_url(&self) -> String {
        format!("{}/storage/v1", self.supabase_url)
    }
}

fn default_photo_bucket() -> String {
    DEFAULT_PHOTO_BUCKET.to_string()
}

fn normalize_url(raw: String, field: &str) -> Result<String> {
    let value = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config(format!("{field} must not be empty")))?;
    if !is_http_url(&value) {
        return Err(Error::Config(format!(
            "{field} must include http:// or https://"
        )));
    }
    Ok(value.trim_end_matches('/').to_string())
}
