//! Site-wide configuration.
//!
//! The [`Site`] is read once from `site.yaml` at the root of the input directory and then passed by reference
//! through every render call. It never changes during a build.
//!
//! ## Example
//! ```yaml
//! title: compti.me
//! url: https://compti.me
//! description: Blog about Software Dev, Networking, Unix and more
//! author: Matthew Murray
//! since: 2021
//! social:
//!   email: someone@example.com
//!   github: someone
//! remote:
//!   host: compti.me
//!   cache_duration: 1m
//! ```
use std::{env, fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::{errors::SiteError, fetch::parse_cache_duration};

pub const DEFAULT_ENDPOINT: &str = "https://gql.hashnode.com";
pub const DEFAULT_TOKEN_ENV: &str = "HASHNODE_TOKEN";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Site {
    pub title: String,
    /// Base URL of the deployed site, e.g. `https://compti.me`. Canonical links and feed links are built from it.
    pub url: String,
    #[serde(default)]
    pub description: String,
    pub author: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// First year shown in the copyright notice.
    #[serde(default)]
    pub since: Option<i32>,
    #[serde(default)]
    pub social: Social,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Social {
    pub email: Option<String>,
    pub github: Option<String>,
}

fn default_language() -> String {
    "en".to_string()
}

impl Site {
    /// Joins `path` onto the site's base URL.
    pub fn absolute_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Where remote posts come from.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RemoteSource {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Publication host as known by the blog API, e.g. `compti.me`.
    pub host: String,
    /// Number of posts requested.
    #[serde(default = "default_first")]
    pub first: u32,
    #[serde(default = "default_cache_duration")]
    pub cache_duration: String,
    /// Name of the environment variable holding the API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_first() -> u32 {
    20
}

fn default_cache_duration() -> String {
    "1m".to_string()
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

impl RemoteSource {
    pub fn cache_duration(&self) -> Result<Duration, SiteError> {
        parse_cache_duration(&self.cache_duration)
    }

    /// Reads the API token from the environment. A missing or empty variable yields `None`.
    pub fn token(&self) -> Option<String> {
        env::var(&self.token_env).ok().filter(|token| !token.is_empty())
    }
}

/// Contents of `site.yaml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SiteConfig {
    #[serde(flatten)]
    pub site: Site,
    #[serde(default)]
    pub remote: Option<RemoteSource>,
}

impl SiteConfig {
    pub fn load(path: &Path) -> Result<Self, SiteError> {
        let content = fs::read_to_string(path).map_err(|source| SiteError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content).map_err(|source| SiteError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}
