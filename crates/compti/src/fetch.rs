//! Remote content fetching with a time-boxed response cache.
//!
//! Responses are stored on disk keyed by the identity of the request (method, URL and body), so that repeated
//! builds within the cache duration do not hit the remote API again.
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    content::RemotePost,
    errors::{FetchError, SiteError},
    site::RemoteSource,
};

const POSTS_QUERY: &str = r#"
query($host: String!, $first: Int!) {
  publication(host: $host) {
    posts(first: $first) {
      edges {
        node {
          publishedAt
          slug
          title
          subtitle
          content {
            html
          }
          seo {
            title
            description
          }
        }
      }
    }
  }
}
"#;

/// Parses durations such as `30s`, `1m`, `2h`, `1d` or `1w`.
pub fn parse_cache_duration(value: &str) -> Result<Duration, SiteError> {
    let invalid = || SiteError::InvalidDuration {
        value: value.to_string(),
    };

    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (amount, unit) = value.split_at(split);
    let amount: u64 = amount.parse().map_err(|_| invalid())?;

    let seconds = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 60 * 60 * 24,
        "w" => 60 * 60 * 24 * 7,
        _ => return Err(invalid()),
    };

    let seconds = amount.checked_mul(seconds).ok_or_else(invalid)?;

    Ok(Duration::from_secs(seconds))
}

/// A POST request carrying a JSON body.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub body: Value,
    /// Sent as the `Authorization` header. Not part of the request identity.
    pub token: Option<String>,
}

impl Request {
    pub fn graphql(url: impl Into<String>, query: &str, variables: Value) -> Self {
        Self {
            url: url.into(),
            body: json!({ "query": query, "variables": variables }),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Stable cache key for this request.
    pub fn identity(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"POST\n");
        hasher.update(self.url.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.body.to_string().as_bytes());
        hasher.finalize().to_hex()[..16].to_string()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fetched_at: DateTime<Utc>,
    pub response: Value,
}

impl CacheEntry {
    pub fn is_fresh(&self, duration: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.fetched_at);
        match age.to_std() {
            Ok(age) => age < duration,
            // Entries from the future are treated as stale.
            Err(_) => false,
        }
    }
}

/// On-disk response cache, one JSON file per request identity.
pub struct FetchCache {
    dir: PathBuf,
}

impl FetchCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn load(&self, key: &str) -> Result<Option<CacheEntry>, FetchError> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(FetchError::Cache { path, source }),
        };

        match serde_json::from_str(&content) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                debug!(target: "fetch", "Ignoring unreadable cache entry {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    pub fn store(&self, key: &str, entry: &CacheEntry) -> Result<(), FetchError> {
        let path = self.entry_path(key);
        let cache_error = |source| FetchError::Cache {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(cache_error)?;
        let content = serde_json::to_string(entry)
            .map_err(|e| cache_error(std::io::Error::new(ErrorKind::InvalidData, e)))?;
        fs::write(&path, content).map_err(cache_error)?;

        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

pub struct Fetcher {
    client: reqwest::Client,
    cache: FetchCache,
}

impl Fetcher {
    pub fn new(cache: FetchCache) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache,
        }
    }

    /// Returns the JSON response for `request`, from the cache if it is younger than `duration`.
    ///
    /// A zero duration always performs the request.
    pub async fn fetch_json(&self, request: &Request, duration: Duration) -> Result<Value, FetchError> {
        let key = request.identity();

        if !duration.is_zero()
            && let Some(entry) = self.cache.load(&key)?
            && entry.is_fresh(duration, Utc::now())
        {
            debug!(target: "fetch", "Cache hit for {} ({})", request.url, key);
            return Ok(entry.response);
        }

        debug!(target: "fetch", "Cache miss for {} ({})", request.url, key);
        let url = request.url.clone();

        let mut builder = self
            .client
            .post(&request.url)
            .header(CONTENT_TYPE, "application/json")
            .body(request.body.to_string());

        if let Some(token) = &request.token {
            builder = builder.header(AUTHORIZATION, token);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let response: Value =
            serde_json::from_str(&body).map_err(|source| FetchError::InvalidJson {
                url: url.clone(),
                source,
            })?;

        let entry = CacheEntry {
            fetched_at: Utc::now(),
            response,
        };
        self.cache.store(&key, &entry)?;

        Ok(entry.response)
    }
}

/// Fetches every post of the configured publication.
pub async fn fetch_posts(
    fetcher: &Fetcher,
    source: &RemoteSource,
) -> Result<Vec<RemotePost>, crate::errors::ComptiError> {
    let duration = source.cache_duration()?;
    let token = source.token();
    if token.is_none() {
        warn!(target: "fetch", "{} is not set, querying {} without authentication", source.token_env, source.endpoint);
    }

    let request = Request::graphql(
        source.endpoint.clone(),
        POSTS_QUERY,
        json!({ "host": source.host, "first": source.first }),
    )
    .with_token(token);

    let response = fetcher.fetch_json(&request, duration).await?;
    let posts = extract_posts(&source.endpoint, &response)?;

    info!(target: "fetch", "{} posts from {}", posts.len(), source.host);

    Ok(posts)
}

/// Pulls the post nodes out of a publication query response.
pub fn extract_posts(url: &str, response: &Value) -> Result<Vec<RemotePost>, FetchError> {
    if let Some(errors) = response.get("errors").and_then(Value::as_array)
        && !errors.is_empty()
    {
        let messages = errors
            .iter()
            .map(|error| {
                error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(FetchError::Api { messages });
    }

    let shape_error = |path: &str| FetchError::Shape {
        url: url.to_string(),
        path: path.to_string(),
    };

    let edges = response
        .pointer("/data/publication/posts/edges")
        .and_then(Value::as_array)
        .ok_or_else(|| shape_error("data.publication.posts.edges"))?;

    edges
        .iter()
        .enumerate()
        .map(|(position, edge)| -> Result<RemotePost, FetchError> {
            let node = edge
                .get("node")
                .ok_or_else(|| shape_error(&format!("edges[{}].node", position)))?;
            let mut post: RemotePost = serde_json::from_value(node.clone())
                .map_err(|_| shape_error(&format!("edges[{}].node", position)))?;
            post.position = position;
            Ok(post)
        })
        .collect()
}
