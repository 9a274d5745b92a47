//! Error types for compti.
//!
//! Every fatal condition of a build maps to one variant carrying the identifiers a reader needs to find the
//! offending input: the page id, the post slug, the file path or the request URL.
use std::fmt::{self, Debug, Formatter};
use std::path::PathBuf;
use thiserror::Error;

macro_rules! impl_debug_for_error {
    ($($t:ty),*) => {
        $(
            impl Debug for $t {
                fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                    // Errors returned from `main` are printed through Debug, thiserror only implements Display.
                    write!(f, "{}", self)
                }
            }
        )*
    };
}

#[derive(Error)]
pub enum SiteError {
    #[error("Failed to read site configuration: {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid site configuration in {path}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid cache duration `{value}`, expected a number followed by one of s, m, h, d, w (e.g. `1m`)")]
    InvalidDuration { value: String },
}

#[derive(Error)]
pub enum FetchError {
    #[error("Request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Request to {url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("Response from {url} is not valid JSON")]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Remote API reported errors: {messages}")]
    Api { messages: String },
    #[error("Unexpected response shape from {url}: `{path}` is missing or malformed")]
    Shape { url: String, path: String },
    #[error("Failed to access fetch cache at {path}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error)]
pub enum ContentError {
    #[error("Failed to read content file: {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid front matter in {path}")]
    InvalidFrontMatter {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid content pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("Post {post} is missing required field `{field}`")]
    MalformedPost { post: String, field: &'static str },
    #[error("Post {post} has an invalid publication date `{value}`")]
    InvalidDate {
        post: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("Two posts share the slug `{slug}`: {first} and {second}")]
    DuplicatePost {
        slug: String,
        first: String,
        second: String,
    },
}

#[derive(Error)]
pub enum LayoutError {
    #[error("Page `{page}` uses layout `{layout}`, which is not registered")]
    Missing { page: String, layout: String },
    #[error("Page `{page}` has a cyclic layout chain: {chain}")]
    Cycle { page: String, chain: String },
    #[error("No filter named `{name}` is registered")]
    UnknownFilter { name: String },
    #[error("`{value}` is not a valid date")]
    InvalidDate { value: String },
    #[error("Cannot resolve `{value}` to an absolute URL")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Failed to rewrite HTML")]
    Rewrite {
        #[source]
        source: lol_html::errors::RewritingError,
    },
}

#[derive(Error)]
pub enum BuildError {
    #[error("Both `{first}` and `{second}` map to the output URL `{url}`")]
    UrlCollision {
        url: String,
        first: String,
        second: String,
    },
    #[error("Both `{first}` and `{second}` write to {path}")]
    OutputCollision {
        path: PathBuf,
        first: String,
        second: String,
    },
    #[error("`{page}` maps to the URL `{url}`, which contains a `.` or `..` segment")]
    InvalidUrl { page: String, url: String },
    #[error("Permalink `{permalink}` of `{page}` is missing the parameter `{param}`")]
    InvalidPermalink {
        page: String,
        permalink: String,
        param: String,
    },
    #[error("Failed to write output file: {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error)]
pub enum AssetError {
    #[error("Failed to read asset file: {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode image: {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to encode {path} as {format}")]
    Encode {
        path: PathBuf,
        format: &'static str,
        reason: String,
    },
    #[error("Failed to write asset file: {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error)]
pub enum FeedError {
    #[error("Generated feed is invalid: {reason}")]
    Invalid { reason: String },
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

#[derive(Error, Debug)]
pub enum ComptiError {
    #[error(transparent)]
    Site(#[from] SiteError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl_debug_for_error!(
    SiteError,
    FetchError,
    ContentError,
    LayoutError,
    BuildError,
    AssetError,
    FeedError
);
