//! Posts and the mapping of every post source into one uniform shape.
//!
//! Posts come either from the remote blog API ([`RemotePost`]) or from markdown files under `content/posts/`
//! ([`LocalPost`]). Both are wrapped in a [`RawPost`] and turned into a [`Post`] through [`Normalize`].
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use rustc_hash::FxHashMap;
use serde::Deserialize;

mod components;
pub mod local;
pub mod markdown;
mod slugger;

use crate::errors::ContentError;
pub use components::ImageComponent;
pub use local::{Document, DocumentFrontMatter, LocalContent, PostFrontMatter, load_local_content};
pub use markdown::{MarkdownHeading, MarkdownOptions, RenderedMarkdown, render_markdown};

/// Body of a post or page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Markdown(String),
    /// Already rendered HTML, as delivered by the remote API.
    Html(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Seo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Seo {
    /// Drops blank fields, and the whole override when nothing is left.
    fn cleaned(self) -> Option<Seo> {
        let seo = Seo {
            title: clean(self.title),
            description: clean(self.description),
        };

        if seo.title.is_none() && seo.description.is_none() {
            None
        } else {
            Some(seo)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOrigin {
    Remote,
    Local(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub published_at: DateTime<FixedOffset>,
    pub body: Body,
    pub seo: Option<Seo>,
    pub origin: PostOrigin,
}

impl Post {
    /// Title used in `<title>` and social meta tags. An SEO title wins over the post title.
    pub fn meta_title(&self) -> &str {
        self.seo
            .as_ref()
            .and_then(|seo| seo.title.as_deref())
            .unwrap_or(&self.title)
    }

    /// Description used in meta tags.
    ///
    /// An SEO description wins. Remote posts otherwise fall back to their subtitle (empty when missing), local
    /// posts return `None` and leave the choice to the layout.
    pub fn meta_description(&self) -> Option<&str> {
        if let Some(description) = self.seo.as_ref().and_then(|seo| seo.description.as_deref()) {
            return Some(description);
        }

        match self.origin {
            PostOrigin::Remote => Some(self.subtitle.as_deref().unwrap_or_default()),
            PostOrigin::Local(_) => None,
        }
    }

    /// Human readable identifier used in error messages.
    pub fn source_label(&self) -> String {
        match &self.origin {
            PostOrigin::Remote => format!("remote post `{}`", self.slug),
            PostOrigin::Local(path) => path.display().to_string(),
        }
    }
}

/// Post as returned by the remote API. Every field is optional so that missing data can be reported precisely.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePost {
    #[serde(skip)]
    pub position: usize,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub content: Option<RemoteContent>,
    #[serde(default)]
    pub seo: Option<Seo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteContent {
    #[serde(default)]
    pub html: Option<String>,
}

/// Post read from a markdown file.
#[derive(Debug, Clone)]
pub struct LocalPost {
    pub path: PathBuf,
    pub front_matter: PostFrontMatter,
    pub body: String,
}

#[derive(Debug, Clone)]
pub enum RawPost {
    Remote(RemotePost),
    Local(LocalPost),
}

pub trait Normalize {
    fn normalize(self) -> Result<Post, ContentError>;
}

impl Normalize for RawPost {
    fn normalize(self) -> Result<Post, ContentError> {
        match self {
            RawPost::Remote(post) => post.normalize(),
            RawPost::Local(post) => post.normalize(),
        }
    }
}

impl Normalize for RemotePost {
    fn normalize(self) -> Result<Post, ContentError> {
        let label = match self.slug.as_deref() {
            Some(slug) if !slug.trim().is_empty() => format!("remote post `{}`", slug.trim()),
            _ => format!("#{} from the remote API", self.position),
        };
        let missing = |field| ContentError::MalformedPost {
            post: label.clone(),
            field,
        };

        let slug = clean(self.slug).ok_or_else(|| missing("slug"))?;
        let title = clean(self.title).ok_or_else(|| missing("title"))?;
        let published_at = clean(self.published_at).ok_or_else(|| missing("publishedAt"))?;
        let html = self
            .content
            .and_then(|content| content.html)
            .ok_or_else(|| missing("content.html"))?;

        Ok(Post {
            published_at: parse_post_date(&label, &published_at)?,
            slug,
            title,
            subtitle: clean(self.subtitle),
            body: Body::Html(html),
            seo: self.seo.and_then(Seo::cleaned),
            origin: PostOrigin::Remote,
        })
    }
}

impl Normalize for LocalPost {
    fn normalize(self) -> Result<Post, ContentError> {
        let label = self.path.display().to_string();
        let missing = |field| ContentError::MalformedPost {
            post: label.clone(),
            field,
        };

        let front_matter = self.front_matter;
        let slug = clean(front_matter.slug)
            .or_else(|| {
                self.path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
            })
            .ok_or_else(|| missing("slug"))?;
        let title = clean(front_matter.title).ok_or_else(|| missing("title"))?;
        let date = clean(front_matter.date).ok_or_else(|| missing("date"))?;

        // A plain `description` in front matter acts as the SEO description.
        let seo = front_matter.seo.unwrap_or_default();
        let seo = Seo {
            title: seo.title,
            description: seo.description.or(front_matter.description),
        };

        Ok(Post {
            published_at: parse_post_date(&label, &date)?,
            slug,
            title,
            subtitle: clean(front_matter.subtitle),
            body: Body::Markdown(self.body),
            seo: seo.cleaned(),
            origin: PostOrigin::Local(self.path),
        })
    }
}

impl Normalize for Post {
    fn normalize(self) -> Result<Post, ContentError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ContentError::MalformedPost {
                post: self.source_label(),
                field: "title",
            });
        }

        Ok(Post {
            slug: self.slug.trim().to_string(),
            title,
            subtitle: clean(self.subtitle),
            seo: self.seo.and_then(Seo::cleaned),
            ..self
        })
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_post_date(label: &str, value: &str) -> Result<DateTime<FixedOffset>, ContentError> {
    parse_date(value).map_err(|source| ContentError::InvalidDate {
        post: label.to_string(),
        value: value.to_string(),
        source,
    })
}

/// Parses an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (taken as midnight UTC).
pub fn parse_date(value: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value).or_else(|_| {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(|date| date.and_time(NaiveTime::MIN).and_utc().fixed_offset())
    })
}

/// Sorts posts for listing: newest first, ties broken by slug.
pub fn sort_posts(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.slug.cmp(&b.slug))
    });
}

/// Fails when two posts share a slug, whatever their sources.
pub fn ensure_unique_slugs(posts: &[Post]) -> Result<(), ContentError> {
    let mut seen: FxHashMap<&str, &Post> = FxHashMap::default();

    for post in posts {
        if let Some(first) = seen.insert(&post.slug, post) {
            return Err(ContentError::DuplicatePost {
                slug: post.slug.clone(),
                first: first.source_label(),
                second: post.source_label(),
            });
        }
    }

    Ok(())
}
