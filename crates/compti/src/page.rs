//! Pages, the unit of output of a build.
//!
//! Every post becomes a page at its permalink, and every standalone document under `content/` (home page, about
//! page, ...) becomes one too. Pages only live for the duration of a build.
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::{
    content::{Body, Document, Post, PostOrigin},
    errors::BuildError,
    routing::{build_file_path, build_url, has_dot_segments, normalize_url},
};

/// Layout used by post pages.
pub const POST_LAYOUT: &str = "post";

#[derive(Debug, Clone)]
pub struct Page {
    pub id: String,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Body,
    pub layout: Option<String>,
    pub post: Option<Post>,
    pub source: Option<PathBuf>,
}

impl Page {
    /// Creates the page of a post, at the URL given by the `permalink` template (e.g. `/posts/[slug]/`).
    pub fn from_post(post: Post, permalink: &str) -> Result<Page, BuildError> {
        let url = build_url(permalink, |key| (key == "slug").then_some(post.slug.as_str())).map_err(
            |param| BuildError::InvalidPermalink {
                page: post.source_label(),
                permalink: permalink.to_string(),
                param,
            },
        )?;

        if has_dot_segments(&url) {
            return Err(BuildError::InvalidUrl {
                page: post.source_label(),
                url,
            });
        }

        let source = match &post.origin {
            PostOrigin::Local(path) => Some(path.clone()),
            PostOrigin::Remote => None,
        };

        Ok(Page {
            id: format!("posts/{}", post.slug),
            url,
            title: Some(post.meta_title().to_string()),
            description: post.meta_description().map(str::to_string),
            body: post.body.clone(),
            layout: Some(POST_LAYOUT.to_string()),
            post: Some(post),
            source,
        })
    }

    /// Creates the page of a standalone document.
    ///
    /// Without a `permalink`, the URL mirrors the document's path: `index` is served at `/`, `about` at `/about/`
    /// and `notes/index` at `/notes/`.
    pub fn from_document(document: Document) -> Result<Page, BuildError> {
        let url = match document.front_matter.permalink.as_deref() {
            Some(permalink) => normalize_url(permalink),
            None => {
                let route = if document.id == "index" {
                    ""
                } else {
                    document.id.strip_suffix("/index").unwrap_or(&document.id)
                };
                normalize_url(route)
            }
        };

        if has_dot_segments(&url) {
            return Err(BuildError::InvalidUrl {
                page: document.path.display().to_string(),
                url,
            });
        }

        Ok(Page {
            url,
            title: document.front_matter.title,
            description: document.front_matter.description,
            body: Body::Markdown(document.body),
            layout: document.front_matter.layout,
            post: None,
            source: Some(document.path),
            id: document.id,
        })
    }

    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        build_file_path(&self.url, output_dir)
    }

    /// Human readable identifier used in error messages and logs.
    pub fn label(&self) -> String {
        match (&self.source, &self.post) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(post)) => post.source_label(),
            (None, None) => self.id.clone(),
        }
    }
}

/// Fails when two pages would be written to the same file, or when a page lands inside a location claimed by
/// another output of the build (`reserved`, e.g. the feed file or the image directory).
///
/// `/about/` and `/about/index.html` are distinct URLs but share one file, so the check is made on output paths.
pub fn ensure_unique_outputs(
    pages: &[Page],
    output_dir: &Path,
    reserved: &[(PathBuf, String)],
) -> Result<(), BuildError> {
    let mut seen: FxHashMap<PathBuf, &Page> = FxHashMap::default();

    for page in pages {
        let path = page.output_path(output_dir);

        if let Some((claimed, owner)) = reserved.iter().find(|(claimed, _)| path.starts_with(claimed)) {
            return Err(BuildError::OutputCollision {
                path: claimed.clone(),
                first: owner.clone(),
                second: page.label(),
            });
        }

        if let Some(first) = seen.get(&path) {
            return Err(if first.url == page.url {
                BuildError::UrlCollision {
                    url: page.url.clone(),
                    first: first.label(),
                    second: page.label(),
                }
            } else {
                BuildError::OutputCollision {
                    path,
                    first: first.label(),
                    second: page.label(),
                }
            });
        }

        seen.insert(path, page);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{DocumentFrontMatter, Seo};
    use chrono::DateTime;

    fn post(slug: &str) -> Post {
        Post {
            slug: slug.to_string(),
            title: "Hello".to_string(),
            subtitle: Some("Sub".to_string()),
            published_at: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap(),
            body: Body::Html("<p>Hi</p>".to_string()),
            seo: Some(Seo {
                title: Some("Hello SEO".to_string()),
                description: None,
            }),
            origin: PostOrigin::Remote,
        }
    }

    fn document(id: &str, permalink: Option<&str>) -> Document {
        Document {
            id: id.to_string(),
            path: PathBuf::from(format!("content/{}.md", id)),
            front_matter: DocumentFrontMatter {
                permalink: permalink.map(str::to_string),
                ..Default::default()
            },
            body: String::new(),
        }
    }

    #[test]
    fn test_post_page() {
        let page = Page::from_post(post("hello"), "/posts/[slug]/").unwrap();

        assert_eq!(page.url, "/posts/hello/");
        assert_eq!(page.title.as_deref(), Some("Hello SEO"));
        assert_eq!(page.description.as_deref(), Some("Sub"));
        assert_eq!(page.layout.as_deref(), Some(POST_LAYOUT));
        assert_eq!(
            page.output_path(Path::new("_site")),
            Path::new("_site").join("posts").join("hello").join("index.html")
        );
    }

    #[test]
    fn test_post_permalink_with_unknown_param() {
        let err = Page::from_post(post("hello"), "/posts/[id]/").unwrap_err();
        assert!(matches!(err, BuildError::InvalidPermalink { ref param, .. } if param == "id"));
    }

    fn page(document: Document) -> Page {
        Page::from_document(document).unwrap()
    }

    #[test]
    fn test_document_urls() {
        assert_eq!(page(document("index", None)).url, "/");
        assert_eq!(page(document("about", None)).url, "/about/");
        assert_eq!(page(document("notes/index", None)).url, "/notes/");
        assert_eq!(page(document("about", Some("/me"))).url, "/me/");
    }

    #[test]
    fn test_dot_segments_are_rejected() {
        let err = Page::from_post(post(".."), "/posts/[slug]/").unwrap_err();
        assert!(matches!(err, BuildError::InvalidUrl { ref url, .. } if url == "/posts/../"));

        let err = Page::from_document(document("about", Some("/notes/../../etc/"))).unwrap_err();
        assert!(matches!(err, BuildError::InvalidUrl { ref page, .. } if page.ends_with("about.md")));
    }

    #[test]
    fn test_url_collision() {
        let pages = vec![
            Page::from_post(post("hello"), "/posts/[slug]/").unwrap(),
            page(document("hello", Some("/posts/hello/"))),
        ];

        let err = ensure_unique_outputs(&pages, Path::new("_site"), &[]).unwrap_err();
        assert!(matches!(
            err,
            BuildError::UrlCollision { ref url, ref first, ref second }
                if url == "/posts/hello/" && first == "remote post `hello`" && second.ends_with("hello.md")
        ));
    }

    #[test]
    fn test_distinct_urls_sharing_a_file() {
        let pages = vec![
            page(document("about", None)),
            page(document("other", Some("/about/index.html"))),
        ];

        let err = ensure_unique_outputs(&pages, Path::new("_site"), &[]).unwrap_err();
        assert!(matches!(
            err,
            BuildError::OutputCollision { ref path, ref first, ref second }
                if path == &Path::new("_site").join("about").join("index.html")
                    && first.ends_with("about.md")
                    && second.ends_with("other.md")
        ));
    }

    #[test]
    fn test_reserved_outputs() {
        let output = Path::new("_site");
        let reserved = vec![
            (output.join("feed.xml"), "the feed".to_string()),
            (output.join("img"), "generated images".to_string()),
        ];

        let feed = vec![page(document("rss", Some("/feed.xml")))];
        let err = ensure_unique_outputs(&feed, output, &reserved).unwrap_err();
        assert!(matches!(
            err,
            BuildError::OutputCollision { ref first, .. } if first == "the feed"
        ));

        let images = vec![page(document("gallery", Some("/img/cats/")))];
        let err = ensure_unique_outputs(&images, output, &reserved).unwrap_err();
        assert!(matches!(
            err,
            BuildError::OutputCollision { ref first, .. } if first == "generated images"
        ));

        let fine = vec![page(document("imgs", Some("/imgs/")))];
        assert!(ensure_unique_outputs(&fine, output, &reserved).is_ok());
    }

    #[test]
    fn test_distinct_urls() {
        let pages = vec![
            page(document("index", None)),
            page(document("about", None)),
        ];

        assert!(ensure_unique_outputs(&pages, Path::new("_site"), &[]).is_ok());
    }
}
