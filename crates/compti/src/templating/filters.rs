//! Named value transformations available to layouts, e.g. turning an RFC 3339 timestamp into `01 January 2024`.
//!
//! Every filter takes the value, an optional base URL (an absolute URL or a site path) and the site.
use chrono::SecondsFormat;
use lol_html::{RewriteStrSettings, element, rewrite_str};
use rustc_hash::FxHashMap;
use url::Url;

use crate::{content::parse_date, errors::LayoutError, site::Site};

pub type Filter = fn(&str, Option<&str>, &Site) -> Result<String, LayoutError>;

/// Registry of filters, filled once before rendering starts.
pub struct Filters {
    filters: FxHashMap<&'static str, Filter>,
}

impl Filters {
    pub fn new() -> Self {
        Self {
            filters: FxHashMap::default(),
        }
    }

    /// `postDate`, `dateToRfc3339`, `absoluteUrl` and `convertHtmlToAbsoluteUrls`.
    pub fn with_defaults() -> Self {
        let mut filters = Self::new();
        filters.register("postDate", post_date);
        filters.register("dateToRfc3339", date_to_rfc3339);
        filters.register("absoluteUrl", absolute_url);
        filters.register("convertHtmlToAbsoluteUrls", convert_html_to_absolute_urls);
        filters
    }

    pub fn register(&mut self, name: &'static str, filter: Filter) {
        self.filters.insert(name, filter);
    }

    pub fn apply(
        &self,
        name: &str,
        value: &str,
        base: Option<&str>,
        site: &Site,
    ) -> Result<String, LayoutError> {
        let filter = self
            .filters
            .get(name)
            .ok_or_else(|| LayoutError::UnknownFilter {
                name: name.to_string(),
            })?;

        filter(value, base, site)
    }
}

impl Default for Filters {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn invalid_date(value: &str) -> LayoutError {
    LayoutError::InvalidDate {
        value: value.to_string(),
    }
}

/// `2024-01-01T10:00:00Z` → `01 January 2024`
pub fn post_date(value: &str, _base: Option<&str>, _site: &Site) -> Result<String, LayoutError> {
    let date = parse_date(value).map_err(|_| invalid_date(value))?;
    Ok(date.format("%d %B %Y").to_string())
}

pub fn date_to_rfc3339(
    value: &str,
    _base: Option<&str>,
    _site: &Site,
) -> Result<String, LayoutError> {
    let date = parse_date(value).map_err(|_| invalid_date(value))?;
    Ok(date.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Resolves a URL against `base`, the site root by default. URLs that already carry a scheme are returned
/// unchanged.
pub fn absolute_url(value: &str, base: Option<&str>, site: &Site) -> Result<String, LayoutError> {
    let base = base_url(base, site)?;
    to_absolute(value, &base, site)
}

/// Makes every `href`, `src` and `srcset` URL of an HTML fragment absolute, for use outside of the site (feeds).
///
/// Relative URLs are resolved against `base`, normally the URL of the page the fragment belongs to.
pub fn convert_html_to_absolute_urls(
    value: &str,
    base: Option<&str>,
    site: &Site,
) -> Result<String, LayoutError> {
    let base = base_url(base, site)?;
    let base = &base;

    let element_content_handlers = vec![
        element!("[href]", |el| {
            if let Some(href) = el.get_attribute("href") {
                let href = to_absolute(&href, base, site).map_err(|e| e.to_string())?;
                el.set_attribute("href", &href)?;
            }
            Ok(())
        }),
        element!("[src]", |el| {
            if let Some(src) = el.get_attribute("src") {
                let src = to_absolute(&src, base, site).map_err(|e| e.to_string())?;
                el.set_attribute("src", &src)?;
            }
            Ok(())
        }),
        element!("[srcset]", |el| {
            if let Some(srcset) = el.get_attribute("srcset") {
                let srcset = srcset
                    .split(',')
                    .map(|candidate| {
                        let candidate = candidate.trim();
                        match candidate.split_once(' ') {
                            Some((url, descriptor)) => to_absolute(url, base, site)
                                .map(|url| format!("{} {}", url, descriptor.trim())),
                            None => to_absolute(candidate, base, site),
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| e.to_string())?
                    .join(", ");
                el.set_attribute("srcset", &srcset)?;
            }
            Ok(())
        }),
    ];

    rewrite_str(
        value,
        RewriteStrSettings {
            element_content_handlers,
            ..RewriteStrSettings::new()
        },
    )
    .map_err(|source| LayoutError::Rewrite { source })
}

/// `base` as an absolute URL. Site paths such as `/posts/hello/` are taken relative to the site's URL.
fn base_url(base: Option<&str>, site: &Site) -> Result<Url, LayoutError> {
    let base = match base {
        Some(base) if Url::parse(base).is_ok() => base.to_string(),
        Some(path) => site.absolute_url(path),
        None => site.absolute_url("/"),
    };

    Url::parse(&base).map_err(|source| LayoutError::InvalidUrl { value: base, source })
}

fn to_absolute(url: &str, base: &Url, site: &Site) -> Result<String, LayoutError> {
    // Fragments, protocol-relative URLs and anything with a scheme are left alone.
    if url.is_empty() || url.starts_with('#') || url.starts_with("//") || Url::parse(url).is_ok() {
        return Ok(url.to_string());
    }

    // Site paths keep any path prefix of the site's URL.
    if url.starts_with('/') {
        return Ok(site.absolute_url(url));
    }

    base.join(url)
        .map(String::from)
        .map_err(|source| LayoutError::InvalidUrl {
            value: url.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::Social;

    fn site() -> Site {
        Site {
            title: "compti.me".to_string(),
            url: "https://compti.me/".to_string(),
            description: String::new(),
            author: "Someone".to_string(),
            language: "en".to_string(),
            since: None,
            social: Social::default(),
        }
    }

    #[test]
    fn test_post_date() {
        let filters = Filters::with_defaults();

        assert_eq!(
            filters.apply("postDate", "2024-01-01T10:00:00.000Z", None, &site()).unwrap(),
            "01 January 2024"
        );
        assert_eq!(
            filters.apply("postDate", "2023-11-23", None, &site()).unwrap(),
            "23 November 2023"
        );
        assert!(matches!(
            filters.apply("postDate", "not a date", None, &site()),
            Err(LayoutError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_date_to_rfc3339() {
        let filters = Filters::with_defaults();

        assert_eq!(
            filters.apply("dateToRfc3339", "2024-01-01", None, &site()).unwrap(),
            "2024-01-01T00:00:00Z"
        );
    }

    #[test]
    fn test_absolute_url() {
        let filters = Filters::with_defaults();

        assert_eq!(
            filters.apply("absoluteUrl", "/posts/hello/", None, &site()).unwrap(),
            "https://compti.me/posts/hello/"
        );
        assert_eq!(
            filters.apply("absoluteUrl", "https://example.com/", None, &site()).unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_convert_html_to_absolute_urls() {
        let html = r##"<p><a href="/about/">About</a> <a href="#top">Top</a> <a href="mailto:a@b.c">Mail</a></p><img src="/img/cat-600.png" srcset="/img/cat-600.webp 600w, /img/cat-900.webp 900w">"##;

        let converted = convert_html_to_absolute_urls(html, None, &site()).unwrap();

        assert!(converted.contains(r#"href="https://compti.me/about/""#));
        assert!(converted.contains(r##"href="#top""##));
        assert!(converted.contains(r#"href="mailto:a@b.c""#));
        assert!(converted.contains(r#"src="https://compti.me/img/cat-600.png""#));
        assert!(converted.contains(
            r#"srcset="https://compti.me/img/cat-600.webp 600w, https://compti.me/img/cat-900.webp 900w""#
        ));
    }

    #[test]
    fn test_relative_urls_resolve_against_the_page() {
        let html = r#"<a href="../b/">Next</a> <img src="diagram.svg"> <a href="./notes.txt">Notes</a>"#;

        let converted = convert_html_to_absolute_urls(html, Some("/posts/a/"), &site()).unwrap();

        assert!(converted.contains(r#"href="https://compti.me/posts/b/""#));
        assert!(converted.contains(r#"src="https://compti.me/posts/a/diagram.svg""#));
        assert!(converted.contains(r#"href="https://compti.me/posts/a/notes.txt""#));
    }

    #[test]
    fn test_absolute_url_with_base() {
        let filters = Filters::with_defaults();

        assert_eq!(
            filters
                .apply("absoluteUrl", "cover.png", Some("https://compti.me/posts/a/"), &site())
                .unwrap(),
            "https://compti.me/posts/a/cover.png"
        );
        assert_eq!(
            filters.apply("absoluteUrl", "about/", None, &site()).unwrap(),
            "https://compti.me/about/"
        );
    }

    #[test]
    fn test_site_paths_keep_the_site_prefix() {
        let site = Site {
            url: "https://example.com/blog".to_string(),
            ..site()
        };

        let html = r#"<a href="/posts/a/">A</a> <a href="b/">B</a>"#;

        let converted = convert_html_to_absolute_urls(html, Some("/posts/"), &site).unwrap();

        assert!(converted.contains(r#"href="https://example.com/blog/posts/a/""#));
        assert!(converted.contains(r#"href="https://example.com/blog/posts/b/""#));
    }

    #[test]
    fn test_unknown_filter() {
        let filters = Filters::new();

        assert!(matches!(
            filters.apply("postDate", "2024-01-01", None, &site()),
            Err(LayoutError::UnknownFilter { ref name }) if name == "postDate"
        ));
    }
}
