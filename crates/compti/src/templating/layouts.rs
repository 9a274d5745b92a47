//! Layouts wrap the rendered body of a page, from the page's own layout outward.
//!
//! A layout may declare a parent: `post` renders the article and hands the result to `base`, which renders the
//! full document. Layouts never read the clock or the filesystem, rendering the same page twice gives the same
//! bytes.
use maud::{Markup, PreEscaped};
use rustc_hash::FxHashMap;

use super::filters::Filters;
use crate::{errors::LayoutError, page::Page, site::Site};

mod base;
mod home;
mod post;

pub type LayoutFn = fn(&LayoutContext) -> Result<Markup, LayoutError>;

#[derive(Clone, Copy)]
pub struct Layout {
    pub parent: Option<&'static str>,
    pub render: LayoutFn,
}

/// Everything shared by the pages of a build.
pub struct RenderScope<'a> {
    pub site: &'a Site,
    /// Post pages, in listing order.
    pub posts: &'a [Page],
    pub filters: &'a Filters,
    /// Year shown as the end of the copyright range in the footer.
    pub copyright_year: Option<i32>,
    /// Site path of the syndication feed, if one is generated.
    pub feed_url: Option<&'a str>,
}

pub struct LayoutContext<'a> {
    pub scope: &'a RenderScope<'a>,
    pub page: &'a Page,
    /// Rendered output of the previous step: the page body, or the output of a child layout.
    pub content: PreEscaped<&'a str>,
}

impl LayoutContext<'_> {
    pub fn site(&self) -> &Site {
        self.scope.site
    }

    /// Applies a registered filter, relative URLs resolve against the page's URL.
    pub fn filter(&self, name: &str, value: &str) -> Result<String, LayoutError> {
        self.scope
            .filters
            .apply(name, value, Some(self.page.url.as_str()), self.scope.site)
    }
}

pub struct LayoutRegistry {
    layouts: FxHashMap<String, Layout>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self {
            layouts: FxHashMap::default(),
        }
    }

    /// `base`, `post` and `home`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            "base",
            Layout {
                parent: None,
                render: base::render,
            },
        );
        registry.register(
            "post",
            Layout {
                parent: Some("base"),
                render: post::render,
            },
        );
        registry.register(
            "home",
            Layout {
                parent: Some("base"),
                render: home::render,
            },
        );
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, layout: Layout) {
        self.layouts.insert(name.into(), layout);
    }

    pub fn get(&self, name: &str) -> Option<&Layout> {
        self.layouts.get(name)
    }

    /// Wraps `content` in the page's layout chain. Pages without a layout are returned as-is.
    pub fn apply(
        &self,
        scope: &RenderScope,
        page: &Page,
        content: String,
    ) -> Result<String, LayoutError> {
        let mut content = content;
        let mut chain: Vec<&str> = Vec::new();
        let mut current = page.layout.as_deref();

        while let Some(name) = current {
            if chain.contains(&name) {
                chain.push(name);
                return Err(LayoutError::Cycle {
                    page: page.id.clone(),
                    chain: chain.join(" -> "),
                });
            }

            let layout = self.get(name).ok_or_else(|| LayoutError::Missing {
                page: page.id.clone(),
                layout: name.to_string(),
            })?;

            let ctx = LayoutContext {
                scope,
                page,
                content: PreEscaped(&content),
            };
            content = (layout.render)(&ctx)?.into_string();

            chain.push(name);
            current = layout.parent;
        }

        Ok(content)
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Body;
    use crate::site::Social;
    use maud::html;

    fn site() -> Site {
        Site {
            title: "compti.me".to_string(),
            url: "https://compti.me".to_string(),
            description: "A blog".to_string(),
            author: "Someone".to_string(),
            language: "en".to_string(),
            since: None,
            social: Social::default(),
        }
    }

    fn page(layout: Option<&str>) -> Page {
        Page {
            id: "about".to_string(),
            url: "/about/".to_string(),
            title: Some("About".to_string()),
            description: None,
            body: Body::Markdown(String::new()),
            layout: layout.map(str::to_string),
            post: None,
            source: None,
        }
    }

    fn wrap_section(ctx: &LayoutContext) -> Result<Markup, LayoutError> {
        Ok(html! { section { (ctx.content) } })
    }

    fn wrap_div(ctx: &LayoutContext) -> Result<Markup, LayoutError> {
        Ok(html! { div class=(ctx.page.id) { (ctx.content) } })
    }

    fn with_scope<T>(f: impl FnOnce(&RenderScope) -> T) -> T {
        let site = site();
        let filters = Filters::with_defaults();
        let scope = RenderScope {
            site: &site,
            posts: &[],
            filters: &filters,
            copyright_year: Some(2024),
            feed_url: None,
        };
        f(&scope)
    }

    #[test]
    fn test_chain_is_folded_outward() {
        let mut registry = LayoutRegistry::new();
        registry.register(
            "outer",
            Layout {
                parent: None,
                render: wrap_div,
            },
        );
        registry.register(
            "inner",
            Layout {
                parent: Some("outer"),
                render: wrap_section,
            },
        );

        let output = with_scope(|scope| {
            registry
                .apply(scope, &page(Some("inner")), "<p>Hi</p>".to_string())
                .unwrap()
        });

        assert_eq!(output, "<div class=\"about\"><section><p>Hi</p></section></div>");
    }

    #[test]
    fn test_no_layout_returns_content() {
        let registry = LayoutRegistry::with_defaults();
        let output = with_scope(|scope| registry.apply(scope, &page(None), "raw".to_string()).unwrap());

        assert_eq!(output, "raw");
    }

    #[test]
    fn test_missing_layout() {
        let registry = LayoutRegistry::with_defaults();
        let err = with_scope(|scope| {
            registry
                .apply(scope, &page(Some("fancy")), String::new())
                .unwrap_err()
        });

        assert!(matches!(
            err,
            LayoutError::Missing { ref page, ref layout } if page == "about" && layout == "fancy"
        ));
    }

    #[test]
    fn test_cycle() {
        let mut registry = LayoutRegistry::new();
        registry.register(
            "a",
            Layout {
                parent: Some("b"),
                render: wrap_div,
            },
        );
        registry.register(
            "b",
            Layout {
                parent: Some("a"),
                render: wrap_div,
            },
        );

        let err = with_scope(|scope| {
            registry
                .apply(scope, &page(Some("a")), String::new())
                .unwrap_err()
        });

        assert!(matches!(err, LayoutError::Cycle { ref chain, .. } if chain == "a -> b -> a"));
    }

    #[test]
    fn test_base_layout_document() {
        let registry = LayoutRegistry::with_defaults();
        let output = with_scope(|scope| {
            registry
                .apply(scope, &page(Some("base")), "<p>About me</p>".to_string())
                .unwrap()
        });

        assert!(output.starts_with("<!DOCTYPE html>"));
        assert!(output.contains("<title>About</title>"));
        assert!(output.contains("<meta name=\"description\" content=\"A blog\">"));
        assert!(output.contains("<link rel=\"canonical\" href=\"https://compti.me/about/\">"));
        assert!(output.contains("<main><p>About me</p></main>"));
        assert!(output.contains("© 2024 Someone"));
    }
}
