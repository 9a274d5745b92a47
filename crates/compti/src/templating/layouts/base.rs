use maud::{DOCTYPE, Markup, html};

use super::LayoutContext;
use crate::{errors::LayoutError, site::Site, templating::maud_ext::generator};

/// The document shell every other layout ends up in.
pub(super) fn render(ctx: &LayoutContext) -> Result<Markup, LayoutError> {
    let site = ctx.site();
    let page = ctx.page;

    let title = page.title.as_deref().unwrap_or(&site.title);
    let description = page.description.as_deref().unwrap_or(&site.description);
    let canonical = site.absolute_url(&page.url);

    Ok(html! {
        (DOCTYPE)
        html lang=(site.language) {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                meta property="og:title" content=(title);
                meta name="description" content=(description);
                meta property="og:description" content=(description);
                link rel="canonical" href=(canonical);
                link rel="apple-touch-icon" sizes="180x180" href="/assets/apple-touch-icon.png";
                link rel="icon" type="image/png" sizes="32x32" href="/assets/favicon-32x32.png";
                link rel="icon" type="image/png" sizes="16x16" href="/assets/favicon-16x16.png";
                link rel="manifest" href="/assets/site.webmanifest";
                link rel="mask-icon" href="/assets/safari-pinned-tab.svg" color="#5bbad5";
                meta name="msapplication-TileColor" content="#da532c";
                meta name="theme-color" content="#ffffff";
                @if let Some(feed_url) = ctx.scope.feed_url {
                    link rel="alternate" type="application/rss+xml" title=(site.title) href=(feed_url);
                }
                link rel="stylesheet" href="/assets/main.css";
                link rel="stylesheet" href="https://unpkg.com/@highlightjs/cdn-assets@11.9.0/styles/monokai.min.css";
                script src="https://unpkg.com/@highlightjs/cdn-assets@11.9.0/highlight.min.js" {}
                script { "hljs.highlightAll();" }
                (generator())
            }
            body {
                header {
                    h1 { a href="/" { (site.title) } }
                    div {
                        @if let Some(email) = &site.social.email {
                            a href={ "mailto:" (email) } { "Email" }
                        }
                        @if let Some(github) = &site.social.github {
                            a href={ "https://github.com/" (github) } { "GitHub" }
                        }
                    }
                }
                main { (ctx.content) }
                footer { (copyright(site, ctx.scope.copyright_year)) }
            }
        }
    })
}

fn copyright(site: &Site, year: Option<i32>) -> String {
    match (site.since, year) {
        (Some(since), Some(year)) if since < year => {
            format!("© {}-{} {}", since, year, site.author)
        }
        (_, Some(year)) | (Some(year), None) => format!("© {} {}", year, site.author),
        (None, None) => format!("© {}", site.author),
    }
}
