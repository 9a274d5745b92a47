//! RSS 2.0 syndication feed of every post, in listing order.
use log::debug;
use rss::{ChannelBuilder, GuidBuilder, ItemBuilder, validation::Validate};

use crate::{
    GENERATOR, build::options::FeedOptions, content::Post, errors::FeedError, site::Site,
    templating::Filters,
};

/// A post as it appears in the feed.
pub struct FeedEntry<'a> {
    pub post: &'a Post,
    /// Site path of the post page, e.g. `/posts/hello/`.
    pub url: &'a str,
    /// Rendered body of the post, without layouts.
    pub content: &'a str,
}

/// Renders the feed document. `entries` are expected newest first.
///
/// The channel's build date is the newest post's date rather than the current time, so that an unchanged blog
/// produces an unchanged feed.
pub fn render_feed(
    site: &Site,
    entries: &[FeedEntry],
    filters: &Filters,
    options: &FeedOptions,
) -> Result<String, FeedError> {
    let limit = options.limit.unwrap_or(usize::MAX);

    let items = entries
        .iter()
        .take(limit)
        .map(|entry| -> Result<rss::Item, FeedError> {
            let link = filters.apply("absoluteUrl", entry.url, None, site)?;
            // Relative links of the body are relative to the post page.
            let content = filters.apply(
                "convertHtmlToAbsoluteUrls",
                entry.content,
                Some(link.as_str()),
                site,
            )?;

            Ok(ItemBuilder::default()
                .title(Some(entry.post.title.clone()))
                .link(Some(link.clone()))
                .guid(Some(GuidBuilder::default().permalink(true).value(link).build()))
                .description(Some(content))
                .pub_date(Some(entry.post.published_at.to_rfc2822()))
                .build())
        })
        .collect::<Result<Vec<_>, _>>()?;

    let last_build_date = entries
        .first()
        .map(|entry| entry.post.published_at.to_rfc2822());

    let channel = ChannelBuilder::default()
        .title(site.title.clone())
        .link(site.url.clone())
        .description(site.description.clone())
        .language(Some(site.language.clone()))
        .generator(Some(GENERATOR.to_string()))
        .last_build_date(last_build_date)
        .items(items)
        .build();

    channel.validate().map_err(|e| FeedError::Invalid {
        reason: e.to_string(),
    })?;

    debug!(target: "feed", "{} items", channel.items().len());

    Ok(channel.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Body, PostOrigin};
    use crate::site::Social;
    use chrono::DateTime;

    fn site() -> Site {
        Site {
            title: "compti.me".to_string(),
            url: "https://compti.me".to_string(),
            description: "Blog about Software Dev".to_string(),
            author: "Someone".to_string(),
            language: "en".to_string(),
            since: None,
            social: Social::default(),
        }
    }

    fn post(slug: &str, date: &str) -> Post {
        Post {
            slug: slug.to_string(),
            title: slug.to_uppercase(),
            subtitle: None,
            published_at: DateTime::parse_from_rfc3339(date).unwrap(),
            body: Body::Html(String::new()),
            seo: None,
            origin: PostOrigin::Remote,
        }
    }

    #[test]
    fn test_render_feed() {
        let world = post("world", "2024-02-01T00:00:00Z");
        let hello = post("hello", "2024-01-01T00:00:00Z");
        let entries = vec![
            FeedEntry {
                post: &world,
                url: "/posts/world/",
                content: "<p><a href=\"/about/\">About</a></p>",
            },
            FeedEntry {
                post: &hello,
                url: "/posts/hello/",
                content: "<p>Hello</p>",
            },
        ];

        let xml = render_feed(
            &site(),
            &entries,
            &Filters::with_defaults(),
            &FeedOptions::default(),
        )
        .unwrap();

        let world_at = xml.find("<title>WORLD</title>").unwrap();
        let hello_at = xml.find("<title>HELLO</title>").unwrap();
        assert!(world_at < hello_at);

        assert!(xml.contains("<link>https://compti.me/posts/world/</link>"));
        assert!(xml.contains("https://compti.me/posts/world/</guid>"));
        assert!(xml.contains("https://compti.me/about/"));
        assert!(xml.contains("Feb 2024 00:00:00 +0000</pubDate>"));
        assert!(xml.contains("<lastBuildDate>Thu, "));
        assert!(xml.contains("Feb 2024 00:00:00 +0000</lastBuildDate>"));
    }

    #[test]
    fn test_relative_links_resolve_against_the_post() {
        let post = post("a", "2024-01-01T00:00:00Z");
        let entries = vec![FeedEntry {
            post: &post,
            url: "/posts/a/",
            content: r#"<p><a href="../b/">next</a> <a href="diagram.svg">pic</a></p>"#,
        }];

        let xml = render_feed(
            &site(),
            &entries,
            &Filters::with_defaults(),
            &FeedOptions::default(),
        )
        .unwrap();

        assert!(xml.contains("https://compti.me/posts/b/"));
        assert!(xml.contains("https://compti.me/posts/a/diagram.svg"));
        assert!(!xml.contains("https://compti.me/../b/"));
        assert!(!xml.contains("https://compti.me/diagram.svg"));
    }

    #[test]
    fn test_feed_limit() {
        let world = post("world", "2024-02-01T00:00:00Z");
        let hello = post("hello", "2024-01-01T00:00:00Z");
        let entries = vec![
            FeedEntry {
                post: &world,
                url: "/posts/world/",
                content: "",
            },
            FeedEntry {
                post: &hello,
                url: "/posts/hello/",
                content: "",
            },
        ];
        let options = FeedOptions {
            limit: Some(1),
            ..Default::default()
        };

        let xml = render_feed(&site(), &entries, &Filters::with_defaults(), &options).unwrap();

        assert!(xml.contains("<title>WORLD</title>"));
        assert!(!xml.contains("<title>HELLO</title>"));
    }

    #[test]
    fn test_feed_is_deterministic() {
        let hello = post("hello", "2024-01-01T00:00:00Z");
        let entries = vec![FeedEntry {
            post: &hello,
            url: "/posts/hello/",
            content: "<p>Hi</p>",
        }];
        let filters = Filters::with_defaults();

        let first = render_feed(&site(), &entries, &filters, &FeedOptions::default()).unwrap();
        let second = render_feed(&site(), &entries, &filters, &FeedOptions::default()).unwrap();

        assert_eq!(first, second);
    }
}
