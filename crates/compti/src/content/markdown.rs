use std::fmt::Write as _;

use maud::{Escaper, html};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use super::{components::ImageComponent, slugger::Slugger};
use crate::errors::AssetError;

/// Represents a Markdown heading.
///
/// Can be used to generate a table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownHeading {
    pub title: String,
    pub id: String,
    pub level: u8,
}

/// Heading anchor options.
///
/// By default a `<a class="header-anchor" href="#id"><span>🔗</span></a>` permalink follows the heading text,
/// separated from it by a single space.
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    /// Whether to add a permalink to headings at all. Ids are generated either way.
    pub permalink: bool,
    /// Place the permalink before the heading text instead of after it.
    pub permalink_before: bool,
    /// Separate the permalink from the heading text with a space.
    pub permalink_space: bool,
    pub permalink_class: String,
    pub permalink_symbol: String,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            permalink: true,
            permalink_before: false,
            permalink_space: true,
            permalink_class: "header-anchor".to_string(),
            permalink_symbol: "🔗".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMarkdown {
    pub html: String,
    pub headings: Vec<MarkdownHeading>,
}

/// Render Markdown content to HTML.
///
/// Raw HTML is passed through. Local images are handed to `images` when one is given.
///
/// ## Example
/// ```rust
/// use compti::content::{MarkdownOptions, render_markdown};
///
/// let rendered = render_markdown("# Intro\n\n# Intro", &MarkdownOptions::default(), None).unwrap();
/// assert_eq!(rendered.headings[0].id, "intro");
/// assert_eq!(rendered.headings[1].id, "intro-1");
/// ```
pub fn render_markdown(
    content: &str,
    options: &MarkdownOptions,
    mut images: Option<&mut dyn ImageComponent>,
) -> Result<RenderedMarkdown, AssetError> {
    let mut parser_options = Options::empty();
    parser_options.insert(
        Options::ENABLE_HEADING_ATTRIBUTES | Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH,
    );

    let events: Vec<Event> = Parser::new_ext(content, parser_options).collect();

    // Explicit ids are reserved up front so that generated ones never shadow them.
    let mut slugger = Slugger::new();
    for event in &events {
        if let Event::Start(Tag::Heading { id: Some(id), .. }) = event {
            slugger.reserve(id);
        }
    }

    let mut headings = Vec::new();
    let mut transformed = Vec::with_capacity(events.len());
    let mut current_heading: Option<String> = None;
    let mut i = 0;

    while i < events.len() {
        let event = &events[i];

        match event {
            Event::Start(Tag::Heading {
                level, id, classes, ..
            }) => {
                let title = find_matching_end(&events, i, is_heading_end)
                    .map(|end| get_text_from_events(&events[i + 1..end]))
                    .unwrap_or_default();
                let heading_id = match id {
                    Some(id) => slugger.claim(id),
                    None => slugger.slugify(&title),
                };
                let classes: Vec<&str> = classes.iter().map(|c| c.as_ref()).collect();

                let mut start = format!("<{} id=\"", level);
                let _ = Escaper::new(&mut start).write_str(&heading_id);
                start.push('"');
                if !classes.is_empty() {
                    start.push_str(" class=\"");
                    let _ = Escaper::new(&mut start).write_str(&classes.join(" "));
                    start.push('"');
                }
                start.push('>');

                if options.permalink && options.permalink_before {
                    start.push_str(&permalink(&heading_id, options));
                    if options.permalink_space {
                        start.push(' ');
                    }
                }

                transformed.push(Event::Html(start.into()));

                headings.push(MarkdownHeading {
                    title,
                    id: heading_id.clone(),
                    level: heading_level_number(*level),
                });
                current_heading = Some(heading_id);
            }
            Event::End(TagEnd::Heading(level)) => {
                let mut end = String::new();

                if let Some(heading_id) = current_heading.take()
                    && options.permalink
                    && !options.permalink_before
                {
                    if options.permalink_space {
                        end.push(' ');
                    }
                    end.push_str(&permalink(&heading_id, options));
                }

                end.push_str(&format!("</{}>\n", level));
                transformed.push(Event::Html(end.into()));
            }
            Event::Start(Tag::Image {
                dest_url, title, ..
            }) if images.is_some() && is_local_url(dest_url) => {
                let end_index = find_matching_end(&events, i, |e| matches!(e, Event::End(TagEnd::Image)));
                let alt = end_index
                    .map(|end| get_text_from_events(&events[i + 1..end]))
                    .unwrap_or_default();
                let title = if title.is_empty() {
                    None
                } else {
                    Some(title.as_ref())
                };

                if let Some(component) = images.as_deref_mut() {
                    let markup = component.render(dest_url, &alt, title)?;
                    transformed.push(Event::InlineHtml(markup.into()));
                }

                // Skip the alt text and the end tag
                if let Some(end) = end_index {
                    i = end;
                }
            }
            _ => transformed.push(event.clone()),
        }

        i += 1;
    }

    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, transformed.into_iter());

    Ok(RenderedMarkdown { html, headings })
}

fn permalink(id: &str, options: &MarkdownOptions) -> String {
    html! {
        a class=(options.permalink_class) href=(format!("#{}", id)) {
            span { (options.permalink_symbol) }
        }
    }
    .into_string()
}

fn heading_level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn is_heading_end(event: &Event) -> bool {
    matches!(event, Event::End(TagEnd::Heading(_)))
}

/// Anything without a scheme or protocol-relative prefix is a file of the site.
fn is_local_url(url: &str) -> bool {
    !(url.starts_with("//") || url.starts_with("data:") || url.contains("://"))
}

fn get_text_from_events(parser_slice: &[Event]) -> String {
    let mut title = String::new();

    for event in parser_slice.iter() {
        match event {
            Event::Text(text) | Event::Code(text) => title += text,
            _ => continue,
        }
    }

    title
}

fn find_matching_end(
    events: &[Event],
    start_index: usize,
    is_end: impl Fn(&Event) -> bool,
) -> Option<usize> {
    events
        .iter()
        .enumerate()
        .skip(start_index + 1)
        .find(|(_, event)| is_end(event))
        .map(|(i, _)| i)
}
