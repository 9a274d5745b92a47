use maud::{Markup, html};

use super::LayoutContext;
use crate::errors::LayoutError;

/// The page content followed by the list of every post, newest first.
pub(super) fn render(ctx: &LayoutContext) -> Result<Markup, LayoutError> {
    let entries = ctx
        .scope
        .posts
        .iter()
        .filter_map(|page| page.post.as_ref().map(|post| (page, post)))
        .map(|(page, post)| {
            let date = ctx.filter("postDate", &post.published_at.to_rfc3339())?;
            Ok((date, page.url.as_str(), post.title.as_str()))
        })
        .collect::<Result<Vec<_>, LayoutError>>()?;

    Ok(html! {
        (ctx.content)
        section class="posts" {
            h2 { "Posts" }
            ul {
                @for (date, url, title) in &entries {
                    li {
                        (date) " "
                        a href=(url) { (title) }
                    }
                }
            }
        }
    })
}
