use maud::{Markup, html};

use super::LayoutContext;
use crate::errors::LayoutError;

pub(super) fn render(ctx: &LayoutContext) -> Result<Markup, LayoutError> {
    let (title, subtitle) = match &ctx.page.post {
        Some(post) => (Some(post.title.as_str()), post.subtitle.as_deref()),
        None => (ctx.page.title.as_deref(), None),
    };

    Ok(html! {
        article {
            @if let Some(title) = title {
                h2 { (title) }
            }
            @if let Some(subtitle) = subtitle {
                h3 { (subtitle) }
            }
            (ctx.content)
        }
    })
}
