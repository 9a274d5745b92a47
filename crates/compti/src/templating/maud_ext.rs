use maud::{Markup, Render, html};

use crate::{GENERATOR, assets::ResponsiveImage};

impl Render for ResponsiveImage {
    fn render(&self) -> Markup {
        let (Some(fallback), Some(src)) = (self.fallback(), self.fallback_src()) else {
            return html! {};
        };
        let srcset = self.fallback_srcset();

        html! {
            picture {
                @for (format, srcset) in self.sources() {
                    source type=(format.mime_type()) srcset=(srcset) sizes=(self.sizes);
                }
                img alt=(self.alt) src=(src) srcset=[srcset.as_ref()] sizes=[srcset.as_ref().map(|_| &self.sizes)] width=(fallback.width) height=(fallback.height) loading="lazy" decoding="async";
            }
        }
    }
}

/// Creates a generator tag for the output HTML. See [`GENERATOR`](crate::GENERATOR).
pub fn generator() -> Markup {
    html! {
        meta name="generator" content=(GENERATOR);
    }
}
