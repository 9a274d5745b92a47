//! Layouts and filters used to turn a rendered page body into a full HTML document.
mod filters;
mod layouts;
pub(crate) mod maud_ext;

pub use filters::{Filter, Filters};
pub use layouts::{Layout, LayoutContext, LayoutFn, LayoutRegistry, RenderScope};
