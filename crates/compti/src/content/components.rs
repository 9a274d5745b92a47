use crate::errors::AssetError;

/// Renders the markup for an image referenced from markdown.
///
/// The build implements it on [`PageAssets`](crate::assets::PageAssets) so that every local image goes through
/// the responsive image pipeline.
pub trait ImageComponent {
    fn render(&mut self, url: &str, alt: &str, title: Option<&str>) -> Result<String, AssetError>;
}
