//! Images referenced by pages.
//!
//! While a page's markdown is rendered, every local image it references is registered on the page's
//! [`PageAssets`]. The returned [`ResponsiveImage`] only knows the file names its variants will have, encoding
//! happens later, once per image, when the build processes every collected image.
use std::path::{Path, PathBuf};

use log::debug;
use maud::Render;

mod picture;

pub use picture::{Image, ImageFormat, ImageVariant, ResponsiveImage, target_widths};

use crate::{build::options::ImagesOptions, content::ImageComponent, errors::AssetError};

pub struct PageAssets<'a> {
    options: &'a ImagesOptions,
    /// Root of the site, paths starting with `/` are resolved against it.
    input_dir: PathBuf,
    /// Directory of the page's source file, other paths are resolved against it.
    source_dir: PathBuf,
    images: Vec<Image>,
}

impl<'a> PageAssets<'a> {
    pub fn new(options: &'a ImagesOptions, input_dir: &Path, source_dir: &Path) -> Self {
        Self {
            options,
            input_dir: input_dir.to_path_buf(),
            source_dir: source_dir.to_path_buf(),
            images: Vec::new(),
        }
    }

    /// Add an image to the page, causing its variants to be created in the output directory.
    ///
    /// Adding the same path twice returns the same image.
    pub fn add_image<P>(&mut self, image_path: P, alt: &str) -> Result<ResponsiveImage, AssetError>
    where
        P: AsRef<str>,
    {
        let path = self.resolve(image_path.as_ref());

        let image = match self.images.iter().find(|image| image.path == path) {
            Some(image) => image.clone(),
            None => {
                let image = Image::new(path, self.options)?;
                debug!(target: "assets", "Added image {} ({})", image.path.display(), image.hash);
                self.images.push(image.clone());
                image
            }
        };

        // The last format is the fallback, as in `<picture>` browsers pick the first source they support.
        let fallback_format = self.options.formats.last().copied();

        Ok(ResponsiveImage {
            image,
            alt: alt.to_string(),
            sizes: self.options.sizes.clone(),
            url_path: self.options.url_path.clone(),
            fallback_format,
        })
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn into_images(self) -> Vec<Image> {
        self.images
    }

    fn resolve(&self, src: &str) -> PathBuf {
        // Drop any query or fragment, they have no meaning on disk.
        let src = src.split(['?', '#']).next().unwrap_or(src);

        match src.strip_prefix('/') {
            Some(absolute) => self.input_dir.join(absolute),
            None => self.source_dir.join(src),
        }
    }
}

impl ImageComponent for PageAssets<'_> {
    fn render(&mut self, url: &str, alt: &str, _title: Option<&str>) -> Result<String, AssetError> {
        Ok(self.add_image(url, alt)?.render().into_string())
    }
}
