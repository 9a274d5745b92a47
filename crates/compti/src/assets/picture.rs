use std::{fs, path::PathBuf};

use image::image_dimensions;

use crate::{build::options::ImagesOptions, errors::AssetError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    WebP,
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::WebP => "webp",
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::WebP => "image/webp",
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    pub(crate) fn to_hash_value(self) -> u32 {
        match self {
            ImageFormat::Png => 1,
            ImageFormat::Jpeg => 2,
            ImageFormat::WebP => 3,
        }
    }
}

impl From<ImageFormat> for image::ImageFormat {
    fn from(val: ImageFormat) -> Self {
        match val {
            ImageFormat::WebP => image::ImageFormat::WebP,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// One encoded rendition of a source image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageVariant {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// `<hash>-<width>.<ext>`
    pub file_name: String,
}

/// A source image and every variant generated from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    pub path: PathBuf,
    pub hash: String,
    pub width: u32,
    pub height: u32,
    /// Grouped by format, in the configured format order, each group sorted by width.
    pub variants: Vec<ImageVariant>,
}

impl Image {
    pub fn new(path: PathBuf, options: &ImagesOptions) -> Result<Image, AssetError> {
        let content = fs::read(&path).map_err(|source| AssetError::ReadFailed {
            path: path.clone(),
            source,
        })?;
        let (width, height) = image_dimensions(&path).map_err(|source| AssetError::Decode {
            path: path.clone(),
            source,
        })?;

        let hash = calculate_hash(&content, options);
        let widths = target_widths(width, &options.widths);

        let variants = options
            .formats
            .iter()
            .flat_map(|format| {
                widths.iter().map(|&target| ImageVariant {
                    width: target,
                    height: scaled_height(width, height, target),
                    format: *format,
                    file_name: format!("{}-{}.{}", hash, target, format.extension()),
                })
            })
            .collect();

        Ok(Image {
            path,
            hash,
            width,
            height,
            variants,
        })
    }

    pub fn variants_of(&self, format: ImageFormat) -> impl Iterator<Item = &ImageVariant> {
        self.variants.iter().filter(move |v| v.format == format)
    }
}

/// The configured widths that do not upscale the source, plus the source width itself when some were too large.
pub fn target_widths(source_width: u32, widths: &[u32]) -> Vec<u32> {
    let mut result: Vec<u32> = widths.iter().copied().filter(|&w| w <= source_width).collect();

    if result.len() < widths.len() || widths.is_empty() {
        result.push(source_width);
    }

    result.sort_unstable();
    result.dedup();
    result
}

fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return height;
    }

    ((height as u64 * target_width as u64 + width as u64 / 2) / width as u64) as u32
}

fn calculate_hash(content: &[u8], options: &ImagesOptions) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(content);
    for width in &options.widths {
        hasher.update(&width.to_le_bytes());
    }
    for format in &options.formats {
        hasher.update(&format.to_hash_value().to_le_bytes());
    }
    hasher.update(&options.webp_quality.to_le_bytes());
    hasher.update(&[options.webp_near_lossless as u8]);
    let hash = hasher.finalize();

    hash.to_hex()[..10].to_string()
}

/// An image as placed in a page: a `<picture>` with one `<source>` per format and an `<img>` fallback.
///
/// Rendered through its [`maud::Render`] implementation.
#[derive(Clone, Debug)]
pub struct ResponsiveImage {
    pub image: Image,
    pub alt: String,
    pub sizes: String,
    pub(crate) url_path: String,
    pub(crate) fallback_format: Option<ImageFormat>,
}

impl ResponsiveImage {
    pub fn url_of(&self, variant: &ImageVariant) -> String {
        format!("{}/{}", self.url_path.trim_end_matches('/'), variant.file_name)
    }

    /// The largest variant of the fallback format, whose dimensions are given to `<img>`.
    pub fn fallback(&self) -> Option<&ImageVariant> {
        self.image.variants_of(self.fallback_format?).last()
    }

    /// Smallest variant of the fallback format, used as `<img src>`.
    pub fn fallback_src(&self) -> Option<String> {
        let format = self.fallback_format?;
        self.image.variants_of(format).next().map(|v| self.url_of(v))
    }

    pub fn fallback_srcset(&self) -> Option<String> {
        let format = self.fallback_format?;
        (self.image.variants_of(format).count() > 1).then(|| self.srcset(format))
    }

    /// `(format, srcset)` for every format but the fallback.
    pub fn sources(&self) -> Vec<(ImageFormat, String)> {
        let mut formats: Vec<ImageFormat> = Vec::new();
        for variant in &self.image.variants {
            if Some(variant.format) != self.fallback_format && !formats.contains(&variant.format) {
                formats.push(variant.format);
            }
        }

        formats
            .into_iter()
            .map(|format| (format, self.srcset(format)))
            .collect()
    }

    fn srcset(&self, format: ImageFormat) -> String {
        self.image
            .variants_of(format)
            .map(|v| format!("{} {}w", self.url_of(v), v.width))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
