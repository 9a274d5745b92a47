use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use image::{DynamicImage, ImageReader};
use log::debug;
use webp::{Encoder, WebPConfig, WebPMemory};

use super::write_if_changed;
use crate::{
    assets::{Image, ImageFormat, ImageVariant},
    build::options::ImagesOptions,
    errors::AssetError,
};

/// Encoded variants, keyed by their content-addressed file name.
///
/// A variant found here is never encoded again, its name already depends on the source bytes and options.
pub struct ImageCache {
    dir: PathBuf,
}

impl ImageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_of(&self, variant: &ImageVariant) -> PathBuf {
        self.dir.join(&variant.file_name)
    }

    fn get(&self, variant: &ImageVariant) -> Option<Vec<u8>> {
        fs::read(self.path_of(variant)).ok()
    }

    fn store(&self, variant: &ImageVariant, bytes: &[u8]) -> Result<(), AssetError> {
        let path = self.path_of(variant);
        fs::create_dir_all(&self.dir)
            .and_then(|_| fs::write(&path, bytes))
            .map_err(|source| AssetError::WriteFailed { path, source })
    }
}

/// Outcome of writing one variant to the output directory.
pub struct ProcessedVariant {
    pub file_path: PathBuf,
    pub written: bool,
}

/// Encodes every variant of `image` missing from the cache and copies all of them to `dest_dir`.
pub fn process_image(
    image: &Image,
    cache: &ImageCache,
    dest_dir: &Path,
    options: &ImagesOptions,
) -> Result<Vec<ProcessedVariant>, AssetError> {
    // Decoded lazily, an image whose variants are all cached is never opened.
    let mut source: Option<DynamicImage> = None;
    let mut processed = Vec::with_capacity(image.variants.len());

    for variant in &image.variants {
        let bytes = match cache.get(variant) {
            Some(bytes) => bytes,
            None => {
                let decoded = match source.take() {
                    Some(decoded) => decoded,
                    None => decode(&image.path)?,
                };
                let bytes = encode(&decoded, variant, &image.path, options)?;
                source = Some(decoded);

                debug!(target: "assets", "Encoded {} ({}x{})", variant.file_name, variant.width, variant.height);
                cache.store(variant, &bytes)?;
                bytes
            }
        };

        let file_path = dest_dir.join(&variant.file_name);
        let written = write_if_changed(&file_path, &bytes).map_err(|source| {
            AssetError::WriteFailed {
                path: file_path.clone(),
                source,
            }
        })?;

        processed.push(ProcessedVariant { file_path, written });
    }

    Ok(processed)
}

fn decode(path: &Path) -> Result<DynamicImage, AssetError> {
    ImageReader::open(path)
        .map_err(|source| AssetError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|source| AssetError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?
        .decode()
        .map_err(|source| AssetError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

fn encode(
    img: &DynamicImage,
    variant: &ImageVariant,
    path: &Path,
    options: &ImagesOptions,
) -> Result<Vec<u8>, AssetError> {
    let resized;
    let img = if variant.width != img.width() || variant.height != img.height() {
        resized = img.resize_exact(
            variant.width,
            variant.height,
            image::imageops::FilterType::Lanczos3,
        );
        &resized
    } else {
        img
    };

    let encode_error = |reason: String| AssetError::Encode {
        path: path.to_path_buf(),
        format: variant.format.extension(),
        reason,
    };

    match variant.format {
        // image only encodes plain lossless WebP, which gives huge files, libwebp is used directly instead.
        ImageFormat::WebP => {
            let converted = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            let encoder: Encoder =
                Encoder::from_image(&converted).map_err(|e| encode_error(e.to_string()))?;
            let webp: WebPMemory = if options.webp_near_lossless {
                let mut config = WebPConfig::new()
                    .map_err(|_| encode_error("failed to initialize libwebp".to_string()))?;
                config.lossless = 1;
                config.quality = options.webp_quality;
                config.near_lossless = options.webp_quality.clamp(0.0, 100.0) as i32;
                encoder
                    .encode_advanced(&config)
                    .map_err(|e| encode_error(format!("{:?}", e)))?
            } else {
                encoder.encode(options.webp_quality)
            };
            Ok(webp.to_vec())
        }
        ImageFormat::Png | ImageFormat::Jpeg => {
            // JPEG has no alpha channel.
            let converted;
            let img = if variant.format == ImageFormat::Jpeg && img.color().has_alpha() {
                converted = DynamicImage::ImageRgb8(img.to_rgb8());
                &converted
            } else {
                img
            };

            let mut bytes = Cursor::new(Vec::new());
            img.write_to(&mut bytes, variant.format.into())
                .map_err(|e| encode_error(e.to_string()))?;
            Ok(bytes.into_inner())
        }
    }
}
