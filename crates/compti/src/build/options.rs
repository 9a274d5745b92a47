use std::path::PathBuf;

use crate::{assets::ImageFormat, content::MarkdownOptions};

/// compti build options. Should be passed to [`publish()`](crate::publish()).
///
/// `content_dir`, `static_dir` and `cache_dir` are relative to `input_dir`, `output_dir` is taken as-is.
///
/// ## Examples
/// ```rust
/// use compti::{BuildOptions, FeedOptions};
///
/// let options = BuildOptions {
///     input_dir: "blog".into(),
///     output_dir: "public".into(),
///     clean_output_dir: true,
///     feed: FeedOptions {
///         limit: Some(20),
///         ..Default::default()
///     },
///     ..Default::default()
/// };
///
/// assert_eq!(options.content_path(), std::path::Path::new("blog/content"));
/// ```
#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Directory holding `site.yaml`, `content/` and `assets/`.
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub content_dir: PathBuf,
    /// Copied verbatim to `<output_dir>/assets/`.
    pub static_dir: PathBuf,
    /// Fetch responses and encoded images are kept here between builds.
    pub cache_dir: PathBuf,

    /// Whether to clean the output directory before building.
    ///
    /// Off by default: unchanged files are not rewritten, which keeps deploys incremental.
    pub clean_output_dir: bool,

    /// Permalink template of post pages, `[slug]` is replaced by the post's slug.
    pub post_permalink: String,

    /// End year of the copyright notice. Defaults to the year of the newest post.
    pub copyright_year: Option<i32>,

    pub images: ImagesOptions,
    pub markdown: MarkdownOptions,
    pub feed: FeedOptions,
}

impl BuildOptions {
    pub fn content_path(&self) -> PathBuf {
        self.input_dir.join(&self.content_dir)
    }

    pub fn static_path(&self) -> PathBuf {
        self.input_dir.join(&self.static_dir)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.input_dir.join(&self.cache_dir)
    }

    pub fn site_config_path(&self) -> PathBuf {
        self.input_dir.join(SITE_CONFIG_FILE)
    }

    /// Where passthrough assets are copied to.
    pub fn static_output_path(&self) -> PathBuf {
        self.output_dir.join(&self.static_dir)
    }

    pub fn feed_output_path(&self) -> PathBuf {
        self.output_dir.join(self.feed.path.trim_start_matches('/'))
    }

    /// Where images are written, mirroring [`ImagesOptions::url_path`].
    pub fn images_output_path(&self) -> PathBuf {
        self.output_dir.join(self.images.url_path.trim_matches('/'))
    }
}

pub const SITE_CONFIG_FILE: &str = "site.yaml";

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("_site"),
            content_dir: PathBuf::from("content"),
            static_dir: PathBuf::from("assets"),
            cache_dir: PathBuf::from(".cache"),
            clean_output_dir: false,
            post_permalink: "/posts/[slug]/".to_string(),
            copyright_year: None,
            images: ImagesOptions::default(),
            markdown: MarkdownOptions::default(),
            feed: FeedOptions::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImagesOptions {
    /// Widths to generate, never upscaled.
    pub widths: Vec<u32>,
    /// Output formats, the last one is used for the `<img>` fallback.
    pub formats: Vec<ImageFormat>,
    pub sizes: String,
    /// URL prefix of generated images, also their directory inside the output directory.
    pub url_path: String,
    /// Quality of WebP encoding, from 0 to 100. With `webp_near_lossless` it is the near-lossless preprocessing
    /// level instead, lower values give smaller files.
    pub webp_quality: f32,
    /// Encode WebP losslessly after a near-lossless preprocessing pass instead of lossy.
    pub webp_near_lossless: bool,
}

impl Default for ImagesOptions {
    fn default() -> Self {
        Self {
            widths: vec![600, 900, 1500],
            formats: vec![ImageFormat::WebP, ImageFormat::Png, ImageFormat::Jpeg],
            sizes: "(min-width: 1024px), 100vw, 50vw".to_string(),
            url_path: "/img/".to_string(),
            webp_quality: 80.0,
            webp_near_lossless: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedOptions {
    pub enabled: bool,
    /// Path of the feed inside the output directory.
    pub path: String,
    /// Maximum number of items, newest first. All posts when `None`.
    pub limit: Option<usize>,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "feed.xml".to_string(),
            limit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_paths_are_resolved_against_input() {
        let options = BuildOptions {
            input_dir: PathBuf::from("site"),
            ..Default::default()
        };

        assert_eq!(options.content_path(), Path::new("site/content"));
        assert_eq!(options.static_path(), Path::new("site/assets"));
        assert_eq!(options.cache_path(), Path::new("site/.cache"));
        assert_eq!(options.site_config_path(), Path::new("site/site.yaml"));
        assert_eq!(options.images_output_path(), Path::new("_site/img"));
        assert_eq!(options.static_output_path(), Path::new("_site/assets"));
        assert_eq!(options.feed_output_path(), Path::new("_site/feed.xml"));
    }
}
