use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use chrono::Datelike;
use colored::{ColoredString, Colorize};
use log::{info, trace, warn};
use rayon::prelude::*;

use crate::{
    BuildOutput,
    assets::{Image, PageAssets},
    build::{
        images::{ImageCache, process_image},
        options::BuildOptions,
    },
    content::{
        Body, ImageComponent, Normalize, RawPost, ensure_unique_slugs, load_local_content,
        render_markdown, sort_posts,
    },
    errors::{BuildError, ComptiError},
    feed::{FeedEntry, render_feed},
    fetch::{FetchCache, Fetcher, fetch_posts},
    logging::{FormatElapsedTimeOptions, format_elapsed_time, print_title},
    page::{Page, ensure_unique_outputs},
    site::SiteConfig,
    templating::{Filters, LayoutRegistry, RenderScope},
};

pub mod images;
pub mod metadata;
pub mod options;

pub fn execute_build(
    config: &SiteConfig,
    options: &BuildOptions,
    async_runtime: &tokio::runtime::Runtime,
) -> Result<BuildOutput, ComptiError> {
    async_runtime.block_on(async { build(config, options).await })
}

/// A page after markdown and layouts ran, not yet written.
struct RenderedPage {
    /// Body before layouts, used as feed item content.
    body: String,
    html: String,
    images: Vec<Image>,
    elapsed: Duration,
}

pub async fn build(config: &SiteConfig, options: &BuildOptions) -> Result<BuildOutput, ComptiError> {
    let build_start = Instant::now();
    let mut build_metadata = BuildOutput::new(build_start);

    trace!(target: "build", "Setting up required directories...");

    let old_dist_tmp_dir = if options.clean_output_dir {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let num = (duration.as_secs() + duration.subsec_nanos() as u64) % 100000;
        let new_dir_for_old_dist = env::temp_dir().join(format!("compti_old_dist_{}", num));
        let _ = fs::rename(&options.output_dir, &new_dir_for_old_dist);
        Some(new_dir_for_old_dist)
    } else {
        None
    };

    let clean_up_handle = tokio::spawn(async move {
        if let Some(old_dist) = old_dist_tmp_dir {
            let _ = fs::remove_dir_all(old_dist);
        }
    });

    info!(target: "build", "Output directory: {}", options.output_dir.display());

    let route_format_options = FormatElapsedTimeOptions {
        additional_fn: Some(&|msg: ColoredString| {
            let formatted_msg = format!("(+{})", msg);
            if msg.fgcolor.is_none() {
                formatted_msg.dimmed()
            } else {
                formatted_msg.into()
            }
        }),
        ..Default::default()
    };

    let section_format_options = FormatElapsedTimeOptions {
        sec_red_threshold: 5,
        sec_yellow_threshold: 1,
        millis_red_threshold: None,
        millis_yellow_threshold: None,
        ..Default::default()
    };

    // Content
    print_title("loading content");
    let content_start = Instant::now();

    let mut raw_posts: Vec<RawPost> = Vec::new();

    if let Some(remote) = &config.remote {
        let fetcher = Fetcher::new(FetchCache::new(options.cache_path().join("fetch")));
        let remote_posts = fetch_posts(&fetcher, remote).await?;
        raw_posts.extend(remote_posts.into_iter().map(RawPost::Remote));
    }

    let local = load_local_content(&options.content_path())?;
    raw_posts.extend(local.posts.into_iter().map(RawPost::Local));

    let mut posts = raw_posts
        .into_iter()
        .map(Normalize::normalize)
        .collect::<Result<Vec<_>, _>>()?;

    ensure_unique_slugs(&posts)?;
    sort_posts(&mut posts);

    if posts.is_empty() {
        warn!(target: "content", "No posts found, the home page and feed will be empty");
    }

    info!(target: "content", "{}", format!("{} posts and {} documents loaded in {}", posts.len(), local.documents.len(), format_elapsed_time(content_start.elapsed(), &section_format_options)).bold());

    // Pages, posts first and in listing order
    let post_count = posts.len();
    let mut pages = posts
        .into_iter()
        .map(|post| Page::from_post(post, &options.post_permalink))
        .collect::<Result<Vec<_>, _>>()?;
    pages.extend(
        local
            .documents
            .into_iter()
            .map(Page::from_document)
            .collect::<Result<Vec<_>, _>>()?,
    );

    // Outputs that are not pages, a page may not be written over or inside them
    let mut reserved = vec![(options.images_output_path(), "generated images".to_string())];
    if options.static_path().exists() {
        reserved.push((options.static_output_path(), "passthrough assets".to_string()));
    }
    if options.feed.enabled {
        reserved.push((options.feed_output_path(), "the feed".to_string()));
    }

    ensure_unique_outputs(&pages, &options.output_dir, &reserved)?;

    print_title("generating pages");
    let pages_start = Instant::now();

    let filters = Filters::with_defaults();
    let layouts = LayoutRegistry::with_defaults();
    let feed_url = options
        .feed
        .enabled
        .then(|| format!("/{}", options.feed.path.trim_start_matches('/')));
    let copyright_year = options.copyright_year.or_else(|| {
        pages[..post_count]
            .first()
            .and_then(|page| page.post.as_ref())
            .map(|post| post.published_at.year())
    });

    let scope = RenderScope {
        site: &config.site,
        posts: &pages[..post_count],
        filters: &filters,
        copyright_year,
        feed_url: feed_url.as_deref(),
    };

    let rendered = pages
        .par_iter()
        .map(|page| render_page(page, &scope, &layouts, options))
        .collect::<Result<Vec<_>, _>>()?;

    // Written sequentially, in page order
    let mut images: Vec<Image> = Vec::new();

    for (page, rendered) in pages.iter().zip(&rendered) {
        let file_path = page.output_path(&options.output_dir);
        let written = write_if_changed(&file_path, rendered.html.as_bytes()).map_err(|source| {
            BuildError::WriteFailed {
                path: file_path.clone(),
                source,
            }
        })?;

        let status = if written { "" } else { " (unchanged)" };
        info!(target: "pages", "{} -> {}{} {}", page.url, file_path.to_string_lossy().dimmed(), status.dimmed(), format_elapsed_time(rendered.elapsed, &route_format_options));

        build_metadata.add_page(page.id.clone(), page.url.clone(), file_path, written);

        for image in &rendered.images {
            if !images.iter().any(|known| known.path == image.path) {
                images.push(image.clone());
            }
        }
    }

    info!(target: "pages", "{}", format!("generated {} pages in {}", pages.len(), format_elapsed_time(pages_start.elapsed(), &section_format_options)).bold());

    if !images.is_empty() {
        print_title("processing images");
        let images_start = Instant::now();

        let cache = ImageCache::new(options.cache_path().join("images"));
        let dest_dir = options.images_output_path();

        let processed = images
            .par_iter()
            .map(|image| -> Result<_, ComptiError> {
                let start_process = Instant::now();
                let variants = process_image(image, &cache, &dest_dir, &options.images)?;
                Ok((image, variants, start_process.elapsed()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (image, variants, elapsed) in processed {
            let written = variants.iter().filter(|v| v.written).count();
            info!(target: "assets", "{} -> {} variants, {} written {}", image.path.to_string_lossy(), variants.len(), written, format_elapsed_time(elapsed, &route_format_options));

            for variant in variants {
                build_metadata.add_image(variant.file_path, image.path.clone(), variant.written);
            }
        }

        info!(target: "assets", "{}", format!("Images processed in {}", format_elapsed_time(images_start.elapsed(), &section_format_options)).bold());
    }

    let static_path = options.static_path();
    if static_path.exists() {
        let assets_start = Instant::now();
        print_title("copying assets");

        copy_recursively(&static_path, &options.static_output_path(), &mut build_metadata)?;

        info!(target: "build", "{}", format!("Assets copied in {}", format_elapsed_time(assets_start.elapsed(), &FormatElapsedTimeOptions::default())).bold());
    }

    if options.feed.enabled {
        print_title("generating feed");
        let feed_start = Instant::now();

        let entries: Vec<FeedEntry> = pages[..post_count]
            .iter()
            .zip(&rendered[..post_count])
            .filter_map(|(page, rendered)| {
                page.post.as_ref().map(|post| FeedEntry {
                    post,
                    url: &page.url,
                    content: &rendered.body,
                })
            })
            .collect();

        let xml = render_feed(&config.site, &entries, &filters, &options.feed)?;
        let feed_path = options.feed_output_path();
        write_if_changed(&feed_path, xml.as_bytes()).map_err(|source| {
            BuildError::WriteFailed {
                path: feed_path.clone(),
                source,
            }
        })?;

        info!(target: "feed", "{} -> {} items {}", feed_path.to_string_lossy().dimmed(), entries.len().min(options.feed.limit.unwrap_or(usize::MAX)), format_elapsed_time(feed_start.elapsed(), &route_format_options));
        build_metadata.feed = Some(feed_path);
    }

    info!(target: "SKIP_FORMAT", "{}", "");
    info!(target: "build", "{}", format!("Build completed in {}, {} files changed", format_elapsed_time(build_start.elapsed(), &section_format_options), build_metadata.written_count()).bold());

    if let Err(e) = clean_up_handle.await {
        warn!(target: "build", "Failed to remove the previous output directory: {}", e);
    }

    Ok(build_metadata)
}

fn render_page(
    page: &Page,
    scope: &RenderScope,
    layouts: &LayoutRegistry,
    options: &BuildOptions,
) -> Result<RenderedPage, ComptiError> {
    let start = Instant::now();

    // Relative image paths are resolved from the directory of the page's source file.
    let source_dir = page
        .source
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or(options.input_dir.as_path());
    let mut assets = PageAssets::new(&options.images, &options.input_dir, source_dir);

    let body = match &page.body {
        Body::Markdown(markdown) => {
            render_markdown(
                markdown,
                &options.markdown,
                Some(&mut assets as &mut dyn ImageComponent),
            )?
            .html
        }
        Body::Html(html) => html.clone(),
    };

    let html = layouts.apply(scope, page, body.clone())?;

    Ok(RenderedPage {
        body,
        html,
        images: assets.into_images(),
        elapsed: start.elapsed(),
    })
}

/// Writes `content` to `path` unless the file already holds exactly these bytes, so that unchanged outputs keep
/// their modification time. Returns whether the file was written.
pub(crate) fn write_if_changed(path: &Path, content: &[u8]) -> io::Result<bool> {
    if let Ok(existing) = fs::read(path)
        && existing == content
    {
        return Ok(false);
    }

    if let Some(parent_dir) = path.parent() {
        fs::create_dir_all(parent_dir)?;
    }

    fs::write(path, content)?;

    Ok(true)
}

fn copy_recursively(
    source: &Path,
    destination: &Path,
    build_metadata: &mut BuildOutput,
) -> io::Result<()> {
    fs::create_dir_all(destination)?;

    let mut entries = fs::read_dir(source)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let target: PathBuf = destination.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            copy_recursively(&entry.path(), &target, build_metadata)?;
        } else {
            let written = write_if_changed(&target, &fs::read(entry.path())?)?;
            build_metadata.add_static_file(target, entry.path(), written);
        }
    }

    Ok(())
}
