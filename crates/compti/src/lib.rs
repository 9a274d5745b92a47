#![doc = include_str!("../README.md")]

// Modules users interact with directly or indirectly
pub mod assets;
pub mod content;
pub mod errors;
pub mod feed;
pub mod fetch;
pub mod page;
pub mod site;
pub mod templating;

mod routing;

// Exports for end-users
pub use build::metadata::{BuildOutput, ImageOutput, PageOutput, StaticAssetOutput};
pub use build::options::{BuildOptions, FeedOptions, ImagesOptions, SITE_CONFIG_FILE};
pub use site::{Site, SiteConfig};

mod build;

// Internal modules
mod logging;

use build::execute_build;
use logging::init_logging;

/// The version of compti being used.
///
/// Written in a generator tag of every page and in the feed.
///
/// ## Example
/// ```rust
/// use compti::GENERATOR;
///
/// format!("<meta name=\"generator\" content=\"{}\">", GENERATOR);
/// ```
pub const GENERATOR: &str = concat!("compti v", env!("CARGO_PKG_VERSION"));

/// Builds the site described by `config` and writes it to `options.output_dir`.
///
/// ## Example
/// Should be called from the main function of a binary crate.
/// ```rust,no_run
/// use compti::{BuildOptions, BuildOutput, SiteConfig, publish};
///
/// fn main() -> Result<BuildOutput, Box<dyn std::error::Error>> {
///     let options = BuildOptions::default();
///     let config = SiteConfig::load(&options.site_config_path())?;
///
///     publish(&config, &options)
/// }
/// ```
pub fn publish(
    config: &SiteConfig,
    options: &BuildOptions,
) -> Result<BuildOutput, Box<dyn std::error::Error>> {
    init_logging();

    let async_runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    Ok(execute_build(config, options, &async_runtime)?)
}
