use std::{path::PathBuf, process::Termination, time::Instant};

/// Metadata returned by [`publish()`](crate::publish) for a single page after a successful build.
#[derive(Debug)]
pub struct PageOutput {
    pub id: String,
    pub url: String,
    pub file_path: PathBuf,
    /// Whether the file was written, `false` when the existing file already had the same content.
    pub written: bool,
}

/// Metadata returned by [`publish()`](crate::publish) for a single generated image variant.
#[derive(Debug)]
pub struct ImageOutput {
    pub file_path: PathBuf,
    pub original_path: PathBuf,
    pub written: bool,
}

/// A file copied to the output directory without any processing.
#[derive(Debug)]
pub struct StaticAssetOutput {
    pub file_path: PathBuf,
    pub original_path: PathBuf,
    pub written: bool,
}

/// Metadata returned by [`publish()`](crate::publish) after a successful build.
#[derive(Debug)]
pub struct BuildOutput {
    pub start_time: Instant,
    pub pages: Vec<PageOutput>,
    pub images: Vec<ImageOutput>,
    pub static_files: Vec<StaticAssetOutput>,
    pub feed: Option<PathBuf>,
}

impl BuildOutput {
    pub fn new(start_time: Instant) -> Self {
        Self {
            start_time,
            pages: Vec::new(),
            images: Vec::new(),
            static_files: Vec::new(),
            feed: None,
        }
    }

    pub(crate) fn add_page(&mut self, id: String, url: String, file_path: PathBuf, written: bool) {
        self.pages.push(PageOutput {
            id,
            url,
            file_path,
            written,
        });
    }

    pub(crate) fn add_image(&mut self, file_path: PathBuf, original_path: PathBuf, written: bool) {
        self.images.push(ImageOutput {
            file_path,
            original_path,
            written,
        });
    }

    pub(crate) fn add_static_file(
        &mut self,
        file_path: PathBuf,
        original_path: PathBuf,
        written: bool,
    ) {
        self.static_files.push(StaticAssetOutput {
            file_path,
            original_path,
            written,
        });
    }

    /// Number of files whose content changed in this build.
    pub fn written_count(&self) -> usize {
        self.pages.iter().filter(|p| p.written).count()
            + self.images.iter().filter(|i| i.written).count()
            + self.static_files.iter().filter(|s| s.written).count()
    }
}

impl Default for BuildOutput {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Termination for BuildOutput {
    fn report(self) -> std::process::ExitCode {
        0.into()
    }
}
