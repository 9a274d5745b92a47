//! Markdown files from the content directory.
//!
//! Files under `posts/` are posts, everything else is a standalone document (home page, about page, ...).
use std::{
    fs,
    path::{Path, PathBuf},
};

use glob::glob as glob_fs;
use log::warn;
use pulldown_cmark::{Event, MetadataBlockKind, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, de::DeserializeOwned};

use super::{LocalPost, Seo};
use crate::errors::ContentError;

pub const POSTS_DIR: &str = "posts";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostFrontMatter {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub date: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub seo: Option<Seo>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct DocumentFrontMatter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub layout: Option<String>,
    pub permalink: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Document {
    /// Path relative to the content directory, without extension, e.g. `about` or `notes/setup`.
    pub id: String,
    pub path: PathBuf,
    pub front_matter: DocumentFrontMatter,
    pub body: String,
}

#[derive(Debug, Default)]
pub struct LocalContent {
    pub posts: Vec<LocalPost>,
    pub documents: Vec<Document>,
}

/// Reads every markdown file below `content_dir`, in path order.
pub fn load_local_content(content_dir: &Path) -> Result<LocalContent, ContentError> {
    let mut content = LocalContent::default();

    if !content_dir.exists() {
        warn!(target: "content", "Content directory {} does not exist, no local content will be loaded", content_dir.display());
        return Ok(content);
    }

    let pattern = content_dir.join("**").join("*.md");
    let pattern = pattern.to_string_lossy();
    let paths = glob_fs(&pattern).map_err(|source| ContentError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = paths
        .map(|entry| {
            entry.map_err(|e| ContentError::ReadFailed {
                path: e.path().to_path_buf(),
                source: e.into(),
            })
        })
        .collect::<Result<_, _>>()?;
    paths.sort();

    for path in paths {
        let source = fs::read_to_string(&path).map_err(|source| ContentError::ReadFailed {
            path: path.clone(),
            source,
        })?;
        let (front_matter, body) = split_front_matter(&source);
        let relative = path.strip_prefix(content_dir).unwrap_or(&path);

        if relative.starts_with(POSTS_DIR) {
            content.posts.push(LocalPost {
                front_matter: parse_front_matter(&path, front_matter)?,
                body: body.to_string(),
                path,
            });
        } else {
            content.documents.push(Document {
                id: document_id(relative),
                front_matter: parse_front_matter(&path, front_matter)?,
                body: body.to_string(),
                path,
            });
        }
    }

    Ok(content)
}

fn document_id(relative: &Path) -> String {
    relative
        .with_extension("")
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn parse_front_matter<T>(path: &Path, front_matter: Option<&str>) -> Result<T, ContentError>
where
    T: DeserializeOwned + Default,
{
    match front_matter {
        Some(yaml) if !yaml.trim().is_empty() => {
            serde_yaml::from_str(yaml).map_err(|source| ContentError::InvalidFrontMatter {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => Ok(T::default()),
    }
}

/// Splits a leading `---` YAML block off a markdown document.
pub fn split_front_matter(source: &str) -> (Option<&str>, &str) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);

    let mut in_front_matter = false;
    let mut text_range: Option<(usize, usize)> = None;

    for (event, range) in Parser::new_ext(source, options).into_offset_iter() {
        match event {
            Event::Start(Tag::MetadataBlock(MetadataBlockKind::YamlStyle)) => {
                in_front_matter = true;
            }
            Event::Text(_) if in_front_matter => {
                let start = text_range.map_or(range.start, |(start, _)| start);
                text_range = Some((start, range.end));
            }
            Event::End(TagEnd::MetadataBlock(MetadataBlockKind::YamlStyle)) => {
                let front_matter = text_range.map_or("", |(start, end)| &source[start..end]);
                let body = source[range.end..].trim_start_matches(['\r', '\n']);
                return (Some(front_matter), body);
            }
            _ if in_front_matter => {}
            // The block has to open the document.
            _ => break,
        }
    }

    (None, source)
}
