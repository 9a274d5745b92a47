//! Permalink templates such as `/posts/[slug]/` and the output paths they map to.
use std::path::{Path, PathBuf};

#[derive(Debug, PartialEq)]
pub struct ParameterDef {
    pub(crate) key: String,
    pub(crate) index: usize,
    pub(crate) length: usize,
}

pub fn extract_params_from_raw_route(raw_route: &str) -> Vec<ParameterDef> {
    let mut params = Vec::new();
    let mut start = 0;

    while let Some(bracket_pos) = raw_route[start..].find('[') {
        let abs_pos = start + bracket_pos;

        // Escaped when preceded by an odd number of backslashes
        let backslash_count = raw_route[..abs_pos]
            .chars()
            .rev()
            .take_while(|&c| c == '\\')
            .count();

        if backslash_count % 2 == 1 {
            start = abs_pos + 1;
            continue;
        }

        if let Some(end_bracket) = raw_route[abs_pos + 1..].find(']') {
            let end_pos = abs_pos + 1 + end_bracket;

            params.push(ParameterDef {
                key: raw_route[abs_pos + 1..end_pos].to_string(),
                index: abs_pos,
                length: end_pos - abs_pos + 1,
            });

            start = end_pos + 1;
        } else {
            break;
        }
    }

    params
}

/// Routes with an extension (`/feed.xml`) are written as-is instead of as a directory with an `index.html`.
pub fn is_endpoint(route: &str) -> bool {
    Path::new(route).extension().is_some()
}

/// Fills the parameters of `template` using `lookup`.
///
/// Fails with the name of a parameter `lookup` has no value for.
pub fn build_url<'a, F>(template: &str, lookup: F) -> Result<String, String>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let params_def = extract_params_from_raw_route(template);
    let mut result = template.to_string();

    // Right to left, so that earlier indices stay valid after each replacement.
    for param_def in params_def.iter().rev() {
        let value = lookup(&param_def.key).ok_or_else(|| param_def.key.clone())?;

        result.replace_range(param_def.index..param_def.index + param_def.length, value);
    }

    Ok(normalize_url(&result))
}

/// Collapses repeated slashes, ensures a leading slash and, for pages, a trailing one.
pub fn normalize_url(route: &str) -> String {
    let mut result = route
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    result.insert(0, '/');

    if !is_endpoint(route) && !result.ends_with('/') {
        result.push('/');
    }

    result
}

/// Whether a URL walks the directory tree (`/posts/../`), which would let it escape its place in the output.
pub fn has_dot_segments(url: &str) -> bool {
    url.split('/').any(|segment| segment == "." || segment == "..")
}

/// Maps a URL to the file it is written to below `output_dir`.
pub fn build_file_path(url: &str, output_dir: &Path) -> PathBuf {
    let mut path = PathBuf::from(output_dir);
    path.extend(url.split('/').filter(|s| !s.is_empty()));

    if !is_endpoint(url) {
        path.push("index.html");
    }

    path
}
