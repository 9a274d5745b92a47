use std::{fs, path::Path};

use compti::{BuildOptions, SiteConfig, publish};
use image::{ImageBuffer, Rgb};
use tempfile::TempDir;

const SITE: &str = "title: compti.me
url: https://compti.me
description: Blog about Software Dev, Networking, Unix and more
author: Matthew Murray
since: 2021
social:
  email: someone@example.com
  github: someone
";

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(root, "site.yaml", SITE);
    write(
        root,
        "content/index.md",
        "---\nlayout: home\n---\nWelcome to my blog!\n",
    );
    write(
        root,
        "content/about.md",
        "---\ntitle: About\ndescription: Who writes this\nlayout: base\n---\n# About me\n",
    );
    write(
        root,
        "content/posts/hello.md",
        "---\ntitle: Hello\nsubtitle: The first one\ndate: 2024-01-01\n---\n## Intro\n\nHi there.\n\n## Intro\n\nAgain.\n",
    );
    write(
        root,
        "content/posts/world.md",
        "---\ntitle: World\ndate: 2024-02-01\nseo:\n  title: World, for search engines\n---\nA picture:\n\n![A red square](red.png)\n",
    );
    write(root, "assets/main.css", "body { margin: 0; }\n");

    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(40, 20, Rgb([255, 0, 0]));
    img.save(root.join("content/posts/red.png")).unwrap();

    dir
}

fn options(root: &Path) -> BuildOptions {
    BuildOptions {
        input_dir: root.to_path_buf(),
        output_dir: root.join("_site"),
        ..Default::default()
    }
}

fn config(root: &Path) -> SiteConfig {
    SiteConfig::load(&root.join("site.yaml")).unwrap()
}

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join("_site").join(path)).unwrap()
}

#[test]
fn builds_the_whole_site() {
    let dir = fixture();
    let root = dir.path();

    let output = publish(&config(root), &options(root)).unwrap();

    assert_eq!(output.pages.len(), 4);
    assert!(output.feed.is_some());

    // Home page lists posts newest first
    let index = read(root, "index.html");
    assert!(index.contains("Welcome to my blog!"));
    let world = index.find("/posts/world/").unwrap();
    let hello = index.find("/posts/hello/").unwrap();
    assert!(world < hello);
    assert!(index.contains("01 February 2024"));
    assert!(index.contains("<title>compti.me</title>"));
    assert!(index.contains("© 2021-2024 Matthew Murray"));

    // Post pages
    let hello = read(root, "posts/hello/index.html");
    assert!(hello.contains("<h2>Hello</h2>"));
    assert!(hello.contains("<h3>The first one</h3>"));
    assert!(hello.contains("id=\"intro\""));
    assert!(hello.contains("id=\"intro-1\""));
    assert!(hello.contains("<a class=\"header-anchor\" href=\"#intro-1\"><span>🔗</span></a>"));
    assert!(hello.contains("<link rel=\"canonical\" href=\"https://compti.me/posts/hello/\">"));

    let world = read(root, "posts/world/index.html");
    assert!(world.contains("<title>World, for search engines</title>"));
    assert!(world.contains("<picture>"));
    assert!(world.contains("alt=\"A red square\""));

    // Standalone document
    let about = read(root, "about/index.html");
    assert!(about.contains("<title>About</title>"));
    assert!(about.contains("content=\"Who writes this\""));

    // Images, one width per format as the source is smaller than every configured width
    assert_eq!(output.images.len(), 3);
    assert!(output.images.iter().all(|image| image.file_path.exists()));
    assert!(root.join("_site/img").is_dir());

    // Passthrough assets
    assert_eq!(read(root, "assets/main.css"), "body { margin: 0; }\n");

    // Feed, same order as the home page
    let feed = read(root, "feed.xml");
    let world = feed.find("<title>World</title>").unwrap();
    let hello = feed.find("<title>Hello</title>").unwrap();
    assert!(world < hello);
    assert!(feed.contains("https://compti.me/posts/world/"));
}

#[test]
fn rebuilding_is_idempotent() {
    let dir = fixture();
    let root = dir.path();
    let config = config(root);
    let options = options(root);

    let first = publish(&config, &options).unwrap();
    let snapshot: Vec<(std::path::PathBuf, Vec<u8>, std::time::SystemTime)> = first
        .pages
        .iter()
        .map(|page| &page.file_path)
        .chain(first.images.iter().map(|image| &image.file_path))
        .chain(first.static_files.iter().map(|file| &file.file_path))
        .chain(first.feed.iter())
        .map(|path| {
            (
                path.clone(),
                fs::read(path).unwrap(),
                fs::metadata(path).unwrap().modified().unwrap(),
            )
        })
        .collect();

    let second = publish(&config, &options).unwrap();

    assert_eq!(second.written_count(), 0);
    for (path, bytes, modified) in snapshot {
        assert_eq!(fs::read(&path).unwrap(), bytes, "{} changed", path.display());
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified);
    }
}

#[test]
fn url_collisions_fail_the_build() {
    let dir = fixture();
    let root = dir.path();
    write(
        root,
        "content/hello.md",
        "---\ntitle: Not a post\npermalink: /posts/hello/\n---\nOops\n",
    );

    let err = publish(&config(root), &options(root)).unwrap_err();
    let message = err.to_string();

    assert!(message.contains("/posts/hello/"));
    assert!(message.contains("hello.md"));
}

#[test]
fn duplicate_slugs_fail_the_build() {
    let dir = fixture();
    let root = dir.path();
    write(
        root,
        "content/posts/hello-again.md",
        "---\ntitle: Hello again\nslug: hello\ndate: 2024-03-01\n---\nHi\n",
    );

    let err = publish(&config(root), &options(root)).unwrap_err();

    assert!(err.to_string().contains("`hello`"));
}

#[test]
fn unknown_layouts_fail_the_build() {
    let dir = fixture();
    let root = dir.path();
    write(root, "content/about.md", "---\nlayout: fancy\n---\nAbout\n");

    let err = publish(&config(root), &options(root)).unwrap_err();

    assert!(err.to_string().contains("fancy"));
}

#[test]
fn clean_build_removes_stale_files() {
    let dir = fixture();
    let root = dir.path();
    write(root, "_site/stale.html", "old");

    let options = BuildOptions {
        clean_output_dir: true,
        ..options(root)
    };
    publish(&config(root), &options).unwrap();

    assert!(!root.join("_site/stale.html").exists());
    assert!(root.join("_site/index.html").exists());
}

#[test]
fn pages_sharing_an_output_file_fail_the_build() {
    let dir = fixture();
    let root = dir.path();
    write(
        root,
        "content/about-me.md",
        "---\npermalink: /about/index.html\n---\nAlso about me\n",
    );

    let err = publish(&config(root), &options(root)).unwrap_err();
    let message = err.to_string();

    assert!(message.contains("about.md"));
    assert!(message.contains("about-me.md"));
    assert!(!root.join("_site/about/index.html").exists());
}

#[test]
fn dot_segment_slugs_fail_the_build() {
    let dir = fixture();
    let root = dir.path();
    write(
        root,
        "content/posts/escape.md",
        "---\ntitle: Escape\nslug: ..\ndate: 2024-03-01\n---\nOverwrite the home page\n",
    );

    let err = publish(&config(root), &options(root)).unwrap_err();

    assert!(err.to_string().contains("/posts/../"));
    assert!(!root.join("_site/index.html").exists());
}

#[test]
fn pages_over_the_feed_fail_the_build() {
    let dir = fixture();
    let root = dir.path();
    write(
        root,
        "content/rss.md",
        "---\npermalink: /feed.xml\n---\nNot a feed\n",
    );

    let err = publish(&config(root), &options(root)).unwrap_err();

    assert!(err.to_string().contains("the feed"));
}
