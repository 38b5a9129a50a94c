use crate::error::{BlogError, IoContext, Result};
use crate::filename::{PostIdentity, parse_post_filename};
use crate::frontmatter::{Frontmatter, extract_front_matter_lenient};
use crate::parsing::{EXCERPT_LENGTH, MarkdownRenderer, extract_excerpt};
use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub date: NaiveDateTime,
    pub url: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub frontmatter: Frontmatter,
    pub modified: DateTime<Utc>,
    #[serde(skip)]
    pub path: PathBuf,
}

impl Post {
    /// Builds a post from its source text. The URL comes from the filename
    /// only; front matter may change `title` and `date` but never `url`.
    pub fn from_source(
        path: &Path,
        source: &str,
        modified: SystemTime,
        renderer: &MarkdownRenderer,
    ) -> Result<Post> {
        let identity = parse_post_filename(path)?;
        Ok(Self::with_identity(identity, path, source, modified, renderer))
    }

    fn with_identity(
        identity: PostIdentity,
        path: &Path,
        source: &str,
        modified: SystemTime,
        renderer: &MarkdownRenderer,
    ) -> Post {
        let extracted = extract_front_matter_lenient(source, path);
        let frontmatter = extracted.frontmatter;

        let title = frontmatter
            .title()
            .unwrap_or_else(|| identity.default_title.clone());
        let date = frontmatter
            .date()
            .unwrap_or_else(|| identity.date.and_time(NaiveTime::MIN));

        Post {
            url: identity.url(),
            slug: identity.slug,
            title,
            date,
            content: renderer.render(extracted.body),
            excerpt: extract_excerpt(extracted.body, EXCERPT_LENGTH),
            frontmatter,
            modified: DateTime::<Utc>::from(modified),
            path: path.to_path_buf(),
        }
    }
}

pub fn load_post(path: &Path, renderer: &MarkdownRenderer) -> Result<Post> {
    read_post(path, renderer).map_err(|error| match error {
        BlogError::PostNotFound { .. } => error,
        other => BlogError::PostLoad {
            path: path.to_path_buf(),
            source: Box::new(other),
        },
    })
}

fn read_post(path: &Path, renderer: &MarkdownRenderer) -> Result<Post> {
    let identity = parse_post_filename(path)?;

    let source = match fs::read_to_string(path) {
        Err(error) if error.kind() == ErrorKind::NotFound => {
            return Err(BlogError::PostNotFound {
                path: path.to_path_buf(),
            });
        }
        other => other.io_context("reading post", path)?,
    };

    let modified = fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .io_context("reading modification time of", path)?;

    Ok(Post::with_identity(
        identity, path, &source, modified, renderer,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn midnight(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    #[test]
    fn test_post_without_front_matter() {
        let renderer = MarkdownRenderer::new();
        let post = Post::from_source(
            Path::new("_posts/2021-03-05-hello_world.md"),
            "Hello *there*.",
            SystemTime::UNIX_EPOCH,
            &renderer,
        )
        .unwrap();

        assert_eq!(post.url, "/2021/03/05/hello_world");
        assert_eq!(post.title, "hello world");
        assert_eq!(post.slug, "hello_world");
        assert_eq!(post.date, midnight(2021, 3, 5));
        assert!(post.content.contains("<em>there</em>"));
        assert_eq!(post.excerpt, Some("Hello there.".to_string()));
    }

    #[test]
    fn test_front_matter_overrides_presentation_only() {
        let renderer = MarkdownRenderer::new();
        let post = Post::from_source(
            Path::new("2021-03-05-hello_world.md"),
            "---\ntitle: Custom Title\ndate: 2019-12-31\nurl: /elsewhere\n---\nBody",
            SystemTime::UNIX_EPOCH,
            &renderer,
        )
        .unwrap();

        assert_eq!(post.title, "Custom Title");
        assert_eq!(post.date, midnight(2019, 12, 31));
        assert_eq!(post.url, "/2021/03/05/hello_world");
        assert_eq!(post.slug, "hello_world");
        assert!(!post.content.contains("Custom Title"));
        assert_eq!(
            post.frontmatter.get_string("url"),
            Some("/elsewhere".to_string())
        );
    }

    #[test]
    fn test_bad_front_matter_date_falls_back() {
        let renderer = MarkdownRenderer::new();
        let post = Post::from_source(
            Path::new("2021-03-05-a.md"),
            "---\ndate: not a date\n---\nBody",
            SystemTime::UNIX_EPOCH,
            &renderer,
        )
        .unwrap();
        assert_eq!(post.date, midnight(2021, 3, 5));
    }

    #[test]
    fn test_malformed_filename_is_an_error() {
        let renderer = MarkdownRenderer::new();
        let result = Post::from_source(
            Path::new("about.md"),
            "Body",
            SystemTime::UNIX_EPOCH,
            &renderer,
        );
        assert!(matches!(result, Err(BlogError::MalformedFilename { .. })));
    }

    #[test]
    fn test_load_post_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2024-01-15-hello.md");
        fs::write(&path, "---\ntitle: Hello World\n---\n\nFirst paragraph.").unwrap();

        let renderer = MarkdownRenderer::new();
        let post = load_post(&path, &renderer).unwrap();
        assert_eq!(post.title, "Hello World");
        assert_eq!(post.url, "/2024/01/15/hello");
        assert_eq!(post.path, path);
    }

    #[test]
    fn test_load_missing_post_is_not_found() {
        let dir = TempDir::new().unwrap();
        let renderer = MarkdownRenderer::new();
        let error = load_post(&dir.path().join("2024-01-15-missing.md"), &renderer).unwrap_err();
        assert!(matches!(error, BlogError::PostNotFound { .. }));
        assert!(error.is_not_found());
    }

    #[test]
    fn test_load_post_wraps_other_failures() {
        let dir = TempDir::new().unwrap();
        let renderer = MarkdownRenderer::new();
        let error = load_post(&dir.path().join("notes.md"), &renderer).unwrap_err();
        match error {
            BlogError::PostLoad { path, source } => {
                assert!(path.ends_with("notes.md"));
                assert!(matches!(*source, BlogError::MalformedFilename { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_serialized_fields() {
        let renderer = MarkdownRenderer::new();
        let post = Post::from_source(
            Path::new("2021-03-05-hello_world.md"),
            "Body",
            SystemTime::UNIX_EPOCH,
            &renderer,
        )
        .unwrap();
        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(value["url"], "/2021/03/05/hello_world");
        assert_eq!(value["date"], "2021-03-05T00:00:00");
        assert!(value.get("path").is_none());
    }
}
