use crate::error::BlogError;
use crate::filename::{PostIdentity, is_post_file, parse_date_field, parse_post_filename, post_filename};
use crate::parsing::MarkdownRenderer;
use crate::post::{Post, load_post};
use rayon::prelude::*;
use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Year, month and day constraints; an absent component matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateFilter {
    segments: Vec<String>,
    year: Option<u32>,
    month: Option<u32>,
    day: Option<u32>,
}

impl DateFilter {
    pub fn any() -> Self {
        Self::default()
    }

    /// Builds a filter from up to three numeric route segments, in
    /// year/month/day order. Returns `None` for anything else.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Option<Self> {
        if segments.len() > 3 {
            return None;
        }

        let values = segments
            .iter()
            .map(|segment| parse_date_field(segment.as_ref()))
            .collect::<Option<Vec<u32>>>()?;

        Some(Self {
            segments: segments
                .iter()
                .map(|segment| segment.as_ref().to_string())
                .collect(),
            year: values.first().copied(),
            month: values.get(1).copied(),
            day: values.get(2).copied(),
        })
    }

    pub fn is_any(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The filter as a relative path: `""`, `"2020"`, `"2020/05"`, ...
    pub fn path(&self) -> String {
        self.segments.join("/")
    }

    pub fn matches(&self, identity: &PostIdentity) -> bool {
        matches_component(self.year, identity.year())
            && matches_component(self.month, identity.month())
            && matches_component(self.day, identity.day())
    }
}

fn matches_component(wanted: Option<u32>, actual: &str) -> bool {
    match wanted {
        None => true,
        Some(wanted) => parse_date_field(actual) == Some(wanted),
    }
}

#[derive(Debug, Clone)]
pub struct PostSource {
    pub path: PathBuf,
    pub identity: PostIdentity,
    pub modified: SystemTime,
}

/// Matching post files in listing order. Posts are built on demand and the
/// selection can be loaded any number of times.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    sources: Vec<PostSource>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn sources(&self) -> &[PostSource] {
        &self.sources
    }

    pub fn load_posts(&self, renderer: &MarkdownRenderer) -> Vec<Post> {
        self.sources
            .par_iter()
            .filter_map(|source| match load_post(&source.path, renderer) {
                Ok(post) => Some(post),
                Err(error) => {
                    tracing::warn!("Skipping post: {error}");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ContentSelector {
    posts_dir: PathBuf,
}

impl ContentSelector {
    pub fn new(posts_dir: impl AsRef<Path>) -> Self {
        Self {
            posts_dir: posts_dir.as_ref().to_path_buf(),
        }
    }

    pub fn posts_dir(&self) -> &Path {
        &self.posts_dir
    }

    /// Every post under the posts directory whose filename date matches
    /// `filter`, newest modification time first. Files that cannot be read
    /// or parsed are logged and skipped.
    pub fn select(&self, filter: &DateFilter) -> Selection {
        let mut sources = Vec::new();

        if !self.posts_dir.is_dir() {
            return Selection { sources };
        }

        for entry in WalkDir::new(&self.posts_dir).min_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    let error = BlogError::WalkDir {
                        path: self.posts_dir.clone(),
                        message: error.to_string(),
                    };
                    tracing::warn!("{error}");
                    continue;
                }
            };

            let path = entry.path();

            if !entry.file_type().is_file() || !is_post_file(path) {
                continue;
            }

            let identity = match parse_post_filename(path) {
                Ok(identity) => identity,
                Err(error) => {
                    tracing::warn!("Skipping file: {error}");
                    continue;
                }
            };

            if !filter.matches(&identity) {
                continue;
            }

            let modified = match entry
                .metadata()
                .map_err(std::io::Error::from)
                .and_then(|metadata| metadata.modified())
            {
                Ok(modified) => modified,
                Err(error) => {
                    tracing::warn!("Skipping {}: {error}", path.display());
                    continue;
                }
            };

            sources.push(PostSource {
                path: path.to_path_buf(),
                identity,
                modified,
            });
        }

        sources.sort_by(|a, b| a.path.cmp(&b.path));
        sources.sort_by_key(|source| Reverse(source.modified));

        Selection { sources }
    }

    /// Resolves an entry route to an existing post file: the top-level file
    /// first, then a file with the same name anywhere below the posts directory.
    pub fn find_entry(&self, year: &str, month: &str, day: &str, slug: &str) -> Option<PathBuf> {
        if !is_safe_slug(slug) {
            return None;
        }

        let filename = post_filename(year, month, day, slug);
        let direct = self.posts_dir.join(&filename);
        if direct.is_file() {
            return Some(direct);
        }

        WalkDir::new(&self.posts_dir)
            .min_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .find(|entry| entry.file_type().is_file() && entry.file_name() == filename.as_str())
            .map(|entry| entry.into_path())
    }
}

pub fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_post(dir: &Path, relative: &str, content: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        let modified = SystemTime::now() - Duration::from_secs(age_secs);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
        path
    }

    fn create_posts() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "2021-03-05-hello_world.md", "Hello", 300);
        write_post(dir.path(), "2021-03-07-second.md", "Second", 100);
        write_post(dir.path(), "2021-04-01-april.md", "April", 200);
        write_post(dir.path(), "archive/2020-12-25-holiday.md", "Holiday", 50);
        write_post(dir.path(), "notes.md", "Not a post", 10);
        write_post(dir.path(), "2021-02-30-bad_date.md", "Bad", 10);
        write_post(dir.path(), "2021-03-06-readme.txt", "Not markdown", 10);
        dir
    }

    fn urls(selection: &Selection) -> Vec<String> {
        selection
            .sources()
            .iter()
            .map(|source| source.identity.url())
            .collect()
    }

    #[test]
    fn test_date_filter_from_segments() {
        let filter = DateFilter::from_segments(&["2020", "05"]).unwrap();
        assert_eq!(filter.path(), "2020/05");
        assert!(!filter.is_any());
        assert!(DateFilter::from_segments(&["2020", "may"]).is_none());
        assert!(DateFilter::from_segments(&["1", "2", "3", "4"]).is_none());
        assert!(DateFilter::from_segments::<&str>(&[]).unwrap().is_any());
    }

    #[test]
    fn test_filter_matches_numerically() {
        let identity = parse_post_filename(Path::new("2021-03-05-a.md")).unwrap();
        assert!(DateFilter::from_segments(&["2021", "3"]).unwrap().matches(&identity));
        assert!(DateFilter::from_segments(&["2021", "03", "05"]).unwrap().matches(&identity));
        assert!(!DateFilter::from_segments(&["2021", "04"]).unwrap().matches(&identity));
        assert!(DateFilter::any().matches(&identity));
    }

    #[test]
    fn test_empty_filter_returns_all_posts_by_modified_time() {
        let dir = create_posts();
        let selector = ContentSelector::new(dir.path());
        let selection = selector.select(&DateFilter::any());

        assert_eq!(
            urls(&selection),
            vec![
                "/2020/12/25/holiday",
                "/2021/03/07/second",
                "/2021/04/01/april",
                "/2021/03/05/hello_world",
            ]
        );
    }

    #[test]
    fn test_month_filter() {
        let dir = create_posts();
        let selector = ContentSelector::new(dir.path());
        let filter = DateFilter::from_segments(&["2021", "03"]).unwrap();
        let selection = selector.select(&filter);

        assert_eq!(
            urls(&selection),
            vec!["/2021/03/07/second", "/2021/03/05/hello_world"]
        );
    }

    #[test]
    fn test_full_date_filter() {
        let dir = create_posts();
        let selector = ContentSelector::new(dir.path());
        let filter = DateFilter::from_segments(&["2021", "03", "05"]).unwrap();
        assert_eq!(urls(&selector.select(&filter)), vec!["/2021/03/05/hello_world"]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let dir = create_posts();
        let selector = ContentSelector::new(dir.path());
        let filter = DateFilter::from_segments(&["1999"]).unwrap();
        let selection = selector.select(&filter);
        assert!(selection.is_empty());
        assert!(selection.load_posts(&MarkdownRenderer::new()).is_empty());
    }

    #[test]
    fn test_missing_posts_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let selector = ContentSelector::new(dir.path().join("_posts"));
        assert!(selector.select(&DateFilter::any()).is_empty());
    }

    #[test]
    fn test_ties_ordered_by_path() {
        let dir = TempDir::new().unwrap();
        let when = SystemTime::now() - Duration::from_secs(60);
        for name in ["2021-01-03-c.md", "2021-01-01-a.md", "2021-01-02-b.md"] {
            let path = dir.path().join(name);
            fs::write(&path, "x").unwrap();
            File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(when)
                .unwrap();
        }

        let selection = ContentSelector::new(dir.path()).select(&DateFilter::any());
        assert_eq!(
            urls(&selection),
            vec!["/2021/01/01/a", "/2021/01/02/b", "/2021/01/03/c"]
        );
    }

    #[test]
    fn test_load_posts_is_restartable() {
        let dir = create_posts();
        let selector = ContentSelector::new(dir.path());
        let selection = selector.select(&DateFilter::from_segments(&["2021"]).unwrap());
        let renderer = MarkdownRenderer::new();

        let first: Vec<String> = selection.load_posts(&renderer).into_iter().map(|p| p.url).collect();
        let second: Vec<String> = selection.load_posts(&renderer).into_iter().map(|p| p.url).collect();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_load_posts_skips_vanished_files() {
        let dir = create_posts();
        let selector = ContentSelector::new(dir.path());
        let selection = selector.select(&DateFilter::from_segments(&["2021", "03"]).unwrap());
        fs::remove_file(dir.path().join("2021-03-07-second.md")).unwrap();

        let posts = selection.load_posts(&MarkdownRenderer::new());
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "hello world");
    }

    #[test]
    fn test_find_entry() {
        let dir = create_posts();
        let selector = ContentSelector::new(dir.path());

        assert_eq!(
            selector.find_entry("2021", "03", "05", "hello_world"),
            Some(dir.path().join("2021-03-05-hello_world.md"))
        );
        assert_eq!(
            selector.find_entry("2020", "12", "25", "holiday"),
            Some(dir.path().join("archive/2020-12-25-holiday.md"))
        );
        assert_eq!(selector.find_entry("2021", "03", "05", "nope"), None);
        assert_eq!(selector.find_entry("2021", "03", "05", ".."), None);
    }

    #[test]
    fn test_unsafe_slugs() {
        assert!(is_safe_slug("hello_world"));
        assert!(!is_safe_slug(".."));
        assert!(!is_safe_slug("a/b"));
        assert!(!is_safe_slug(""));
    }
}
