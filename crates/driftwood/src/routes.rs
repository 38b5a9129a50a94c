use crate::selector::{DateFilter, is_safe_slug};
use crate::templates::INDEX_PAGE;
use std::path::Path;

/// Site files with these extensions are rendered as templates; everything
/// else under `_site` is served as-is.
pub const RENDERED_EXTENSIONS: &[&str] = &["html", "htm", "xml", "rss", "atom", "json", "txt"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Page(String),
    Listing(DateFilter),
    Entry {
        year: String,
        month: String,
        day: String,
        slug: String,
    },
    Feed(DateFilter),
    Static,
}

impl Route {
    pub fn classify(path: &str, feed_path: &str) -> Route {
        if path.is_empty() || path == "/" {
            return Route::Page(INDEX_PAGE.to_string());
        }

        let Some(segments) = split_segments(path) else {
            return Route::Static;
        };

        // A post slug wins over a day-prefixed feed path.
        if segments.len() == 4
            && DateFilter::from_segments(&segments[..3]).is_some()
            && is_safe_slug(&segments[3])
        {
            return Route::Entry {
                year: segments[0].clone(),
                month: segments[1].clone(),
                day: segments[2].clone(),
                slug: segments[3].clone(),
            };
        }

        if let Some(filter) = feed_filter(&segments, feed_path) {
            return Route::Feed(filter);
        }

        if let Some(filter) = DateFilter::from_segments(&segments) {
            return Route::Listing(filter);
        }

        if segments.len() == 1 && !path.ends_with('/') && is_rendered_page(&segments[0]) {
            return Route::Page(segments[0].clone());
        }

        Route::Static
    }
}

/// Percent-decoded path segments with a single trailing slash ignored.
/// Returns `None` for empty inner segments or undecodable input.
fn split_segments(path: &str) -> Option<Vec<String>> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

    trimmed
        .split('/')
        .map(|segment| {
            if segment.is_empty() {
                return None;
            }
            urlencoding::decode(segment)
                .ok()
                .map(|decoded| decoded.into_owned())
        })
        .collect()
}

fn feed_filter(segments: &[String], feed_path: &str) -> Option<DateFilter> {
    let feed_segments: Vec<&str> = feed_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();

    if feed_segments.is_empty() || segments.len() < feed_segments.len() {
        return None;
    }

    let split = segments.len() - feed_segments.len();
    let (prefix, tail) = segments.split_at(split);

    if tail.iter().map(String::as_str).ne(feed_segments.iter().copied()) {
        return None;
    }

    DateFilter::from_segments(prefix)
}

fn is_rendered_page(name: &str) -> bool {
    if !is_safe_slug(name) || name.starts_with('.') {
        return false;
    }

    Path::new(name)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| {
            RENDERED_EXTENSIONS
                .iter()
                .any(|rendered| rendered.eq_ignore_ascii_case(extension))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(path: &str) -> Route {
        Route::classify(path, "/feed")
    }

    fn filter(segments: &[&str]) -> DateFilter {
        DateFilter::from_segments(segments).unwrap()
    }

    #[test]
    fn test_root_is_index_page() {
        assert_eq!(classify("/"), Route::Page("index.html".to_string()));
        assert_eq!(classify(""), Route::Page("index.html".to_string()));
    }

    #[test]
    fn test_single_file_pages() {
        assert_eq!(classify("/about.html"), Route::Page("about.html".to_string()));
        assert_eq!(classify("/feed.rss"), Route::Page("feed.rss".to_string()));
        assert_eq!(classify("/style.css"), Route::Static);
        assert_eq!(classify("/images/logo.png"), Route::Static);
        assert_eq!(classify("/about.html/"), Route::Static);
        assert_eq!(classify("/.hidden.html"), Route::Static);
    }

    #[test]
    fn test_listings() {
        assert_eq!(classify("/2021/"), Route::Listing(filter(&["2021"])));
        assert_eq!(classify("/2021/03/"), Route::Listing(filter(&["2021", "03"])));
        assert_eq!(
            classify("/2021/03/05/"),
            Route::Listing(filter(&["2021", "03", "05"]))
        );
        assert_eq!(classify("/2021/03"), Route::Listing(filter(&["2021", "03"])));
    }

    #[test]
    fn test_entries() {
        assert_eq!(
            classify("/2021/03/05/hello_world"),
            Route::Entry {
                year: "2021".to_string(),
                month: "03".to_string(),
                day: "05".to_string(),
                slug: "hello_world".to_string(),
            }
        );
        assert_eq!(
            classify("/2021/03/05/hello%20world"),
            Route::Entry {
                year: "2021".to_string(),
                month: "03".to_string(),
                day: "05".to_string(),
                slug: "hello world".to_string(),
            }
        );
    }

    #[test]
    fn test_entry_rejects_traversal() {
        assert_eq!(classify("/2021/03/05/..%2F..%2Fsecret"), Route::Static);
        assert_eq!(classify("/2021/03/05/.."), Route::Static);
    }

    #[test]
    fn test_feeds() {
        assert_eq!(classify("/feed"), Route::Feed(DateFilter::any()));
        assert_eq!(classify("/feed/"), Route::Feed(DateFilter::any()));
        assert_eq!(classify("/2021/03/feed"), Route::Feed(filter(&["2021", "03"])));
        assert_eq!(classify("/blog/feed"), Route::Static);
    }

    #[test]
    fn test_entry_named_like_feed() {
        assert_eq!(
            classify("/2021/03/05/feed"),
            Route::Entry {
                year: "2021".to_string(),
                month: "03".to_string(),
                day: "05".to_string(),
                slug: "feed".to_string(),
            }
        );
        assert_eq!(
            Route::classify("/2021/03/05/rss/all", "/rss/all"),
            Route::Feed(filter(&["2021", "03", "05"]))
        );
    }

    #[test]
    fn test_custom_feed_path() {
        assert_eq!(
            Route::classify("/rss/all", "/rss/all"),
            Route::Feed(DateFilter::any())
        );
        assert_eq!(
            Route::classify("/2020/rss/all", "/rss/all"),
            Route::Feed(filter(&["2020"]))
        );
        assert_eq!(Route::classify("/feed", "/rss/all"), Route::Static);
    }

    #[test]
    fn test_everything_else_is_static() {
        assert_eq!(classify("/2021/march/"), Route::Static);
        assert_eq!(classify("/2021/03/05/slug/extra"), Route::Static);
        assert_eq!(classify("//2021"), Route::Static);
        assert_eq!(classify("/css/site.css"), Route::Static);
    }
}
