use crate::error::{BlogError, Result};
use chrono::NaiveDate;
use std::path::Path;

pub const POST_EXTENSION: &str = "md";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostIdentity {
    pub date: NaiveDate,
    pub slug: String,
    pub default_title: String,
    year: String,
    month: String,
    day: String,
}

impl PostIdentity {
    pub fn year(&self) -> &str {
        &self.year
    }

    pub fn month(&self) -> &str {
        &self.month
    }

    pub fn day(&self) -> &str {
        &self.day
    }

    pub fn url(&self) -> String {
        format!("/{}/{}/{}/{}", self.year, self.month, self.day, self.slug)
    }
}

pub fn is_post_file(path: &Path) -> bool {
    path.extension()
        .map(|extension| extension == POST_EXTENSION)
        .unwrap_or(false)
}

pub fn parse_post_filename(path: &Path) -> Result<PostIdentity> {
    let malformed = || BlogError::MalformedFilename {
        path: path.to_path_buf(),
    };

    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(malformed)?;

    let fields: Vec<&str> = stem.splitn(4, '-').collect();
    if fields.len() < 4 || fields[3].is_empty() {
        return Err(malformed());
    }

    let year = parse_date_field(fields[0]).ok_or_else(malformed)?;
    let month = parse_date_field(fields[1]).ok_or_else(malformed)?;
    let day = parse_date_field(fields[2]).ok_or_else(malformed)?;
    let date = NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(malformed)?;

    let slug = fields[3].to_string();

    Ok(PostIdentity {
        date,
        default_title: slug.replace('_', " "),
        slug,
        year: fields[0].to_string(),
        month: fields[1].to_string(),
        day: fields[2].to_string(),
    })
}

pub fn post_filename(year: &str, month: &str, day: &str, slug: &str) -> String {
    format!("{year}-{month}-{day}-{slug}.{POST_EXTENSION}")
}

pub fn parse_date_field(field: &str) -> Option<u32> {
    if field.is_empty() || !field.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_post_filename() {
        let identity = parse_post_filename(Path::new("2021-03-05-hello_world.md")).unwrap();
        assert_eq!(identity.date, NaiveDate::from_ymd_opt(2021, 3, 5).unwrap());
        assert_eq!(identity.slug, "hello_world");
        assert_eq!(identity.default_title, "hello world");
        assert_eq!(identity.url(), "/2021/03/05/hello_world");
    }

    #[test]
    fn test_slug_keeps_dashes() {
        let identity = parse_post_filename(Path::new("_posts/2024-01-15-hello-big-world.md")).unwrap();
        assert_eq!(identity.slug, "hello-big-world");
        assert_eq!(identity.default_title, "hello-big-world");
        assert_eq!(identity.url(), "/2024/01/15/hello-big-world");
    }

    #[test]
    fn test_url_reuses_filename_fields() {
        let identity = parse_post_filename(Path::new("2021-3-5-short.md")).unwrap();
        assert_eq!(identity.date, NaiveDate::from_ymd_opt(2021, 3, 5).unwrap());
        assert_eq!(identity.url(), "/2021/3/5/short");
    }

    #[test]
    fn test_too_few_fields() {
        let error = parse_post_filename(Path::new("about.md")).unwrap_err();
        assert!(matches!(error, BlogError::MalformedFilename { .. }));
        assert!(parse_post_filename(Path::new("2021-03-05.md")).is_err());
        assert!(parse_post_filename(Path::new("2021-03-05-.md")).is_err());
    }

    #[test]
    fn test_invalid_calendar_date() {
        assert!(parse_post_filename(Path::new("2021-02-30-nope.md")).is_err());
        assert!(parse_post_filename(Path::new("2021-13-01-nope.md")).is_err());
        assert!(parse_post_filename(Path::new("year-01-01-nope.md")).is_err());
        assert!(parse_post_filename(Path::new("+2021-01-01-nope.md")).is_err());
    }

    #[test]
    fn test_malformed_error_carries_path() {
        let path = PathBuf::from("_posts/notes.md");
        match parse_post_filename(&path) {
            Err(BlogError::MalformedFilename { path: reported }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_post_filename() {
        assert_eq!(
            post_filename("2021", "03", "05", "hello_world"),
            "2021-03-05-hello_world.md"
        );
    }

    #[test]
    fn test_is_post_file() {
        assert!(is_post_file(Path::new("2021-03-05-a.md")));
        assert!(!is_post_file(Path::new("2021-03-05-a.txt")));
        assert!(!is_post_file(Path::new("README")));
    }
}
