use crate::error::{BlogError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

const DELIMITER: &str = "---";

const OFFSET_DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M %z"];
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    #[serde(flatten)]
    pub raw: HashMap<String, Value>,
}

impl Frontmatter {
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.raw.get(key).and_then(|value| match value {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        })
    }

    pub fn title(&self) -> Option<String> {
        self.get_string("title")
    }

    pub fn date(&self) -> Option<NaiveDateTime> {
        self.get_string("date")
            .and_then(|text| parse_front_matter_date(&text))
    }
}

#[derive(Debug)]
pub struct Extracted<'a> {
    pub frontmatter: Frontmatter,
    pub body: &'a str,
}

/// Splits a post into its front-matter block and markdown body.
///
/// The block must open on the very first line with `---` and close with a
/// later line that is exactly `---`. Without both delimiters the whole input
/// is the body. A block whose YAML does not parse yields an error together
/// with the body that follows it; see [`extract_front_matter_lenient`].
pub fn extract_front_matter<'a>(
    content: &'a str,
    path: &Path,
) -> std::result::Result<Extracted<'a>, (BlogError, &'a str)> {
    let Some((block, body)) = split_front_matter(content) else {
        return Ok(Extracted {
            frontmatter: Frontmatter::default(),
            body: content,
        });
    };

    match parse_block(block, path) {
        Ok(frontmatter) => Ok(Extracted { frontmatter, body }),
        Err(error) => Err((error, body)),
    }
}

pub fn extract_front_matter_lenient<'a>(content: &'a str, path: &Path) -> Extracted<'a> {
    match extract_front_matter(content, path) {
        Ok(extracted) => extracted,
        Err((error, body)) => {
            tracing::warn!("{error}; using filename metadata");
            Extracted {
                frontmatter: Frontmatter::default(),
                body,
            }
        }
    }
}

fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let mut lines = content.split_inclusive('\n');
    let first = lines.next()?;
    if trim_line_ending(first) != DELIMITER {
        return None;
    }

    let block_start = first.len();
    let mut position = block_start;

    for line in lines {
        if trim_line_ending(line) == DELIMITER {
            let block = &content[block_start..position];
            let body = &content[position + line.len()..];
            return Some((block, body));
        }
        position += line.len();
    }

    None
}

fn trim_line_ending(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .unwrap_or(line)
}

fn parse_block(block: &str, path: &Path) -> Result<Frontmatter> {
    if block.trim().is_empty() {
        return Ok(Frontmatter::default());
    }

    let raw: HashMap<String, Value> =
        serde_yml::from_str(block).map_err(|error| BlogError::FrontMatterParse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;

    Ok(Frontmatter { raw })
}

pub fn parse_front_matter_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_local());
    }

    for format in OFFSET_DATE_TIME_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(text, format) {
            return Some(parsed.naive_local());
        }
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .map(|date| date.and_time(NaiveTime::MIN))
}
