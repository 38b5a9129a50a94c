use crate::error::{BlogError, IoContext, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "_config.yml";
pub const POSTS_DIR_NAME: &str = "_posts";
pub const LAYOUTS_DIR_NAME: &str = "_layouts";
pub const SITE_DIR_NAME: &str = "_site";
pub const STAGING_DIR_NAME: &str = ".driftwood-sync";

pub const CLONE_URL_KEY: &str = "clone-url";

pub const DEFAULT_FEED_PATH: &str = "/feed";
pub const DEFAULT_CLONE_TIMEOUT: Duration = Duration::from_secs(120);

/// The site's `_config.yml`, handed to templates as `site`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SiteConfig {
    pub values: HashMap<String, Value>,
}

impl SiteConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BlogError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).io_context("reading config", path)?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let values: HashMap<String, Value> =
            serde_yml::from_str(content).map_err(|error| BlogError::YamlParse {
                path: path.to_path_buf(),
                message: error.to_string(),
            })?;

        Ok(Self { values })
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|value| value.as_str())
    }

    pub fn clone_url(&self) -> Option<&str> {
        self.get_str(CLONE_URL_KEY)
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogPaths {
    pub root: PathBuf,
    pub config_file: PathBuf,
    pub posts_dir: PathBuf,
    pub layouts_dir: PathBuf,
    pub site_dir: PathBuf,
    pub staging_dir: PathBuf,
}

impl BlogPaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            config_file: root.join(CONFIG_FILE_NAME),
            posts_dir: root.join(POSTS_DIR_NAME),
            layouts_dir: root.join(LAYOUTS_DIR_NAME),
            site_dir: root.join(SITE_DIR_NAME),
            staging_dir: root.join(STAGING_DIR_NAME),
            root,
        }
    }

    /// The synchronized directories as `(name in the remote, local path)`.
    pub fn managed_dirs(&self) -> [(&'static str, &Path); 3] {
        [
            (POSTS_DIR_NAME, self.posts_dir.as_path()),
            (LAYOUTS_DIR_NAME, self.layouts_dir.as_path()),
            (SITE_DIR_NAME, self.site_dir.as_path()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct BlogOptions {
    pub root: PathBuf,
    pub feed_path: String,
    pub clone_timeout: Duration,
}

impl BlogOptions {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            feed_path: DEFAULT_FEED_PATH.to_string(),
            clone_timeout: DEFAULT_CLONE_TIMEOUT,
        }
    }

    pub fn feed_path(mut self, path: impl Into<String>) -> Self {
        self.feed_path = normalize_feed_path(&path.into());
        self
    }

    pub fn clone_timeout(mut self, timeout: Duration) -> Self {
        self.clone_timeout = timeout;
        self
    }
}

pub fn normalize_feed_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        DEFAULT_FEED_PATH.to_string()
    } else {
        format!("/{trimmed}")
    }
}
