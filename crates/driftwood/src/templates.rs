use crate::error::{BlogError, Result};
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use walkdir::WalkDir;

pub const LISTING_TEMPLATE: &str = "default.html";
pub const ENTRY_TEMPLATE: &str = "post.html";
pub const FEED_TEMPLATE: &str = "feed.rss";
pub const INDEX_PAGE: &str = "index.html";

const SITE_TEMPLATE_PREFIX: &str = "_site/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Layout(String),
    Site(String),
}

impl TemplateSource {
    pub fn relative(&self) -> &str {
        match self {
            TemplateSource::Layout(name) | TemplateSource::Site(name) => name,
        }
    }
}

/// Renders layouts and site pages with tera. Templates are read from disk on
/// every render so content replaced by a sync is picked up immediately.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    layouts_dir: PathBuf,
    site_dir: PathBuf,
}

impl TemplateEngine {
    pub fn new(layouts_dir: impl AsRef<Path>, site_dir: impl AsRef<Path>) -> Self {
        Self {
            layouts_dir: layouts_dir.as_ref().to_path_buf(),
            site_dir: site_dir.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self, template: &TemplateSource) -> PathBuf {
        match template {
            TemplateSource::Layout(name) => self.layouts_dir.join(name),
            TemplateSource::Site(name) => self.site_dir.join(name),
        }
    }

    pub fn exists(&self, template: &TemplateSource) -> bool {
        self.path(template).is_file()
    }

    pub fn render(&self, template: &TemplateSource, context: &Context) -> Result<String> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        let mut files = self.layout_files()?;
        let name = match template {
            TemplateSource::Layout(name) => name.clone(),
            TemplateSource::Site(relative) => {
                let name = format!("{SITE_TEMPLATE_PREFIX}{relative}");
                files.push((self.site_dir.join(relative), Some(name.clone())));
                name
            }
        };

        tera.add_template_files(files)?;
        Ok(tera.render(&name, context)?)
    }

    fn layout_files(&self) -> Result<Vec<(PathBuf, Option<String>)>> {
        let mut files = Vec::new();

        if !self.layouts_dir.is_dir() {
            return Ok(files);
        }

        for entry in WalkDir::new(&self.layouts_dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        {
            let entry = entry.map_err(|error| BlogError::WalkDir {
                path: self.layouts_dir.clone(),
                message: error.to_string(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.layouts_dir) else {
                continue;
            };
            let name = relative.to_string_lossy().replace('\\', "/");
            files.push((entry.path().to_path_buf(), Some(name)));
        }

        Ok(files)
    }
}
