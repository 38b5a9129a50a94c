use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error while {action} {path}: {source}")]
    IoContext {
        action: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error in {path}: {message}")]
    YamlParse { path: PathBuf, message: String },

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Directory walk error in {path}: {message}")]
    WalkDir { path: PathBuf, message: String },

    #[error("Malformed post filename: {path}")]
    MalformedFilename { path: PathBuf },

    #[error("Invalid front matter in {path}: {message}")]
    FrontMatterParse { path: PathBuf, message: String },

    #[error("Post not found: {path}")]
    PostNotFound { path: PathBuf },

    #[error("Failed to load post {path}: {source}")]
    PostLoad {
        path: PathBuf,
        #[source]
        source: Box<BlogError>,
    },

    #[error("Site config has no 'clone-url' key")]
    MissingCloneUrl,

    #[error("Clone failed: {message}")]
    SyncClone { message: String },

    #[error("Failed to replace {directory}: {message}")]
    SyncReplace { directory: String, message: String },
}

pub type Result<T> = std::result::Result<T, BlogError>;

pub trait IoContext<T> {
    fn io_context(self, action: &str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(self, action: &str, path: &Path) -> Result<T> {
        self.map_err(|source| BlogError::IoContext {
            action: action.to_string(),
            path: path.to_path_buf(),
            source,
        })
    }
}

impl BlogError {
    pub fn is_not_found(&self) -> bool {
        match self {
            BlogError::PostNotFound { .. } => true,
            BlogError::PostLoad { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_context_keeps_path() {
        let result: std::io::Result<()> = Err(std::io::Error::other("boom"));
        let error = result
            .io_context("reading post", Path::new("_posts/a.md"))
            .unwrap_err();
        let message = error.to_string();
        assert!(message.contains("reading post"));
        assert!(message.contains("_posts/a.md"));
    }

    #[test]
    fn test_not_found_through_post_load() {
        let error = BlogError::PostLoad {
            path: PathBuf::from("a.md"),
            source: Box::new(BlogError::PostNotFound {
                path: PathBuf::from("a.md"),
            }),
        };
        assert!(error.is_not_found());
        assert!(!BlogError::MissingCloneUrl.is_not_found());
    }
}
