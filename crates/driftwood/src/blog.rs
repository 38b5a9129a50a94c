use crate::config::{BlogOptions, BlogPaths, SiteConfig, normalize_feed_path};
use crate::error::{BlogError, Result};
use crate::parsing::MarkdownRenderer;
use crate::selector::{ContentSelector, DateFilter, Selection};
use crate::sync::{GitCloner, RepositoryCloner, SyncEngine, SyncReport};
use crate::templates::TemplateEngine;
use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};

/// Everything a request handler needs, built once the site config has been
/// loaded. There is no way to obtain a `Blog` without a configuration.
pub struct Blog {
    paths: BlogPaths,
    feed_path: String,
    config: ArcSwap<SiteConfig>,
    renderer: MarkdownRenderer,
    templates: TemplateEngine,
    selector: ContentSelector,
    content_lock: Arc<RwLock<()>>,
    sync: SyncEngine,
}

impl Blog {
    pub fn open(options: BlogOptions) -> Result<Self> {
        Self::with_cloner(options, Box::new(GitCloner::new()))
    }

    pub fn with_cloner(options: BlogOptions, cloner: Box<dyn RepositoryCloner>) -> Result<Self> {
        let paths = BlogPaths::new(&options.root);
        let config = SiteConfig::load(&paths.config_file)?;
        let content_lock = Arc::new(RwLock::new(()));

        tracing::info!("Loaded site config from {}", paths.config_file.display());

        Ok(Self {
            feed_path: normalize_feed_path(&options.feed_path),
            config: ArcSwap::from_pointee(config),
            renderer: MarkdownRenderer::new(),
            templates: TemplateEngine::new(&paths.layouts_dir, &paths.site_dir),
            selector: ContentSelector::new(&paths.posts_dir),
            sync: SyncEngine::new(
                paths.clone(),
                cloner,
                options.clone_timeout,
                Arc::clone(&content_lock),
            ),
            content_lock,
            paths,
        })
    }

    pub fn paths(&self) -> &BlogPaths {
        &self.paths
    }

    pub fn feed_path(&self) -> &str {
        &self.feed_path
    }

    pub fn site(&self) -> Arc<SiteConfig> {
        self.config.load_full()
    }

    /// Re-reads `_config.yml`. On error the current configuration stays in
    /// place. Returns whether anything changed.
    pub fn reload_config(&self) -> Result<bool> {
        let fresh = SiteConfig::load(&self.paths.config_file)?;
        if *self.config.load_full() == fresh {
            return Ok(false);
        }

        self.config.store(Arc::new(fresh));
        tracing::info!("Reloaded site config");
        Ok(true)
    }

    pub fn renderer(&self) -> &MarkdownRenderer {
        &self.renderer
    }

    pub fn templates(&self) -> &TemplateEngine {
        &self.templates
    }

    pub fn selector(&self) -> &ContentSelector {
        &self.selector
    }

    pub fn select(&self, filter: &DateFilter) -> Selection {
        self.selector.select(filter)
    }

    /// Held while reading content directories; a sync waits for readers
    /// before swapping directories.
    pub async fn read_content(&self) -> RwLockReadGuard<'_, ()> {
        self.content_lock.read().await
    }

    /// Same as [`Blog::read_content`], for blocking threads. Panics when
    /// called from async code.
    pub fn blocking_read_content(&self) -> RwLockReadGuard<'_, ()> {
        self.content_lock.blocking_read()
    }

    #[cfg(test)]
    pub(crate) fn content_lock(&self) -> &RwLock<()> {
        &self.content_lock
    }

    pub fn sync(&self) -> Result<SyncReport> {
        let site = self.site();
        let clone_url = site.clone_url().ok_or(BlogError::MissingCloneUrl)?;
        self.sync.run(clone_url)
    }
}
