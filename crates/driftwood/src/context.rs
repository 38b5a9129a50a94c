use crate::config::SiteConfig;
use crate::post::Post;
use crate::selector::DateFilter;
use serde::Serialize;
use tera::Context;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageContext {
    pub title: String,
    pub url: String,
}

impl PageContext {
    /// `/2020/05` becomes title `2020/05`, url `/2020/05`.
    pub fn for_filter(filter: &DateFilter) -> Self {
        let path = filter.path();
        Self {
            url: format!("/{path}"),
            title: path,
        }
    }
}

pub fn listing_context(site: &SiteConfig, page: &PageContext, posts: &[Post]) -> Context {
    let mut context = Context::new();
    context.insert("site", site);
    context.insert("page", page);
    context.insert("posts", posts);
    context
}

pub fn entry_context(site: &SiteConfig, post: &Post) -> Context {
    let mut context = Context::new();
    context.insert("site", site);
    context.insert("page", post);
    context.insert("post", post);
    context
}

pub fn error_context(site: &SiteConfig, page: &PageContext) -> Context {
    let mut context = Context::new();
    context.insert("site", site);
    context.insert("page", page);
    context
}
