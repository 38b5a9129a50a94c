pub mod blog;
pub mod config;
pub mod context;
pub mod error;
pub mod feeds;
pub mod filename;
pub mod frontmatter;
pub mod parsing;
pub mod post;
pub mod routes;
pub mod selector;
pub mod server;
pub mod sync;
pub mod templates;
pub mod xml;

pub use blog::Blog;
pub use config::{BlogOptions, BlogPaths, SiteConfig};
pub use error::{BlogError, IoContext, Result};
pub use filename::{PostIdentity, parse_post_filename};
pub use frontmatter::{Frontmatter, extract_front_matter};
pub use parsing::MarkdownRenderer;
pub use post::{Post, load_post};
pub use routes::Route;
pub use selector::{ContentSelector, DateFilter, Selection};
pub use server::router;
pub use sync::{GitCloner, RepositoryCloner, SyncEngine, SyncReport};
pub use templates::{TemplateEngine, TemplateSource};
