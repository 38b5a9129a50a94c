use crate::blog::Blog;
use crate::config::SiteConfig;
use crate::context::{PageContext, entry_context, error_context, listing_context};
use crate::error::BlogError;
use crate::feeds::{RSS_CONTENT_TYPE, default_rss};
use crate::post::load_post;
use crate::routes::Route;
use crate::selector::DateFilter;
use crate::templates::{ENTRY_TEMPLATE, FEED_TEMPLATE, LISTING_TEMPLATE, TemplateSource};
use axum::Router;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub const SYNC_OK: &str = "OK";
pub const SYNC_FAILED: &str = "NG";

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

pub fn router(blog: Arc<Blog>) -> Router {
    Router::new()
        .route("/pull", post(pull))
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(blog)
}

pub fn content_type_for(path: &Path) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::TEXT {
        format!("{mime}; charset=utf-8")
    } else {
        mime.to_string()
    }
}

#[derive(Debug)]
struct Rendered {
    status: StatusCode,
    content_type: String,
    body: String,
}

impl Rendered {
    fn ok(content_type: impl Into<String>, body: String) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: content_type.into(),
            body,
        }
    }
}

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, self.content_type)],
            self.body,
        )
            .into_response()
    }
}

#[derive(Debug)]
enum Failure {
    NotFound,
    Internal(BlogError),
}

impl From<BlogError> for Failure {
    fn from(error: BlogError) -> Self {
        if error.is_not_found() {
            Failure::NotFound
        } else {
            Failure::Internal(error)
        }
    }
}

async fn pull(State(blog): State<Arc<Blog>>) -> impl IntoResponse {
    let token = match tokio::task::spawn_blocking(move || blog.sync()).await {
        Ok(Ok(_)) => SYNC_OK,
        Ok(Err(error)) => {
            tracing::error!("Pull failed: {error}");
            SYNC_FAILED
        }
        Err(error) => {
            tracing::error!("Pull task failed: {error}");
            SYNC_FAILED
        }
    };

    ([(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], token)
}

async fn dispatch(State(blog): State<Arc<Blog>>, request: Request) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let route = Route::classify(request.uri().path(), blog.feed_path());
    tracing::debug!("{} -> {route:?}", request.uri().path());

    if route == Route::Static {
        return serve_static(blog, request).await;
    }

    respond_blocking(blog, move |blog| render_route(blog, &route)).await
}

async fn respond_blocking<F>(blog: Arc<Blog>, render: F) -> Response
where
    F: FnOnce(&Blog) -> Rendered + Send + 'static,
{
    match tokio::task::spawn_blocking(move || render(&blog)).await {
        Ok(rendered) => rendered.into_response(),
        Err(error) => {
            tracing::error!("Render task failed: {error}");
            plain_error(StatusCode::INTERNAL_SERVER_ERROR).into_response()
        }
    }
}

async fn serve_static(blog: Arc<Blog>, request: Request) -> Response {
    // ServeDir opens the file before returning, so the guard only has to
    // cover the lookup.
    let response = {
        let _reading = blog.read_content().await;
        match ServeDir::new(&blog.paths().site_dir)
            .append_index_html_on_directories(false)
            .oneshot(request)
            .await
        {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        }
    };

    if response.status() != StatusCode::NOT_FOUND {
        return response;
    }

    respond_blocking(blog, |blog| {
        let _reading = blog.blocking_read_content();
        let page = PageContext::for_filter(&DateFilter::any());
        error_page(blog, &blog.site(), &page, StatusCode::NOT_FOUND)
    })
    .await
}

fn render_route(blog: &Blog, route: &Route) -> Rendered {
    let _reading = blog.blocking_read_content();
    let site = blog.site();

    let outcome = match route {
        Route::Page(file) => render_page(blog, &site, file),
        Route::Listing(filter) => render_listing(blog, &site, filter),
        Route::Entry {
            year,
            month,
            day,
            slug,
        } => render_entry(blog, &site, year, month, day, slug),
        Route::Feed(filter) => render_feed(blog, &site, filter),
        Route::Static => Err(Failure::NotFound),
    };

    match outcome {
        Ok(rendered) => rendered,
        Err(failure) => {
            let page = page_for(route);
            let status = match failure {
                Failure::NotFound => StatusCode::NOT_FOUND,
                Failure::Internal(error) => {
                    tracing::error!("{route:?}: {error}");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            error_page(blog, &site, &page, status)
        }
    }
}

fn page_for(route: &Route) -> PageContext {
    let filter = match route {
        Route::Listing(filter) | Route::Feed(filter) => filter.clone(),
        Route::Entry {
            year, month, day, ..
        } => DateFilter::from_segments(&[year, month, day]).unwrap_or_default(),
        Route::Page(_) | Route::Static => DateFilter::any(),
    };
    PageContext::for_filter(&filter)
}

fn render_page(blog: &Blog, site: &SiteConfig, file: &str) -> Result<Rendered, Failure> {
    let template = TemplateSource::Site(file.to_string());
    if !blog.templates().exists(&template) {
        return Err(Failure::NotFound);
    }

    let filter = DateFilter::any();
    let selection = blog.select(&filter);
    if selection.is_empty() {
        return Err(Failure::NotFound);
    }

    let posts = selection.load_posts(blog.renderer());
    let page = PageContext::for_filter(&filter);
    let body = blog
        .templates()
        .render(&template, &listing_context(site, &page, &posts))?;

    Ok(Rendered::ok(
        content_type_for(&blog.templates().path(&template)),
        body,
    ))
}

fn render_listing(blog: &Blog, site: &SiteConfig, filter: &DateFilter) -> Result<Rendered, Failure> {
    let selection = blog.select(filter);
    if selection.is_empty() {
        return Err(Failure::NotFound);
    }

    let template = TemplateSource::Layout(LISTING_TEMPLATE.to_string());
    let posts = selection.load_posts(blog.renderer());
    let page = PageContext::for_filter(filter);
    let body = blog
        .templates()
        .render(&template, &listing_context(site, &page, &posts))?;

    Ok(Rendered::ok(
        content_type_for(&blog.templates().path(&template)),
        body,
    ))
}

fn render_entry(
    blog: &Blog,
    site: &SiteConfig,
    year: &str,
    month: &str,
    day: &str,
    slug: &str,
) -> Result<Rendered, Failure> {
    let path = blog
        .selector()
        .find_entry(year, month, day, slug)
        .ok_or(Failure::NotFound)?;
    let post = load_post(&path, blog.renderer())?;

    let template = TemplateSource::Layout(ENTRY_TEMPLATE.to_string());
    let body = blog
        .templates()
        .render(&template, &entry_context(site, &post))?;

    Ok(Rendered::ok(HTML_CONTENT_TYPE, body))
}

fn render_feed(blog: &Blog, site: &SiteConfig, filter: &DateFilter) -> Result<Rendered, Failure> {
    let selection = blog.select(filter);
    if selection.is_empty() {
        return Err(Failure::NotFound);
    }

    let posts = selection.load_posts(blog.renderer());
    let page = PageContext::for_filter(filter);
    let template = TemplateSource::Site(FEED_TEMPLATE.to_string());

    let body = if blog.templates().exists(&template) {
        blog.templates()
            .render(&template, &listing_context(site, &page, &posts))?
    } else {
        default_rss(site, &page, &posts)
    };

    Ok(Rendered::ok(RSS_CONTENT_TYPE, body))
}

fn error_page(blog: &Blog, site: &SiteConfig, page: &PageContext, status: StatusCode) -> Rendered {
    let template = TemplateSource::Site(format!("{}.html", status.as_u16()));

    if blog.templates().exists(&template) {
        match blog.templates().render(&template, &error_context(site, page)) {
            Ok(body) => {
                return Rendered {
                    status,
                    content_type: HTML_CONTENT_TYPE.to_string(),
                    body,
                };
            }
            Err(error) => tracing::warn!("Error page {} failed: {error}", status.as_u16()),
        }
    }

    plain_error(status)
}

fn plain_error(status: StatusCode) -> Rendered {
    Rendered {
        status,
        content_type: TEXT_CONTENT_TYPE.to_string(),
        body: status.canonical_reason().unwrap_or("Error").to_string(),
    }
}
