use crate::config::SiteConfig;
use crate::context::PageContext;
use crate::post::Post;
use crate::xml::escape;

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

/// RSS 2.0 document used when the site has no `feed.rss` template of its own.
pub fn default_rss(site: &SiteConfig, page: &PageContext, posts: &[Post]) -> String {
    let base_url = site.get_str("url").unwrap_or("").trim_end_matches('/');
    let site_title = site.get_str("title").unwrap_or("");
    let title = if page.title.is_empty() {
        site_title.to_string()
    } else {
        format!("{site_title} - {}", page.title)
    };

    let mut items = String::new();
    for post in posts {
        let post_url = format!("{}{}", base_url, post.url);
        let pub_date = post
            .date
            .and_utc()
            .format("%a, %d %b %Y %H:%M:%S +0000")
            .to_string();
        let description = escape(post.excerpt.as_deref().unwrap_or(""));

        items.push_str(&format!(
            r#"    <item>
      <title>{}</title>
      <link>{}</link>
      <guid>{}</guid>
      <pubDate>{}</pubDate>
      <description>{}</description>
    </item>
"#,
            escape(&post.title),
            escape(&post_url),
            escape(&post_url),
            pub_date,
            description
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>{}</title>
    <link>{}{}</link>
    <description>{}</description>
{}  </channel>
</rss>
"#,
        escape(&title),
        escape(base_url),
        escape(&page.url),
        escape(site.get_str("description").unwrap_or("")),
        items
    )
}
