use driftwood_blog::config::CONFIG_FILE_NAME;
use driftwood_blog::{Blog, BlogOptions, BlogPaths, ContentSelector, DateFilter, MarkdownRenderer};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::time::{Duration, Instant};

const DEBOUNCE_DURATION: Duration = Duration::from_millis(300);

fn blog_options(root: &Path, clone_timeout: u64) -> BlogOptions {
    BlogOptions::new(root).clone_timeout(Duration::from_secs(clone_timeout))
}

fn date_filter(
    year: Option<&str>,
    month: Option<&str>,
    day: Option<&str>,
) -> Result<DateFilter, Box<dyn std::error::Error>> {
    let segments: Vec<&str> = match (year, month, day) {
        (None, None, None) => Vec::new(),
        (Some(year), None, None) => vec![year],
        (Some(year), Some(month), None) => vec![year, month],
        (Some(year), Some(month), Some(day)) => vec![year, month, day],
        _ => return Err("--month needs --year, and --day needs --month".into()),
    };

    DateFilter::from_segments(&segments)
        .ok_or_else(|| format!("Invalid date filter '{}'", segments.join("/")).into())
}

fn touches_config(event: &Event) -> bool {
    event
        .paths
        .iter()
        .any(|path| path.file_name().is_some_and(|name| name == CONFIG_FILE_NAME))
}

pub async fn sync_blog(root: &Path, clone_timeout: u64) -> Result<(), Box<dyn std::error::Error>> {
    let blog = Blog::open(blog_options(root, clone_timeout))?;

    println!("Syncing {}...", root.display());
    let start = Instant::now();

    let report = tokio::task::spawn_blocking(move || blog.sync()).await??;

    for (directory, files) in &report.directories {
        println!("  {directory}: {files} files");
    }
    println!(
        "Synced {} files in {:.2?}",
        report.total_files(),
        start.elapsed()
    );

    Ok(())
}

pub fn list_posts(
    root: &Path,
    year: Option<&str>,
    month: Option<&str>,
    day: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = date_filter(year, month, day)?;
    let paths = BlogPaths::new(root);
    let selection = ContentSelector::new(&paths.posts_dir).select(&filter);

    for post in selection.load_posts(&MarkdownRenderer::new()) {
        println!(
            "{}\t{}\t{}",
            post.url,
            post.date.format("%Y-%m-%d"),
            post.title
        );
    }

    Ok(())
}

fn watch_config(blog: Arc<Blog>) -> Result<RecommendedWatcher, Box<dyn std::error::Error>> {
    let (notify_tx, notify_rx) = channel();

    let mut watcher = RecommendedWatcher::new(
        notify_tx,
        Config::default().with_poll_interval(Duration::from_millis(200)),
    )?;

    // Editors often replace the file, so watch the directory holding it.
    watcher.watch(&blog.paths().root, RecursiveMode::NonRecursive)?;

    std::thread::spawn(move || {
        loop {
            match notify_rx.recv() {
                Ok(Ok(event)) if touches_config(&event) => {
                    loop {
                        match notify_rx.recv_timeout(DEBOUNCE_DURATION) {
                            Ok(_) => continue,
                            Err(RecvTimeoutError::Timeout) => break,
                            Err(RecvTimeoutError::Disconnected) => return,
                        }
                    }

                    match blog.reload_config() {
                        Ok(true) => println!("Config changed, reloaded"),
                        Ok(false) => {}
                        Err(error) => eprintln!("Config reload error: {error}"),
                    }
                }
                Ok(Ok(_)) => {}
                Ok(Err(error)) => eprintln!("Watch error: {error}"),
                Err(_) => break,
            }
        }
    });

    Ok(watcher)
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {error}");
        std::future::pending::<()>().await;
    }
}

pub async fn serve_blog(
    root: &Path,
    bind: IpAddr,
    port: u16,
    feed_path: &str,
    clone_timeout: u64,
    watch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = blog_options(root, clone_timeout).feed_path(feed_path);
    let blog = Arc::new(Blog::open(options)?);

    let _watcher = if watch {
        Some(watch_config(Arc::clone(&blog))?)
    } else {
        None
    };

    let addr = SocketAddr::new(bind, port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("Serving {} at http://{}", root.display(), listener.local_addr()?);
    println!("Feed at {}", blog.feed_path());
    println!("Press Ctrl+C to stop");

    axum::serve(listener, driftwood_blog::router(blog))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
