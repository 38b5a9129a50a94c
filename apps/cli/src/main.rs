mod commands;

use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "driftwood")]
#[command(about = "A file-based blog server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RootArgs {
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    Serve {
        #[command(flatten)]
        root: RootArgs,

        #[arg(long, default_value = "127.0.0.1")]
        bind: IpAddr,

        #[arg(long, default_value = "5000")]
        port: u16,

        #[arg(long, default_value = driftwood_blog::config::DEFAULT_FEED_PATH)]
        feed_path: String,

        #[arg(long, default_value = "120")]
        clone_timeout: u64,

        #[arg(long)]
        watch_config: bool,
    },
    Sync {
        #[command(flatten)]
        root: RootArgs,

        #[arg(long, default_value = "120")]
        clone_timeout: u64,
    },
    List {
        #[command(flatten)]
        root: RootArgs,

        #[arg(long)]
        year: Option<String>,

        #[arg(long)]
        month: Option<String>,

        #[arg(long)]
        day: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve {
            root,
            bind,
            port,
            feed_path,
            clone_timeout,
            watch_config,
        } => {
            commands::serve_blog(
                &root.root,
                bind,
                port,
                &feed_path,
                clone_timeout,
                watch_config,
            )
            .await
        }
        Commands::Sync {
            root,
            clone_timeout,
        } => commands::sync_blog(&root.root, clone_timeout).await,
        Commands::List {
            root,
            year,
            month,
            day,
        } => commands::list_posts(
            &root.root,
            year.as_deref(),
            month.as_deref(),
            day.as_deref(),
        ),
    };

    if let Err(error) = result {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
