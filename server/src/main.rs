use anyhow::Result;
use axum::Router;
use clap::Parser;
use crawler::{Crawler, FetchConfig, HttpFetcher};
use search_core::{ThreadSafeInvertedIndex, WorkQueue};
use server::build_app;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Seed URL crawled before serving
    #[arg(long)]
    html: Option<String>,
    /// Maximum number of URLs the crawl may schedule
    #[arg(long, default_value_t = 1)]
    max: usize,
    /// Crawler worker threads
    #[arg(long, default_value_t = WorkQueue::DEFAULT_THREADS)]
    threads: usize,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

// The blocking HTTP client cannot live inside a tokio runtime, so the crawl
// finishes before the runtime is started.
fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let index = Arc::new(ThreadSafeInvertedIndex::new());

    if let Some(seed) = &args.html {
        let queue = Arc::new(WorkQueue::new(args.threads.max(1))?);
        let fetcher = HttpFetcher::new(&FetchConfig::default())?;
        let crawler = Crawler::new(Arc::clone(&index), Arc::clone(&queue), Arc::new(fetcher), args.max.max(1));
        crawler.crawl(seed)?;
        queue.shutdown();
    }
    tracing::info!(words = index.word_len(), locations = index.location_total(), "index ready");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(serve(&args.host, args.port, index))
}

async fn serve(host: &str, port: u16, index: Arc<ThreadSafeInvertedIndex>) -> Result<()> {
    let app: Router = build_app(index);
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
