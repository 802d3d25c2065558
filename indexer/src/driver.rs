use crate::builder::{Builder, IndexBuilder, MultiThreadIndexBuilder};
use anyhow::Result;
use clap::Parser;
use crawler::{Crawler, FetchConfig, HttpFetcher};
use search_core::{
    json, InvertedIndex, MultiThreadSearcher, Searcher, ThreadSafeInvertedIndex, WordSearcher, WorkQueue,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_MAX: usize = 1;

#[derive(Parser, Debug)]
#[command(name = "indexer")]
#[command(about = "Build a word position index from text files or a web crawl, then answer queries")]
pub struct Options {
    /// Text file, or directory searched recursively for .txt/.text files
    #[arg(long)]
    pub text: Option<PathBuf>,
    /// Seed URL to crawl (implies multi-threaded mode)
    #[arg(long)]
    pub html: Option<String>,
    /// Maximum number of URLs a crawl may schedule
    #[arg(long)]
    pub max: Option<String>,
    /// Worker threads; enables multi-threaded mode. Bad values fall back to 5
    #[arg(long, num_args = 0..=1, default_missing_value = "5")]
    pub threads: Option<String>,
    /// File with one query per line
    #[arg(long)]
    pub query: Option<PathBuf>,
    /// Match whole words instead of prefixes
    #[arg(long, default_value_t = false)]
    pub exact: bool,
    /// Write the index as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "index.json")]
    pub index: Option<PathBuf>,
    /// Write per-location word counts as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "counts.json")]
    pub counts: Option<PathBuf>,
    /// Write query results as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "results.json")]
    pub results: Option<PathBuf>,
}

impl Options {
    pub fn concurrent(&self) -> bool {
        self.threads.is_some() || self.html.is_some()
    }

    pub fn thread_count(&self) -> usize {
        positive_or("threads", self.threads.as_deref(), WorkQueue::DEFAULT_THREADS)
    }

    pub fn max_urls(&self) -> usize {
        positive_or("max", self.max.as_deref(), DEFAULT_MAX)
    }
}

/// Parses a positive integer flag value, warning and using `default` otherwise.
pub fn positive_or(flag: &str, value: Option<&str>, default: usize) -> usize {
    let Some(raw) = value else { return default };
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= 1 => n,
        _ => {
            tracing::warn!(flag, value = raw, default, "invalid value, using default");
            default
        }
    }
}

/// Runs every requested step. A failing step is logged and the rest still run.
pub fn run(opts: &Options) -> Result<()> {
    if opts.concurrent() {
        run_concurrent(opts)
    } else {
        run_single(opts);
        Ok(())
    }
}

fn run_single(opts: &Options) {
    let mut index = InvertedIndex::new();
    if let Some(text) = &opts.text {
        report("build", IndexBuilder::new(&mut index).build(text).map(drop));
    }

    let mut searcher = WordSearcher::new(&index);
    if let Some(query) = &opts.query {
        report("search", searcher.search_file(query, opts.exact));
    }

    write_outputs(
        opts,
        &searcher,
        |path| json::write_counts(&index, path),
        |path| json::write_index(&index, path),
    );
}

fn run_concurrent(opts: &Options) -> Result<()> {
    let queue = Arc::new(WorkQueue::new(opts.thread_count())?);
    let index = Arc::new(ThreadSafeInvertedIndex::new());

    if let Some(seed) = &opts.html {
        report("crawl", crawl(seed, opts.max_urls(), &index, &queue));
    }
    if let Some(text) = &opts.text {
        let mut builder = MultiThreadIndexBuilder::new(Arc::clone(&index), Arc::clone(&queue));
        report("build", builder.build(text).map(drop));
    }

    let mut searcher = MultiThreadSearcher::new(Arc::clone(&index), Arc::clone(&queue));
    if let Some(query) = &opts.query {
        report("search", searcher.search_file(query, opts.exact));
    }

    write_outputs(
        opts,
        &searcher,
        |path| index.write_counts_json(path),
        |path| index.write_index_json(path),
    );
    queue.shutdown();
    Ok(())
}

fn crawl(seed: &str, max: usize, index: &Arc<ThreadSafeInvertedIndex>, queue: &Arc<WorkQueue>) -> Result<()> {
    let fetcher = HttpFetcher::new(&FetchConfig::default())?;
    let crawler = Crawler::new(Arc::clone(index), Arc::clone(queue), Arc::new(fetcher), max);
    crawler.crawl(seed)?;
    Ok(())
}

fn write_outputs(
    opts: &Options,
    searcher: &dyn Searcher,
    counts: impl Fn(&Path) -> Result<()>,
    index: impl Fn(&Path) -> Result<()>,
) {
    if let Some(path) = &opts.results {
        report("results", searcher.write_json(path));
    }
    if let Some(path) = &opts.counts {
        report("counts", counts(path));
    }
    if let Some(path) = &opts.index {
        report("index", index(path));
    }
}

fn report(step: &str, result: Result<()>) {
    if let Err(err) = result {
        tracing::error!(step, error = %format!("{err:#}"), "step failed");
    }
}
