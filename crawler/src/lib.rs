//! Multi-threaded web crawler feeding a shared [`ThreadSafeInvertedIndex`].
//!
//! Starting from one seed, every page is a task on the [`WorkQueue`]: fetch,
//! strip comments and block elements, queue unseen links while the frontier has
//! room, then index the page text through a private index merged in one call.

pub mod fetch;
pub mod html;

use parking_lot::Mutex;
use search_core::tokenizer::stems;
use search_core::{InvertedIndex, QueueError, ThreadSafeInvertedIndex, WorkQueue};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

pub use fetch::{Fetch, FetchConfig, FetchError, HttpFetcher};

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("invalid seed url: {0}")]
    InvalidSeed(#[from] url::ParseError),
    #[error("seed url {0} is not http or https")]
    UnsupportedScheme(Url),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

pub struct Crawler {
    inner: Arc<Inner>,
}

struct Inner {
    index: Arc<ThreadSafeInvertedIndex>,
    queue: Arc<WorkQueue>,
    fetcher: Arc<dyn Fetch>,
    /// Every url ever scheduled, visited or not
    frontier: Mutex<HashSet<Url>>,
    max: usize,
}

impl Crawler {
    /// `max` bounds how many distinct urls the crawl will ever schedule.
    pub fn new(
        index: Arc<ThreadSafeInvertedIndex>,
        queue: Arc<WorkQueue>,
        fetcher: Arc<dyn Fetch>,
        max: usize,
    ) -> Self {
        let inner = Inner { index, queue, fetcher, frontier: Mutex::new(HashSet::new()), max };
        Self { inner: Arc::new(inner) }
    }

    /// Crawls from `seed` and returns once every scheduled page has been processed.
    pub fn crawl(&self, seed: &str) -> Result<(), CrawlError> {
        let seed = html::normalize(Url::parse(seed.trim())?);
        if !html::is_http(&seed) {
            return Err(CrawlError::UnsupportedScheme(seed));
        }
        tracing::info!(%seed, max = self.inner.max, threads = self.inner.queue.size(), "crawl started");
        {
            let mut frontier = self.inner.frontier.lock();
            frontier.insert(seed.clone());
            Inner::schedule(&self.inner, seed)?;
        }
        self.inner.queue.await_idle();
        tracing::info!(visited = self.visited(), "crawl finished");
        Ok(())
    }

    /// Number of urls scheduled so far.
    pub fn visited(&self) -> usize {
        self.inner.frontier.lock().len()
    }

    /// Scheduled urls in sorted order.
    pub fn frontier(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.inner.frontier.lock().iter().map(|u| u.to_string()).collect();
        urls.sort();
        urls
    }
}

impl Inner {
    fn schedule(this: &Arc<Self>, url: Url) -> Result<(), QueueError> {
        let inner = Arc::clone(this);
        this.queue.submit(move || inner.visit(url))
    }

    fn visit(self: &Arc<Self>, url: Url) {
        let page = match self.fetcher.fetch(&url) {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(%url, %err, "skipping page");
                return;
            }
        };
        let cleaned = html::strip_block_elements(&page);
        self.discover(html::links(&url, &cleaned));

        let text = html::strip_entities(&html::strip_tags(&cleaned));
        let mut local = InvertedIndex::new();
        local.add_words(&stems(&text), url.as_str());
        tracing::debug!(%url, words = local.word_count(url.as_str()), "indexed page");
        self.index.add_all(local);
    }

    fn discover(self: &Arc<Self>, links: Vec<Url>) {
        let mut frontier = self.frontier.lock();
        for link in links {
            if frontier.len() >= self.max {
                break;
            }
            if frontier.contains(&link) {
                continue;
            }
            frontier.insert(link.clone());
            if let Err(err) = Inner::schedule(self, link) {
                tracing::warn!(%err, "link not scheduled");
            }
        }
    }
}
