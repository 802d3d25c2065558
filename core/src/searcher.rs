//! Query-file processing. Each line is reduced to its sorted unique stems; the
//! stems joined by a space form the key under which the ranked results are kept,
//! so a repeated query is only evaluated once.

use crate::index::{SearchIndex, SearchResult, ThreadSafeInvertedIndex};
use crate::queue::WorkQueue;
use crate::tokenizer::unique_stems;
use anyhow::Result;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

pub type QueryResults = BTreeMap<String, Vec<SearchResult>>;

/// Calls `f` with every line of the UTF-8 file at `path`.
pub fn for_each_query_line(path: &Path, mut f: impl FnMut(&str)) -> Result<()> {
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        f(&line?);
    }
    Ok(())
}

pub fn query_key(stems: &BTreeSet<String>) -> String {
    stems.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

pub trait Searcher {
    /// Evaluates one query line (or schedules it).
    fn search_line(&mut self, line: &str, exact: bool);

    /// Evaluates every line of a query file; returns once all results are in.
    fn search_file(&mut self, path: &Path, exact: bool) -> Result<()>;

    fn results(&self) -> QueryResults;

    fn write_json(&self, path: &Path) -> Result<()> {
        crate::json::write_results(&self.results(), path)
    }
}

/// Evaluates queries on the calling thread.
pub struct WordSearcher<'a, I: SearchIndex + ?Sized> {
    index: &'a I,
    results: QueryResults,
}

impl<'a, I: SearchIndex + ?Sized> WordSearcher<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Self { index, results: QueryResults::new() }
    }
}

impl<I: SearchIndex + ?Sized> Searcher for WordSearcher<'_, I> {
    fn search_line(&mut self, line: &str, exact: bool) {
        let stems = unique_stems(line);
        if stems.is_empty() {
            return;
        }
        let key = query_key(&stems);
        if !self.results.contains_key(&key) {
            let found = self.index.search(&stems, exact);
            self.results.insert(key, found);
        }
    }

    fn search_file(&mut self, path: &Path, exact: bool) -> Result<()> {
        for_each_query_line(path, |line| self.search_line(line, exact))
    }

    fn results(&self) -> QueryResults {
        self.results.clone()
    }
}

/// Evaluates each query line as a task on a shared [`WorkQueue`].
pub struct MultiThreadSearcher {
    index: Arc<ThreadSafeInvertedIndex>,
    queue: Arc<WorkQueue>,
    results: Arc<Mutex<QueryResults>>,
}

impl MultiThreadSearcher {
    pub fn new(index: Arc<ThreadSafeInvertedIndex>, queue: Arc<WorkQueue>) -> Self {
        Self { index, queue, results: Arc::new(Mutex::new(QueryResults::new())) }
    }
}

impl Searcher for MultiThreadSearcher {
    fn search_line(&mut self, line: &str, exact: bool) {
        let line = line.to_string();
        let index = Arc::clone(&self.index);
        let results = Arc::clone(&self.results);
        let submitted = self.queue.submit(move || {
            let stems = unique_stems(&line);
            if stems.is_empty() {
                return;
            }
            let key = query_key(&stems);
            if results.lock().contains_key(&key) {
                return;
            }
            let found = index.search(&stems, exact);
            results.lock().insert(key, found);
        });
        if let Err(err) = submitted {
            tracing::warn!(%err, "query not scheduled");
        }
    }

    fn search_file(&mut self, path: &Path, exact: bool) -> Result<()> {
        let read = for_each_query_line(path, |line| self.search_line(line, exact));
        self.queue.await_idle();
        read
    }

    fn results(&self) -> QueryResults {
        self.results.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InvertedIndex;

    #[test]
    fn query_lines_are_canonicalized_and_deduplicated() {
        let mut index = InvertedIndex::new();
        index.add_words(&["fox", "run", "fox"], "doc1");
        let mut searcher = WordSearcher::new(&index);
        searcher.search_line("Foxes RUNNING", true);
        searcher.search_line("running fox", true);
        searcher.search_line("  42 !! ", true);
        let results = searcher.results();
        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["fox run"]);
        assert_eq!(results["fox run"][0].count, 3);
    }
}
