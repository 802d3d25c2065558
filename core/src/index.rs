use crate::lock::ReadWriteLock;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::cell::UnsafeCell;
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::path::Path;

/// word -> location -> positions
pub type Postings = BTreeMap<String, BTreeMap<String, BTreeSet<usize>>>;

/// One location matched by a query. Built fresh by every search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub count: usize,
    pub score: f64,
    #[serde(rename = "where")]
    pub location: String,
}

impl SearchResult {
    fn new(location: String) -> Self {
        Self { count: 0, score: 0.0, location }
    }

    fn add_matches(&mut self, matches: usize, total: usize) {
        self.count += matches;
        self.score = self.count as f64 / total as f64;
    }

    /// Ranking order: higher score first, then higher count, then location
    /// ascending ignoring case.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.count.cmp(&self.count))
            .then_with(|| self.location.to_lowercase().cmp(&other.location.to_lowercase()))
            .then_with(|| self.location.cmp(&other.location))
    }
}

/// Inverted index of 1-based word positions plus the highest position seen per
/// location (its word count).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedIndex {
    postings: Postings,
    counts: BTreeMap<String, usize>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `word` at `position` in `location`. Positions are 1-based and are
    /// expected in increasing order within one pass over a document.
    pub fn add(&mut self, word: &str, location: &str, position: usize) {
        self.postings
            .entry(word.to_string())
            .or_default()
            .entry(location.to_string())
            .or_default()
            .insert(position);
        let count = self.counts.entry(location.to_string()).or_insert(0);
        *count = (*count).max(position);
    }

    /// Adds `words` as one document, numbering them from 1.
    pub fn add_words<S: AsRef<str>>(&mut self, words: &[S], location: &str) {
        for (i, word) in words.iter().enumerate() {
            self.add(word.as_ref(), location, i + 1);
        }
    }

    /// Merges `other` into this index: position sets are unioned and word
    /// counts take the larger of the two values.
    pub fn add_all(&mut self, other: InvertedIndex) {
        for (word, locations) in other.postings {
            match self.postings.entry(word) {
                Entry::Vacant(e) => {
                    e.insert(locations);
                }
                Entry::Occupied(mut e) => {
                    let mine = e.get_mut();
                    for (location, positions) in locations {
                        mine.entry(location).or_default().extend(positions);
                    }
                }
            }
        }
        for (location, count) in other.counts {
            let current = self.counts.entry(location).or_insert(0);
            *current = (*current).max(count);
        }
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }

    pub fn locations<'a>(&'a self, word: &str) -> impl Iterator<Item = &'a str> {
        self.postings
            .get(word)
            .into_iter()
            .flat_map(|locations| locations.keys().map(String::as_str))
    }

    pub fn positions<'a>(&'a self, word: &str, location: &str) -> impl Iterator<Item = usize> + 'a {
        self.postings
            .get(word)
            .and_then(|locations| locations.get(location))
            .into_iter()
            .flat_map(|positions| positions.iter().copied())
    }

    pub fn contains_word(&self, word: &str) -> bool {
        self.postings.contains_key(word)
    }

    pub fn contains_location(&self, word: &str, location: &str) -> bool {
        self.postings.get(word).is_some_and(|locations| locations.contains_key(location))
    }

    pub fn contains_position(&self, word: &str, location: &str, position: usize) -> bool {
        self.postings
            .get(word)
            .and_then(|locations| locations.get(location))
            .is_some_and(|positions| positions.contains(&position))
    }

    /// Number of distinct words.
    pub fn word_len(&self) -> usize {
        self.postings.len()
    }

    /// Number of locations containing `word`.
    pub fn location_len(&self, word: &str) -> usize {
        self.postings.get(word).map_or(0, BTreeMap::len)
    }

    /// Number of occurrences of `word` in `location`.
    pub fn position_len(&self, word: &str, location: &str) -> usize {
        self.postings
            .get(word)
            .and_then(|locations| locations.get(location))
            .map_or(0, BTreeSet::len)
    }

    /// Total words seen in `location`, 0 if unknown.
    pub fn word_count(&self, location: &str) -> usize {
        self.counts.get(location).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    pub fn postings(&self) -> &Postings {
        &self.postings
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn search(&self, words: &BTreeSet<String>, exact: bool) -> Vec<SearchResult> {
        if exact {
            self.exact_search(words)
        } else {
            self.partial_search(words)
        }
    }

    /// Locations containing any of `words` exactly.
    pub fn exact_search(&self, words: &BTreeSet<String>) -> Vec<SearchResult> {
        let mut results = Vec::new();
        let mut lookup = HashMap::new();
        for word in words {
            if let Some(locations) = self.postings.get(word) {
                self.accumulate(locations, &mut results, &mut lookup);
            }
        }
        results.sort_by(SearchResult::rank_cmp);
        results
    }

    /// Locations containing any indexed word that starts with one of `words`.
    /// An indexed word matched by several prefixes still counts once.
    pub fn partial_search(&self, words: &BTreeSet<String>) -> Vec<SearchResult> {
        let mut matched = BTreeSet::new();
        for word in words {
            let tail = self
                .postings
                .range::<str, _>((Bound::Included(word.as_str()), Bound::Unbounded));
            for (indexed, _) in tail {
                if !indexed.starts_with(word.as_str()) {
                    break;
                }
                matched.insert(indexed.as_str());
            }
        }

        let mut results = Vec::new();
        let mut lookup = HashMap::new();
        for indexed in matched {
            if let Some(locations) = self.postings.get(indexed) {
                self.accumulate(locations, &mut results, &mut lookup);
            }
        }
        results.sort_by(SearchResult::rank_cmp);
        results
    }

    fn accumulate<'a>(
        &'a self,
        locations: &'a BTreeMap<String, BTreeSet<usize>>,
        results: &mut Vec<SearchResult>,
        lookup: &mut HashMap<&'a str, usize>,
    ) {
        for (location, positions) in locations {
            let slot = *lookup.entry(location.as_str()).or_insert_with(|| {
                results.push(SearchResult::new(location.clone()));
                results.len() - 1
            });
            results[slot].add_matches(positions.len(), self.word_count(location));
        }
    }
}

/// Anything that can answer a ranked query.
pub trait SearchIndex {
    fn search(&self, words: &BTreeSet<String>, exact: bool) -> Vec<SearchResult>;
}

impl SearchIndex for InvertedIndex {
    fn search(&self, words: &BTreeSet<String>, exact: bool) -> Vec<SearchResult> {
        InvertedIndex::search(self, words, exact)
    }
}

/// [`InvertedIndex`] guarded by a [`ReadWriteLock`]. Every read runs under the
/// read lock and every mutation under the write lock; each public call takes
/// the lock exactly once.
#[derive(Default)]
pub struct ThreadSafeInvertedIndex {
    lock: ReadWriteLock,
    inner: UnsafeCell<InvertedIndex>,
}

// SAFETY: `inner` is only reached through `view` (shared access under the read
// lock) and `update` (exclusive access under the write lock). `update` is
// private and its closures never call back into `self`, so no shared reference
// exists on the writing thread while the `&mut` is alive.
unsafe impl Sync for ThreadSafeInvertedIndex {}

impl ThreadSafeInvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against the index while holding the read lock. Calling a
    /// mutating method of this index from inside `f` deadlocks.
    pub fn view<R>(&self, f: impl FnOnce(&InvertedIndex) -> R) -> R {
        let _guard = self.lock.read();
        // SAFETY: the read lock excludes writers on every other thread, and this
        // thread cannot be inside `update` (see the `Sync` impl).
        f(unsafe { &*self.inner.get() })
    }

    fn update<R>(&self, f: impl FnOnce(&mut InvertedIndex) -> R) -> R {
        let _guard = self.lock.write();
        // SAFETY: the write lock excludes every reader and writer on other threads,
        // and `f` never re-enters `self`.
        f(unsafe { &mut *self.inner.get() })
    }

    pub fn add(&self, word: &str, location: &str, position: usize) {
        self.update(|index| index.add(word, location, position));
    }

    pub fn add_words<S: AsRef<str>>(&self, words: &[S], location: &str) {
        self.update(|index| index.add_words(words, location));
    }

    /// Merges a privately built index under a single write-lock acquisition.
    pub fn add_all(&self, other: InvertedIndex) {
        let words = other.word_len();
        self.update(|index| index.add_all(other));
        tracing::trace!(words, "merged local index");
    }

    pub fn words(&self) -> Vec<String> {
        self.view(|index| index.words().map(str::to_string).collect())
    }

    pub fn locations(&self, word: &str) -> Vec<String> {
        self.view(|index| index.locations(word).map(str::to_string).collect())
    }

    pub fn positions(&self, word: &str, location: &str) -> Vec<usize> {
        self.view(|index| index.positions(word, location).collect())
    }

    pub fn contains_word(&self, word: &str) -> bool {
        self.view(|index| index.contains_word(word))
    }

    pub fn contains_location(&self, word: &str, location: &str) -> bool {
        self.view(|index| index.contains_location(word, location))
    }

    pub fn contains_position(&self, word: &str, location: &str, position: usize) -> bool {
        self.view(|index| index.contains_position(word, location, position))
    }

    pub fn word_len(&self) -> usize {
        self.view(InvertedIndex::word_len)
    }

    pub fn location_len(&self, word: &str) -> usize {
        self.view(|index| index.location_len(word))
    }

    pub fn position_len(&self, word: &str, location: &str) -> usize {
        self.view(|index| index.position_len(word, location))
    }

    pub fn word_count(&self, location: &str) -> usize {
        self.view(|index| index.word_count(location))
    }

    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.view(|index| index.counts().clone())
    }

    /// Number of locations with a recorded word count.
    pub fn location_total(&self) -> usize {
        self.view(|index| index.counts().len())
    }

    pub fn snapshot(&self) -> InvertedIndex {
        self.view(InvertedIndex::clone)
    }

    pub fn into_inner(self) -> InvertedIndex {
        self.inner.into_inner()
    }

    pub fn search(&self, words: &BTreeSet<String>, exact: bool) -> Vec<SearchResult> {
        self.view(|index| index.search(words, exact))
    }

    pub fn exact_search(&self, words: &BTreeSet<String>) -> Vec<SearchResult> {
        self.view(|index| index.exact_search(words))
    }

    pub fn partial_search(&self, words: &BTreeSet<String>) -> Vec<SearchResult> {
        self.view(|index| index.partial_search(words))
    }

    pub fn write_index_json(&self, path: &Path) -> Result<()> {
        self.view(|index| crate::json::write_index(index, path))
    }

    pub fn write_counts_json(&self, path: &Path) -> Result<()> {
        self.view(|index| crate::json::write_counts(index, path))
    }
}

impl From<InvertedIndex> for ThreadSafeInvertedIndex {
    fn from(index: InvertedIndex) -> Self {
        Self { lock: ReadWriteLock::new(), inner: UnsafeCell::new(index) }
    }
}

impl SearchIndex for ThreadSafeInvertedIndex {
    fn search(&self, words: &BTreeSet<String>, exact: bool) -> Vec<SearchResult> {
        ThreadSafeInvertedIndex::search(self, words, exact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn add_tracks_highest_position() {
        let mut index = InvertedIndex::new();
        index.add_words(&["fox", "runs", "fox"], "doc1");
        assert_eq!(index.word_count("doc1"), 3);
        assert_eq!(index.positions("fox", "doc1").collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(index.position_len("runs", "doc1"), 1);
        assert!(index.contains_position("fox", "doc1", 3));
        assert!(!index.contains_position("fox", "doc1", 2));
        assert_eq!(index.word_count("missing"), 0);
    }

    #[test]
    fn duplicate_positions_collapse() {
        let mut index = InvertedIndex::new();
        index.add("a", "x", 2);
        index.add("a", "x", 2);
        index.add("a", "x", 1);
        assert_eq!(index.positions("a", "x").collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(index.word_count("x"), 2);
    }

    #[test]
    fn results_tie_break_on_count_then_location() {
        let mut index = InvertedIndex::new();
        // same score 1/2, different counts
        index.add_words(&["cat", "dog"], "b");
        index.add_words(&["cat", "cat", "dog", "dog"], "a");
        // identical score and count, location decides ignoring case
        index.add_words(&["cat", "dog"], "C");

        let results = index.exact_search(&query(&["cat"]));
        let order: Vec<_> = results.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "C"]);
    }

    #[test]
    fn thread_safe_index_matches_plain_index() {
        let mut plain = InvertedIndex::new();
        plain.add_words(&["hello", "world"], "one");
        let safe = ThreadSafeInvertedIndex::from(plain.clone());
        safe.add("hello", "two", 1);
        plain.add("hello", "two", 1);
        assert_eq!(safe.snapshot(), plain);
        assert_eq!(safe.locations("hello"), vec!["one", "two"]);
        assert_eq!(safe.words(), vec!["hello", "world"]);
        assert_eq!(safe.location_total(), 2);
    }
}
