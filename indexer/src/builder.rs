use anyhow::{bail, Result};
use search_core::tokenizer::stems;
use search_core::{InvertedIndex, ThreadSafeInvertedIndex, WorkQueue};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

pub fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt") || ext.eq_ignore_ascii_case("text"))
}

/// Every `.txt`/`.text` file below `root`, sorted.
pub fn text_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(%err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_text_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// A directory expands to its text files; any other existing path is indexed as is.
pub fn inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_dir() {
        Ok(text_files(path))
    } else if path.exists() {
        Ok(vec![path.to_path_buf()])
    } else {
        bail!("no such file or directory: {}", path.display())
    }
}

/// Adds the stems of `path` to `index`, numbering them from 1 across all lines.
/// The location is the path as given.
pub fn process_file(path: &Path, index: &mut InvertedIndex) -> Result<()> {
    let location = path.to_string_lossy();
    let reader = BufReader::new(File::open(path)?);
    let mut position = 0;
    for line in reader.lines() {
        for word in stems(&line?) {
            position += 1;
            index.add(&word, &location, position);
        }
    }
    Ok(())
}

pub trait Builder {
    /// Indexes `path` (file or directory) and returns the number of files visited.
    fn build(&mut self, path: &Path) -> Result<usize>;
}

/// Builds on the calling thread.
pub struct IndexBuilder<'a> {
    index: &'a mut InvertedIndex,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(index: &'a mut InvertedIndex) -> Self {
        Self { index }
    }
}

impl Builder for IndexBuilder<'_> {
    fn build(&mut self, path: &Path) -> Result<usize> {
        let files = inputs(path)?;
        for file in &files {
            if let Err(err) = process_file(file, self.index) {
                tracing::warn!(file = %file.display(), %err, "unable to read file");
            }
        }
        tracing::info!(files = files.len(), words = self.index.word_len(), "index built");
        Ok(files.len())
    }
}

/// One task per file; each task fills a private index and merges it once.
pub struct MultiThreadIndexBuilder {
    index: Arc<ThreadSafeInvertedIndex>,
    queue: Arc<WorkQueue>,
}

impl MultiThreadIndexBuilder {
    pub fn new(index: Arc<ThreadSafeInvertedIndex>, queue: Arc<WorkQueue>) -> Self {
        Self { index, queue }
    }
}

impl Builder for MultiThreadIndexBuilder {
    fn build(&mut self, path: &Path) -> Result<usize> {
        let files = inputs(path)?;
        for file in files.iter().cloned() {
            let index = Arc::clone(&self.index);
            self.queue.submit(move || {
                let mut local = InvertedIndex::new();
                if let Err(err) = process_file(&file, &mut local) {
                    tracing::warn!(file = %file.display(), %err, "unable to read file");
                }
                index.add_all(local);
            })?;
        }
        self.queue.await_idle();
        tracing::info!(files = files.len(), words = self.index.word_len(), "index built");
        Ok(files.len())
    }
}
