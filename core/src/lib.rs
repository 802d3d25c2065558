pub mod error;
pub mod index;
pub mod json;
pub mod lock;
pub mod queue;
pub mod searcher;
pub mod tokenizer;

pub use error::{LockError, QueueError};
pub use index::{InvertedIndex, SearchIndex, SearchResult, ThreadSafeInvertedIndex};
pub use lock::ReadWriteLock;
pub use queue::WorkQueue;
pub use searcher::{MultiThreadSearcher, QueryResults, Searcher, WordSearcher};
