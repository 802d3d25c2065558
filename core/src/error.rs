use thiserror::Error;

/// Misuse of a [`ReadWriteLock`](crate::lock::ReadWriteLock). These are programming
/// errors in the caller, never transient conditions.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    #[error("release_read called with no active reader")]
    NoReader,
    #[error("release_write called with no active writer")]
    NoWriter,
    #[error("release_write called by a thread that does not hold the write lock")]
    WrongWriter,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("work queue has been shut down")]
    Shutdown,
}
