//! Reader-writer lock with a re-entrant writer.
//!
//! Any number of readers may hold the lock at once, or a single writer. The
//! thread holding the write lock may acquire the write lock again and may also
//! take the read lock without blocking. The lock makes no fairness promise: a
//! steady stream of readers can starve a waiting writer and vice versa.
//!
//! A thread holding only the read lock must not ask for the write lock; that
//! upgrade waits on itself forever.

use crate::error::LockError;
use parking_lot::{Condvar, Mutex};
use std::marker::PhantomData;
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct State {
    readers: usize,
    writers: usize,
    active_writer: Option<ThreadId>,
}

impl State {
    fn owned_by(&self, id: ThreadId) -> bool {
        self.active_writer == Some(id)
    }
}

#[derive(Debug, Default)]
pub struct ReadWriteLock {
    state: Mutex<State>,
    changed: Condvar,
}

impl ReadWriteLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read acquisitions currently outstanding.
    pub fn readers(&self) -> usize {
        self.state.lock().readers
    }

    /// Number of write acquisitions currently outstanding (all by the same thread).
    pub fn writers(&self) -> usize {
        self.state.lock().writers
    }

    /// Whether the calling thread holds the write lock.
    pub fn is_active_writer(&self) -> bool {
        self.state.lock().owned_by(thread::current().id())
    }

    /// Blocks while another thread holds the write lock, then registers a reader.
    pub fn acquire_read(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        while state.writers > 0 && !state.owned_by(me) {
            tracing::trace!("waiting for read lock");
            self.changed.wait(&mut state);
        }
        state.readers += 1;
        tracing::trace!(readers = state.readers, "acquired read lock");
    }

    pub fn release_read(&self) -> Result<(), LockError> {
        let mut state = self.state.lock();
        if state.readers == 0 {
            return Err(LockError::NoReader);
        }
        state.readers -= 1;
        if state.readers == 0 {
            self.changed.notify_all();
        }
        Ok(())
    }

    /// Blocks while any reader or writer other than the calling thread holds the
    /// lock, then registers the calling thread as the active writer.
    pub fn acquire_write(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        while (state.writers > 0 || state.readers > 0) && !state.owned_by(me) {
            tracing::trace!(readers = state.readers, writers = state.writers, "waiting for write lock");
            self.changed.wait(&mut state);
        }
        state.writers += 1;
        state.active_writer = Some(me);
        tracing::trace!(writers = state.writers, "acquired write lock");
    }

    pub fn release_write(&self) -> Result<(), LockError> {
        let mut state = self.state.lock();
        if state.writers == 0 {
            return Err(LockError::NoWriter);
        }
        if !state.owned_by(thread::current().id()) {
            return Err(LockError::WrongWriter);
        }
        state.writers -= 1;
        if state.writers == 0 {
            state.active_writer = None;
            self.changed.notify_all();
        }
        tracing::trace!(writers = state.writers, "released write lock");
        Ok(())
    }

    /// Acquires the read lock for the lifetime of the returned guard.
    pub fn read(&self) -> ReadGuard<'_> {
        self.acquire_read();
        ReadGuard { lock: self, _thread_bound: PhantomData }
    }

    /// Acquires the write lock for the lifetime of the returned guard.
    pub fn write(&self) -> WriteGuard<'_> {
        self.acquire_write();
        WriteGuard { lock: self, _thread_bound: PhantomData }
    }
}

/// Releases one read acquisition on drop. Not `Send`: it must be dropped on the
/// thread that acquired it.
#[must_use = "the read lock is released as soon as the guard is dropped"]
pub struct ReadGuard<'a> {
    lock: &'a ReadWriteLock,
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.lock.release_read() {
            tracing::error!(%err, "read guard released an unheld lock");
        }
    }
}

/// Releases one write acquisition on drop. Not `Send` for the same reason as
/// [`ReadGuard`].
#[must_use = "the write lock is released as soon as the guard is dropped"]
pub struct WriteGuard<'a> {
    lock: &'a ReadWriteLock,
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.lock.release_write() {
            tracing::error!(%err, "write guard released an unheld lock");
        }
    }
}
