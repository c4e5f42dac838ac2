// src/core/lock.rs

use parking_lot::lock_api::RawRwLock as _;
use parking_lot::RawRwLock;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::DafError;

static NEXT_LOCK_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    // per-thread nesting depths, keyed by lock id
    static LOCK_DEPTHS: RefCell<HashMap<usize, Depths>> = RefCell::new(HashMap::new());
}

#[derive(Debug, Clone, Copy, Default)]
struct Depths {
    read: usize,
    write: usize,
}

/// Reentrant readers-writer lock guarding one dataset.
///
/// Any number of threads may hold the read lock together; the write lock is
/// exclusive. A thread holding the write lock may nest further write and
/// read acquisitions; the OS primitive is touched only at the outermost
/// level. Upgrading (asking for write while holding only read) is a
/// programming error and fails with `LockMisuse`, as does an unmatched
/// unlock.
pub struct DafLock {
    id: usize,
    name: String,
    raw: RawRwLock,
}

impl std::fmt::Debug for DafLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DafLock")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl DafLock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NEXT_LOCK_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            raw: RawRwLock::INIT,
        }
    }

    fn depths(&self) -> Depths {
        LOCK_DEPTHS.with(|map| map.borrow().get(&self.id).copied().unwrap_or_default())
    }

    fn update_depths(&self, depths: Depths) {
        LOCK_DEPTHS.with(|map| {
            let mut map = map.borrow_mut();
            if depths.read == 0 && depths.write == 0 {
                map.remove(&self.id);
            } else {
                map.insert(self.id, depths);
            }
        });
    }

    /// Whether the current thread holds the read lock (possibly nested under
    /// a write lock).
    pub fn has_read_lock(&self) -> bool {
        self.depths().read > 0
    }

    /// Whether the current thread holds the write lock.
    pub fn has_write_lock(&self) -> bool {
        self.depths().write > 0
    }

    /// Acquires the read lock, blocking while another thread holds the write
    /// lock. Reentrant, and legal while the same thread holds the write
    /// lock.
    pub fn lock_read(&self) {
        let mut depths = self.depths();
        if depths.read == 0 && depths.write == 0 {
            self.raw.lock_shared();
        }
        depths.read += 1;
        self.update_depths(depths);
    }

    pub fn unlock_read(&self) -> Result<(), DafError> {
        let mut depths = self.depths();
        if depths.read == 0 {
            return Err(DafError::LockMisuse {
                message: format!(
                    "unlocking a read lock which is not locked on the daf data: {}",
                    self.name
                ),
            });
        }
        depths.read -= 1;
        if depths.read == 0 && depths.write == 0 {
            // owned by this thread per the depth bookkeeping above
            unsafe { self.raw.unlock_shared() };
        }
        self.update_depths(depths);
        Ok(())
    }

    /// Acquires the write lock, blocking while any other thread holds any
    /// lock. Reentrant for a thread already holding the write lock;
    /// upgrading from a read-only hold is refused.
    pub fn lock_write(&self) -> Result<(), DafError> {
        let mut depths = self.depths();
        if depths.write == 0 && depths.read > 0 {
            return Err(DafError::LockMisuse {
                message: format!(
                    "obtaining a write lock while holding a read lock on the daf data: {}",
                    self.name
                ),
            });
        }
        if depths.write == 0 {
            self.raw.lock_exclusive();
        }
        depths.write += 1;
        self.update_depths(depths);
        Ok(())
    }

    pub fn unlock_write(&self) -> Result<(), DafError> {
        let mut depths = self.depths();
        if depths.write == 0 {
            return Err(DafError::LockMisuse {
                message: format!(
                    "unlocking a write lock which is not locked on the daf data: {}",
                    self.name
                ),
            });
        }
        if depths.write == 1 && depths.read > 0 {
            return Err(DafError::LockMisuse {
                message: format!(
                    "unlocking a write lock while nested read locks are still held on the daf data: {}",
                    self.name
                ),
            });
        }
        depths.write -= 1;
        if depths.write == 0 {
            // owned by this thread per the depth bookkeeping above
            unsafe { self.raw.unlock_exclusive() };
        }
        self.update_depths(depths);
        Ok(())
    }

    /// RAII read guard; released on drop along every exit path.
    pub fn read(&self) -> ReadGuard<'_> {
        self.lock_read();
        ReadGuard { lock: self }
    }

    /// RAII write guard; released on drop along every exit path.
    pub fn write(&self) -> Result<WriteGuard<'_>, DafError> {
        self.lock_write()?;
        Ok(WriteGuard { lock: self })
    }

    /// Runs `action` under the read lock, releasing it on success, error and
    /// panic alike.
    pub fn with_read_lock<R>(
        &self,
        action: impl FnOnce() -> Result<R, DafError>,
    ) -> Result<R, DafError> {
        let _guard = self.read();
        action()
    }

    /// Runs `action` under the write lock, releasing it on success, error
    /// and panic alike.
    pub fn with_write_lock<R>(
        &self,
        action: impl FnOnce() -> Result<R, DafError>,
    ) -> Result<R, DafError> {
        let _guard = self.write()?;
        action()
    }
}

pub struct ReadGuard<'a> {
    lock: &'a DafLock,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        let _ = self.lock.unlock_read();
    }
}

pub struct WriteGuard<'a> {
    lock: &'a DafLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        let _ = self.lock.unlock_write();
    }
}
