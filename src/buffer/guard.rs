use std::sync::{Arc, RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::bufferpool::BufferPoolManager;
use crate::error::Result;
use crate::storage::page::{Page, PageData, PageId};

/// An RAII handle over a pinned page. Construction pins the page
/// through the buffer pool, dropping the guard unpins it, passing
/// along whether the page was written through this guard.
///
/// The guards are a convenience layer on top of fetch/unpin, nothing
/// in the pool depends on them.
pub struct PageGuard {
    pool: BufferPoolManager,
    page: Arc<Page>,
    page_id: PageId,
    dirty: bool,
}

impl PageGuard {
    fn new(pool: BufferPoolManager, page: Arc<Page>) -> Result<PageGuard> {
        let page_id = page.read()?.id;
        Ok(PageGuard { pool, page, page_id, dirty: false })
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Lock the page for reading.
    pub fn read(&self) -> Result<RwLockReadGuard<'_, PageData>> {
        Ok(self.page.read()?)
    }

    /// Lock the page for writing, marking the guard dirty so the
    /// write-back happens on unpin.
    pub fn write(&mut self) -> Result<RwLockWriteGuard<'_, PageData>> {
        self.dirty = true;
        Ok(self.page.write()?)
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        self.pool.unpin_page(self.page_id, self.dirty);
    }
}

/// A pinned page handle that only allows shared reads.
pub struct ReadPageGuard {
    inner: PageGuard,
}

impl ReadPageGuard {
    pub fn page_id(&self) -> PageId {
        self.inner.page_id()
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, PageData>> {
        self.inner.read()
    }
}

/// A pinned page handle that allows exclusive writes.
pub struct WritePageGuard {
    inner: PageGuard,
}

impl WritePageGuard {
    pub fn page_id(&self) -> PageId {
        self.inner.page_id()
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, PageData>> {
        self.inner.read()
    }

    pub fn write(&mut self) -> Result<RwLockWriteGuard<'_, PageData>> {
        self.inner.write()
    }
}

impl BufferPoolManager {
    /// Fetch a page wrapped in a basic guard that unpins on drop.
    pub fn fetch_page_basic(&self, page_id: PageId) -> Result<PageGuard> {
        let page = self.fetch_page(page_id)?;
        PageGuard::new(self.clone(), page)
    }

    /// Fetch a page wrapped in a read-only guard.
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<ReadPageGuard> {
        let guard = self.fetch_page_basic(page_id)?;
        Ok(ReadPageGuard { inner: guard })
    }

    /// Fetch a page wrapped in a writable guard.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<WritePageGuard> {
        let guard = self.fetch_page_basic(page_id)?;
        Ok(WritePageGuard { inner: guard })
    }

    /// Create a new page wrapped in a writable guard.
    pub fn new_page_guarded(&self) -> Result<WritePageGuard> {
        let page = self.new_page()?;
        let guard = PageGuard::new(self.clone(), page)?;
        Ok(WritePageGuard { inner: guard })
    }
}
