use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use log::debug;

use crate::buffer::replacer::{AccessType, Replacer, SyncLRUKReplacer};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::disk::scheduler::DiskScheduler;
use crate::storage::disk::{new_disk_manager, DiskManager};
use crate::storage::page::{FrameId, Page, PageId, PAGE_SIZE};

/// The buffer pool is responsible for moving physical pages back and forth
/// from main memory to disk. It allows a DBMS to support databases that are
/// larger than the amount of memory available to the system.
///
/// The buffer pool's operations are transparent to other parts in the system.
/// For example, the system asks the buffer pool for a page using its unique
/// identifier (page_id) and it does not know whether that page is already in
/// memory or whether the system has to retrieve it from disk.
struct BufferPool {
    pool_size: usize,
    /// the disk scheduler serializing all page I/O onto one worker.
    scheduler: DiskScheduler,
    /// array of buffer pool pages. use the array index as
    /// FrameId, i.e., the FrameId is in range: [0, pool_size).
    pages: Vec<Arc<Page>>,
    /// page table for keeping track of buffer pool pages.
    page_table: HashMap<PageId, FrameId>,
    /// frames that don't have any pages on them, consumed from the front.
    free_list: VecDeque<FrameId>,
    /// Replacer to find unpinned frames for replacement.
    replacer: Arc<dyn Replacer>,
    /// The next page id to be allocated. In-memory only, page id
    /// allocation does not survive a restart.
    next_page_id: PageId,
}

impl BufferPool {
    fn new(disk: Box<dyn DiskManager>, pool_size: usize, replacer_k: usize) -> Self {
        let mut pages = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);
        let page_table = HashMap::new();
        let replacer: Arc<dyn Replacer> = Arc::new(SyncLRUKReplacer::new(replacer_k, pool_size));
        let scheduler = DiskScheduler::new(disk);
        for i in 0..pool_size {
            pages.push(Arc::new(Page::new()));
            // initially, every frame is in the free list
            free_list.push_back(i);
        }
        BufferPool { pool_size, scheduler, pages, page_table, free_list, replacer, next_page_id: 0 }
    }

    /// Find a frame whose slot can take a new page: the free list is
    /// consulted first, then the replacer picks an eviction victim. A
    /// victim with a dirty page is flushed before its slot is handed
    /// out, and its page is unlinked from the page table.
    ///
    /// Fails with PoolNoAvailableFrame when every frame is pinned.
    fn acquire_frame(&mut self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.pop_front() {
            return Ok(frame_id);
        }
        let frame_id = match self.replacer.evict() {
            Some(frame_id) => frame_id,
            None => return Err(Error::PoolNoAvailableFrame),
        };
        let page = Arc::clone(&self.pages[frame_id]);
        let mut guard = page.write()?;
        debug!("evicting page {} from frame {}", guard.id, frame_id);
        if guard.is_dirty {
            if let Err(err) = self.scheduler.write_page_sync(guard.id, guard.data.clone()) {
                // evict() already dropped the frame's tracking node; the
                // page is still resident, so re-register the frame with
                // the replacer or no future acquisition could select it.
                self.replacer.record_access(frame_id, AccessType::Unknown);
                self.replacer.set_evictable(frame_id, true);
                return Err(err);
            }
        }
        self.page_table.remove(&guard.id);
        guard.clear();
        Ok(frame_id)
    }

    /// Create a new page in the buffer pool, pinned with an initial pin
    /// count of 1 and a zeroed buffer. Fails with PoolNoAvailableFrame
    /// if all frames are currently in use and not evictable(in another
    /// word, pinned).
    fn new_page(&mut self) -> Result<Arc<Page>> {
        let frame_id = self.acquire_frame()?;
        let page_id = self.allocate_page();

        let page = Arc::clone(&self.pages[frame_id]);
        let mut guard = page.write()?;
        // the frame buffer is zeroed, either freshly allocated or reset
        // by acquire_frame.
        guard.id = page_id;
        guard.pin_count = 1;
        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id, AccessType::Unknown);
        self.replacer.set_evictable(frame_id, false);

        drop(guard);
        Ok(page)
    }

    /// Fetch the requested page with the given page id from the buffer pool,
    /// reading it from disk when it is not resident. The returned page is
    /// pinned. Fails with PoolNoAvailableFrame if the page would need a frame
    /// but all frames are currently in use and not evictable(in other words,
    /// pinned).
    fn fetch_page(&mut self, page_id: PageId, access_type: AccessType) -> Result<Arc<Page>> {
        // check if the page table has the page id
        if let Some(&frame_id) = self.page_table.get(&page_id) {
            // we have the page frame in buffer pool already,
            // increase pin count, record frame access then
            // return it.
            let page = Arc::clone(&self.pages[frame_id]);
            let mut guard = page.write()?;
            guard.pin_count += 1;
            self.replacer.record_access(frame_id, access_type);
            self.replacer.set_evictable(frame_id, false);

            drop(guard);
            return Ok(page);
        }

        let frame_id = self.acquire_frame()?;
        // read the page through the scheduler while holding the pool
        // latch; on failure the frame goes back to the free list so the
        // pool stays balanced.
        let data = match self.scheduler.read_page_sync(page_id) {
            Ok(data) => data,
            Err(err) => {
                self.free_list.push_back(frame_id);
                return Err(err);
            }
        };
        if data.len() != PAGE_SIZE {
            self.free_list.push_back(frame_id);
            return Err(Error::internal(format!(
                "disk manager returned {} bytes for page {}, want {}",
                data.len(),
                page_id,
                PAGE_SIZE
            )));
        }

        let page = Arc::clone(&self.pages[frame_id]);
        let mut guard = page.write()?;
        guard.id = page_id;
        guard.pin_count = 1;
        guard.data.copy_from_slice(&data);
        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id, access_type);
        self.replacer.set_evictable(frame_id, false);

        drop(guard);
        Ok(page)
    }

    /// Unpin the target page from the buffer pool. If page_id is not in the
    /// buffer pool or its pin count is already 0, return false.
    ///
    /// Decrement the pin count of a page. If the pin count reaches 0, the
    /// frame becomes evictable by the replacer. The dirty flag is OR-ed with
    /// the incoming one, an unpin can never clean a dirty page.
    fn unpin_page(&mut self, page_id: PageId, is_dirty: bool) -> bool {
        let frame_id = match self.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return false,
        };
        let page = &self.pages[frame_id];
        let mut guard = page.write().unwrap();
        if guard.pin_count == 0 {
            return false;
        }
        guard.is_dirty |= is_dirty;
        guard.pin_count -= 1;
        if guard.pin_count == 0 {
            self.replacer.set_evictable(frame_id, true);
        }
        true
    }

    /// Flush the target page to disk regardless of the dirty flag and unset
    /// the dirty flag after flushing. Pin count and evictability are left
    /// untouched, a pinned page can be flushed.
    ///
    /// Return false if the page cannot be found in the page table, true
    /// otherwise.
    fn flush_page(&mut self, page_id: PageId) -> Result<bool> {
        let frame_id = match self.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return Ok(false),
        };
        let page = &self.pages[frame_id];
        let mut guard = page.write()?;

        self.scheduler.write_page_sync(guard.id, guard.data.clone())?;
        guard.is_dirty = false;

        Ok(true)
    }

    /// Flush all the pages in the buffer pool to disk.
    fn flush_all_pages(&mut self) -> Result<()> {
        for (_, &frame_id) in self.page_table.iter() {
            let page = &self.pages[frame_id];
            let mut guard = page.write()?;

            self.scheduler.write_page_sync(guard.id, guard.data.clone())?;
            guard.is_dirty = false;
        }
        Ok(())
    }

    /// Delete a page from the buffer pool. If the page is not in the buffer
    /// pool there is nothing to do, return true. If the page is pinned and
    /// cannot be deleted, return false immediately.
    ///
    /// A dirty page is flushed before its frame is freed. After unlinking the
    /// page from the page table, stop tracking the frame in the replacer and
    /// add the frame back to the free list, with its memory and metadata
    /// reset.
    fn delete_page(&mut self, page_id: PageId) -> Result<bool> {
        let frame_id = match self.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return Ok(true),
        };
        let page = Arc::clone(&self.pages[frame_id]);
        let mut guard = page.write()?;
        if guard.pin_count > 0 {
            return Ok(false);
        }
        if guard.is_dirty {
            self.scheduler.write_page_sync(guard.id, guard.data.clone())?;
        }
        self.page_table.remove(&page_id);
        // the pin count is zero, so the frame is evictable and remove
        // cannot panic.
        self.replacer.remove(frame_id);
        guard.clear();
        self.free_list.push_back(frame_id);

        Ok(true)
    }

    fn allocate_page(&mut self) -> PageId {
        let page_id = self.next_page_id;
        self.next_page_id += 1;
        page_id
    }
}

/// Buffer pool manager wrap buffer pool with a mutex for concurrent access,
/// basically all the heavy lifting happens in the buffer pool.
///
/// The mutex is coarse: it covers the page table, the free list, frame
/// metadata and the calls into the replacer, and is held across the
/// synchronous disk waits. Lock order is pool then replacer, the replacer
/// never calls back into the pool.
#[derive(Clone)]
pub struct BufferPoolManager {
    /// hold the actual buffer pool protected by a mutex latch.
    /// TODO: we need more granularity concurrency control instead
    ///  of having this mutex latch all the operations.
    inner: Arc<Mutex<BufferPool>>,
}

impl BufferPoolManager {
    pub fn new(disk: Box<dyn DiskManager>, pool_size: usize, replacer_k: usize) -> Self {
        let inner = BufferPool::new(disk, pool_size, replacer_k);
        BufferPoolManager { inner: Arc::new(Mutex::new(inner)) }
    }

    /// Build a buffer pool manager from configuration, creating the
    /// disk manager the config names.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let disk = new_disk_manager(cfg.disk_type, &cfg.path)?;
        Ok(BufferPoolManager::new(disk, cfg.pool_size, cfg.replacer_k))
    }

    /// Create a new page in the buffer pool. The returned page is pinned
    /// with its buffer zeroed; the caller must eventually unpin it.
    pub fn new_page(&self) -> Result<Arc<Page>> {
        let mut inner = self.inner.lock()?;
        let page = inner.new_page()?;
        Ok(page)
    }

    /// Fetch the requested page with the given page id from the buffer pool.
    /// The returned page is pinned; the caller must eventually unpin it.
    pub fn fetch_page(&self, page_id: PageId) -> Result<Arc<Page>> {
        self.fetch_page_with(page_id, AccessType::Unknown)
    }

    /// Fetch the requested page, recording the given access type with the
    /// replacer.
    pub fn fetch_page_with(&self, page_id: PageId, access_type: AccessType) -> Result<Arc<Page>> {
        let mut inner = self.inner.lock()?;
        let page = inner.fetch_page(page_id, access_type)?;
        Ok(page)
    }

    /// Unpin the target page from the buffer pool. If page_id is not in the
    /// buffer pool or its pin count is already 0, return false.
    ///
    /// Decrement the pin count of a page. If the pin count reaches 0, the
    /// frame becomes evictable by the replacer. Also, set the dirty flag on
    /// the page to indicate if the page was modified.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.unpin_page(page_id, is_dirty)
    }

    /// Flush the target page to disk regardless of the dirty flag and unset
    /// the dirty flag after flushing.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.inner.lock()?;
        inner.flush_page(page_id)
    }

    /// Flush all the pages in the buffer pool to disk.
    pub fn flush_all_pages(&self) -> Result<()> {
        let mut inner = self.inner.lock()?;
        inner.flush_all_pages()
    }

    /// Delete a page from the buffer pool. If the page is not in the buffer
    /// pool there is nothing to do, return true. If the page is pinned and
    /// cannot be deleted, return false immediately.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.inner.lock()?;
        inner.delete_page(page_id)
    }

    /// Number of frames the pool manages.
    pub fn pool_size(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.pool_size
    }

    /// Number of frames currently on the free list.
    pub fn free_frame_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.free_list.len()
    }

    /// Number of pages currently resident in the pool.
    pub fn resident_page_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.page_table.len()
    }
}
