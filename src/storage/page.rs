use std::ops::Deref;
use std::sync::RwLock;

/// Identifier of a logical page. A page resides in at most one frame
/// at a time.
pub type PageId = i64;

/// Index of a frame in the buffer pool's frame array, dense in
/// `[0, pool_size)`. A frame's identity is its index.
pub type FrameId = usize;

/// Size of a page in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Sentinel page id of a frame that holds no page.
pub const INVALID_PAGE_ID: PageId = -1;

/// The actual page data that include in-memory metadata like the dirty
/// bit and pin count etc. and the fixed-size byte buffer backing the
/// data on storage.
pub struct PageData {
    pub id: PageId,
    pub data: Vec<u8>,
    /// True iff the buffer was modified since it was loaded or last
    /// flushed.
    pub is_dirty: bool,
    /// Number of active borrowers. A page with a non-zero pin count
    /// must not be evicted.
    pub pin_count: u32,
}

impl PageData {
    fn new() -> Self {
        Self {
            id: INVALID_PAGE_ID,
            data: vec![0; PAGE_SIZE],
            is_dirty: false,
            pin_count: 0,
        }
    }

    /// Reset the metadata and zero the buffer.
    pub fn clear(&mut self) {
        self.id = INVALID_PAGE_ID;
        self.is_dirty = false;
        self.pin_count = 0;
        self.data.fill(0);
    }
}

/// Page act as the container of the actual page data for providing
/// concurrent access protection.
pub struct Page {
    inner: RwLock<PageData>,
}

impl Page {
    /// Allocate a page in memory with the given PAGE_SIZE and init
    /// the metadata accordingly.
    pub fn new() -> Self {
        Page { inner: RwLock::new(PageData::new()) }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new()
    }
}

impl Deref for Page {
    type Target = RwLock<PageData>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    #[test]
    fn test_page_clear() -> Result<()> {
        let page = Page::new();
        let mut guard = page.write()?;
        assert_eq!(PAGE_SIZE, guard.data.len());

        guard.id = 42;
        guard.pin_count = 3;
        guard.is_dirty = true;
        guard.data[0] = 0xab;

        guard.clear();
        assert_eq!(INVALID_PAGE_ID, guard.id);
        assert_eq!(0, guard.pin_count);
        assert_eq!(false, guard.is_dirty);
        assert_eq!(PAGE_SIZE, guard.data.len());
        assert!(guard.data.iter().all(|&b| b == 0));
        Ok(())
    }
}
