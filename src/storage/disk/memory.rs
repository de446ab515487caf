use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::storage::disk::DiskManager;
use crate::storage::page::{PageId, PAGE_SIZE};

/// An in-memory disk manager keeping pages in a BTreeMap, for tests
/// and ephemeral pools.
pub struct Memory {
    pages: BTreeMap<PageId, Vec<u8>>,
}

impl Memory {
    pub fn new() -> Memory {
        Memory { pages: BTreeMap::new() }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new()
    }
}

impl DiskManager for Memory {
    fn read_page(&mut self, page_id: PageId) -> Result<Vec<u8>> {
        if page_id < 0 {
            return Err(Error::invalid_input(format!("invalid page id {}", page_id)));
        }
        let page = self.pages.get(&page_id);
        Ok(page.cloned().unwrap_or_else(|| vec![0; PAGE_SIZE]))
    }

    fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        if page_id < 0 {
            return Err(Error::invalid_input(format!("invalid page id {}", page_id)));
        }
        if data.len() != PAGE_SIZE {
            return Err(Error::invalid_input(format!(
                "page buffer is {} bytes, want {}",
                data.len(),
                PAGE_SIZE
            )));
        }
        self.pages.insert(page_id, data.to_vec());
        Ok(())
    }
}
