use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::page::PageId;

pub mod file;
pub mod memory;
pub mod scheduler;

/// A block device abstraction moving exactly one page-sized block per
/// call, addressed by page id.
///
/// The trait is designed as `trait object` compatible so that the disk
/// scheduler can own any implementation behind a `Box<dyn DiskManager>`.
/// Implementations are single-owner: the scheduler's worker thread is
/// the only caller, hence `&mut self` and the `Send` bound without
/// `Sync`.
pub trait DiskManager: Send {
    /// Read the page with the given page id, returning a buffer of
    /// exactly `PAGE_SIZE` bytes. A page that was never written reads
    /// back as zeroes.
    fn read_page(&mut self, page_id: PageId) -> Result<Vec<u8>>;

    /// Write a `PAGE_SIZE` buffer as the page with the given page id,
    /// overwriting the previous contents if any.
    fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<()>;
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskType {
    Memory,
    File,
}

pub fn new_disk_manager(typ: DiskType, path: &str) -> Result<Box<dyn DiskManager>> {
    match typ {
        DiskType::Memory => Ok(Box::new(memory::Memory::new())),
        DiskType::File => Ok(Box::new(file::File::open(path)?)),
    }
}
