use std::sync::mpsc;
use std::thread;

use log::error;

use crate::error::Result;
use crate::storage::disk::DiskManager;
use crate::storage::page::PageId;

/// A single disk I/O request. Each variant carries a completion sender,
/// the write-once signal the requester blocks on; the worker completes
/// every request exactly once, with the outcome of the disk call.
pub enum DiskRequest {
    /// Read a page, completing with its contents.
    Read(PageId, mpsc::Sender<Result<Vec<u8>>>),
    /// Write a buffer as a page, completing when the write finished.
    Write(PageId, Vec<u8>, mpsc::Sender<Result<()>>),
}

/// DiskScheduler serializes page I/O onto a single background worker
/// thread that owns the disk manager. Requests are processed strictly
/// in the order they were scheduled.
///
/// Dropping the scheduler enqueues a shutdown sentinel behind any
/// pending requests, so pending I/O completes before the worker is
/// joined.
pub struct DiskScheduler {
    queue: mpsc::Sender<Option<DiskRequest>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl DiskScheduler {
    pub fn new(mut disk: Box<dyn DiskManager>) -> DiskScheduler {
        let (queue, requests) = mpsc::channel::<Option<DiskRequest>>();
        let worker = thread::spawn(move || {
            // exit on the None sentinel or a disconnected queue,
            // whichever comes first.
            while let Ok(Some(request)) = requests.recv() {
                match request {
                    DiskRequest::Read(page_id, done) => {
                        let result = disk.read_page(page_id);
                        if let Err(err) = &result {
                            error!("disk read of page {} failed: {}", page_id, err);
                        }
                        // the requester may have given up on the reply.
                        let _ = done.send(result);
                    }
                    DiskRequest::Write(page_id, data, done) => {
                        let result = disk.write_page(page_id, &data);
                        if let Err(err) = &result {
                            error!("disk write of page {} failed: {}", page_id, err);
                        }
                        let _ = done.send(result);
                    }
                }
            }
        });
        DiskScheduler { queue, worker: Some(worker) }
    }

    /// Enqueue a request for the worker. Non-blocking.
    pub fn schedule(&self, request: DiskRequest) -> Result<()> {
        self.queue.send(Some(request))?;
        Ok(())
    }

    /// Schedule a read and block until the worker completes it.
    pub fn read_page_sync(&self, page_id: PageId) -> Result<Vec<u8>> {
        let (done, completion) = mpsc::channel();
        self.schedule(DiskRequest::Read(page_id, done))?;
        completion.recv()?
    }

    /// Schedule a write and block until the worker completes it.
    pub fn write_page_sync(&self, page_id: PageId, data: Vec<u8>) -> Result<()> {
        let (done, completion) = mpsc::channel();
        self.schedule(DiskRequest::Write(page_id, data, done))?;
        completion.recv()?
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        let _ = self.queue.send(None);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::disk::memory::Memory;
    use crate::storage::page::PAGE_SIZE;

    #[test]
    fn test_scheduler_write_then_read() -> Result<()> {
        let scheduler = DiskScheduler::new(Box::new(Memory::new()));

        let mut data = vec![0; PAGE_SIZE];
        data[..5].copy_from_slice(b"pages");
        scheduler.write_page_sync(3, data.clone())?;
        assert_eq!(data, scheduler.read_page_sync(3)?);

        // an untouched page reads back as zeroes.
        assert_eq!(vec![0; PAGE_SIZE], scheduler.read_page_sync(4)?);
        Ok(())
    }

    #[test]
    fn test_scheduler_fifo_completion() -> Result<()> {
        let scheduler = DiskScheduler::new(Box::new(Memory::new()));

        // schedule a burst of writes to the same page without waiting,
        // then read it back: the last scheduled write must win.
        let mut completions = Vec::new();
        for i in 0..10u8 {
            let mut data = vec![0; PAGE_SIZE];
            data[0] = i;
            let (done, completion) = mpsc::channel();
            scheduler.schedule(DiskRequest::Write(0, data, done))?;
            completions.push(completion);
        }
        for completion in completions {
            completion.recv()??;
        }
        let page = scheduler.read_page_sync(0)?;
        assert_eq!(9, page[0]);
        Ok(())
    }

    #[test]
    fn test_scheduler_drop_drains_pending_writes() -> Result<()> {
        let mut path = std::env::temp_dir();
        path.push("pagebox_scheduler_drain.db");
        let _ = std::fs::remove_file(&path);

        let mut data = vec![0; PAGE_SIZE];
        data[..4].copy_from_slice(b"late");
        {
            let scheduler =
                DiskScheduler::new(Box::new(crate::storage::disk::file::File::open(&path)?));
            // fire and forget, drop immediately after.
            let (done, _completion) = mpsc::channel();
            scheduler.schedule(DiskRequest::Write(1, data.clone(), done))?;
        }

        // the sentinel is queued behind the write, so the page is durable.
        let mut disk = crate::storage::disk::file::File::open(&path)?;
        assert_eq!(data, disk.read_page(1)?);

        let _ = std::fs::remove_file(&path);
        Ok(())
    }
}
