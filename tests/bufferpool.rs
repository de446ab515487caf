use std::fs;
use std::thread;

use rand::prelude::*;

use pagebox::buffer::bufferpool::BufferPoolManager;
use pagebox::error::{Error, Result};
use pagebox::storage::disk::{new_disk_manager, DiskType};
use pagebox::storage::page::{PageId, PAGE_SIZE};

fn temp_path(name: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("pagebox_it_{}.db", name));
    let _ = fs::remove_file(&path);
    path
}

#[test]
fn test_file_backed_round_trip() -> Result<()> {
    let path = temp_path("round_trip");
    let pool_size = 4;

    // write a distinct pattern into more pages than the pool holds, so
    // some of them round-trip through eviction along the way.
    let page_count: PageId = 16;
    {
        let disk = new_disk_manager(DiskType::File, path.to_str().unwrap())?;
        let bpm = BufferPoolManager::new(disk, pool_size, 2);
        for want in 0..page_count {
            let page = bpm.new_page()?;
            let mut guard = page.write()?;
            assert_eq!(want, guard.id);
            for (i, b) in guard.data.iter_mut().enumerate() {
                *b = (i as PageId + want) as u8;
            }
            drop(guard);
            assert_eq!(true, bpm.unpin_page(want, true));
        }
        bpm.flush_all_pages()?;
    }

    // a fresh pool over the same file sees every page.
    let disk = new_disk_manager(DiskType::File, path.to_str().unwrap())?;
    let bpm = BufferPoolManager::new(disk, pool_size, 2);
    for id in 0..page_count {
        let page = bpm.fetch_page(id)?;
        let guard = page.read()?;
        assert_eq!(PAGE_SIZE, guard.data.len());
        for (i, &b) in guard.data.iter().enumerate() {
            assert_eq!((i as PageId + id) as u8, b, "page {} byte {}", id, i);
        }
        drop(guard);
        assert_eq!(true, bpm.unpin_page(id, false));
    }

    let _ = fs::remove_file(&path);
    Ok(())
}

#[test]
fn test_concurrent_random_workload() -> Result<()> {
    let pool_size = 10;
    let threads = 8u64;
    let ops_per_thread = 1000;

    let disk = new_disk_manager(DiskType::Memory, "")?;
    let bpm = BufferPoolManager::new(disk, pool_size, 2);

    // seed some pages so fetches have something to hit from the start.
    let mut seeded = Vec::new();
    for _ in 0..pool_size {
        let page = bpm.new_page()?;
        let id = page.read()?.id;
        seeded.push(id);
        assert_eq!(true, bpm.unpin_page(id, false));
    }

    let mut handles = Vec::new();
    for seed in 0..threads {
        let bpm = bpm.clone();
        let known = seeded.clone();
        handles.push(thread::spawn(move || -> Result<()> {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut known = known;
            for _ in 0..ops_per_thread {
                match rng.gen_range(0..4) {
                    0 => {
                        // create a page, scribble on it, release it.
                        match bpm.new_page() {
                            Ok(page) => {
                                let id = {
                                    let mut guard = page.write()?;
                                    let id = guard.id;
                                    guard.data[0] = id as u8;
                                    id
                                };
                                known.push(id);
                                assert!(bpm.unpin_page(id, true));
                            }
                            Err(Error::PoolNoAvailableFrame) => {}
                            Err(err) => return Err(err),
                        }
                    }
                    1 | 2 => {
                        // fetch a known page and release it with a paired unpin.
                        let id = known[rng.gen_range(0..known.len())];
                        match bpm.fetch_page(id) {
                            Ok(page) => {
                                let pinned = page.read()?.pin_count;
                                assert!(pinned >= 1);
                                assert!(bpm.unpin_page(id, false));
                            }
                            Err(Error::PoolNoAvailableFrame) => {}
                            Err(err) => return Err(err),
                        }
                    }
                    _ => {
                        // deleting may fail when the page is pinned elsewhere,
                        // both outcomes are fine.
                        let id = known[rng.gen_range(0..known.len())];
                        let _ = bpm.delete_page(id)?;
                    }
                }
            }
            Ok(())
        }));
    }
    for handle in handles {
        handle.join().expect("worker thread panicked")?;
    }

    // every pin was paired with an unpin, the pool must balance out:
    // each frame is either free or holds exactly one resident page.
    assert_eq!(pool_size, bpm.free_frame_count() + bpm.resident_page_count());
    bpm.flush_all_pages()?;
    Ok(())
}
