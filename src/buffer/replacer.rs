use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::storage::page::FrameId;

/// How a page access was made. Carried through to the replacer for
/// future scan-aware policies; the plain LRU-K policy ignores it.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Unknown,
    Lookup,
    Scan,
    Index,
}

/// Replacer tracks frame usage for replacement in case the buffer pool
/// is full.
pub trait Replacer: Send + Sync {
    /// Record the event that the given frame id is accessed at current timestamp.
    /// Create a new entry for access history if frame id has not been seen before;
    /// a newly created entry starts non-evictable, the caller still holds the frame.
    ///
    /// Recording never evicts and never changes evictability.
    fn record_access(&self, frame_id: FrameId, access_type: AccessType);

    /// Find the frame to evict with the replace policy(backward k-distance).
    /// Only frames that are marked as evictable are candidates for eviction.
    ///
    /// Successful eviction of a frame decrements the size of replacer and
    /// removes the frame's access history.
    ///
    /// Return the frame id if a frame is evicted successfully, None if no
    /// frames can be evicted.
    fn evict(&self) -> Option<FrameId>;

    /// Toggle whether a frame is evictable or non-evictable. this function also
    /// controls replacer size. Note that size is equal to number of evictable
    /// entries.
    ///
    /// If a frame was previously evictable and is to be set to non-evictable,
    /// then size should decrement. If a frame was previously non-evictable and
    /// is to be set evictable, then size should increment.
    fn set_evictable(&self, frame_id: FrameId, evictable: bool);

    /// Check if a frame is evictable. if the frame is not found, return true.
    fn is_evictable(&self, frame_id: FrameId) -> bool;

    /// Remove an evictable frame from replacer, along with its access history.
    /// This function also decrements the replacer size if removal is successful.
    ///
    /// Note that this is different from evicting a frame, which always removes
    /// the frame with the largest backward k-distance. This function removes the
    /// specified frame id, no matter what its backward k-distance is.
    ///
    /// Removing a tracked frame that is not evictable is a contract violation
    /// and panics. If the specified frame is not found, do nothing.
    fn remove(&self, frame_id: FrameId);

    /// replacer size, the number of evictable frames.
    fn size(&self) -> usize;
}

/// The eviction ordering key of one frame. Sorting ascending puts the
/// eviction victim first: largest backward k-distance wins, and among
/// frames with infinite distance the earliest first access wins.
#[derive(Debug, Eq, PartialEq)]
struct KDistance {
    frame_id: FrameId,
    distance: usize,
    first_access_at: usize,
}

impl PartialOrd for KDistance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KDistance {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.distance.cmp(&other.distance).reverse() {
            Ordering::Equal => self.first_access_at.cmp(&other.first_access_at),
            other => other,
        }
    }
}

struct LRUKNode {
    k: usize,
    frame_id: FrameId,
    is_evictable: bool,
    /// history of the last seen K timestamps of the given frame.
    /// Least recent timestamp stored in front.
    history: VecDeque<usize>,
}

impl LRUKNode {
    fn new(frame_id: FrameId, k: usize) -> Self {
        assert!(k > 0, "replacer k should be larger than zero");
        // a frame enters the replacer pinned by whoever accessed it,
        // the buffer pool flips it evictable once the pin count drops
        // to zero.
        LRUKNode { history: VecDeque::with_capacity(k), k, frame_id, is_evictable: false }
    }

    fn record_access(&mut self, timestamp: usize) {
        if self.history.len() == self.k {
            self.history.pop_front();
        }
        self.history.push_back(timestamp)
    }

    /// The backward k-distance of this node at time `now`: the distance
    /// to the k-th most recent access, or infinity(usize::MAX) while the
    /// history holds fewer than k accesses.
    fn k_distance(&self, now: usize) -> KDistance {
        // the node is created on first access, so the history is never
        // empty here.
        let first = self.history.front().copied().unwrap_or(0);
        if self.history.len() < self.k {
            return KDistance { frame_id: self.frame_id, distance: usize::MAX, first_access_at: first };
        }
        KDistance { frame_id: self.frame_id, distance: now - first, first_access_at: first }
    }
}

/// LRUKReplacer implements the LRU-k replacement policy.
///
/// The LRU-k algorithm evicts a frame whose backward k-distance is maximum of
/// all frames. Backward k-distance is computed as the difference in time between
/// the current timestamp and the timestamp of k-th previous access.
///
/// A frame with less than k history references is given +inf as its backward
/// k-distance. When multiple frames have +inf backward k-distance, the classical
/// LRU algorithm is used to choose a victim among them.
pub struct LRUKReplacer {
    nodes: HashMap<FrameId, LRUKNode>,
    current_timestamp: usize,
    current_size: usize,
    replacer_size: usize,
    k: usize,
}

impl LRUKReplacer {
    pub fn new(k: usize, size: usize) -> Self {
        let nodes = HashMap::new();
        LRUKReplacer { nodes, current_timestamp: 0, current_size: 0, replacer_size: size, k }
    }

    fn record_access(&mut self, frame_id: FrameId, _access_type: AccessType) {
        if frame_id >= self.replacer_size {
            return;
        }
        let k = self.k;
        let node = self.nodes.entry(frame_id).or_insert_with(|| LRUKNode::new(frame_id, k));
        node.record_access(self.current_timestamp);
        self.current_timestamp += 1;
    }

    fn evict(&mut self) -> Option<FrameId> {
        let now = self.current_timestamp;
        let mut distances = vec![];
        for node in self.nodes.values() {
            if !node.is_evictable {
                continue;
            }
            distances.push(node.k_distance(now));
        }
        if distances.is_empty() {
            return None;
        }

        distances.sort();

        // we will always have at least one element here, it is
        // okay to use unwrap.
        let dist = distances.first().unwrap();
        let evicted = self.nodes.remove(&dist.frame_id).unwrap();
        self.current_size -= 1;
        debug!("frame {} evicted with k-distance {}", evicted.frame_id, dist.distance);

        Some(evicted.frame_id)
    }

    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let node = self.nodes.get_mut(&frame_id);
        if node.is_none() {
            return;
        }
        let node = node.unwrap();
        let is_evictable = node.is_evictable;
        if is_evictable == evictable {
            return;
        }

        node.is_evictable = evictable;
        if !is_evictable && evictable {
            self.current_size += 1;
        }
        if is_evictable && !evictable {
            self.current_size -= 1;
        }
    }

    fn is_evictable(&self, frame_id: FrameId) -> bool {
        let node = self.nodes.get(&frame_id);
        if node.is_none() {
            return true;
        }
        node.unwrap().is_evictable
    }

    fn remove(&mut self, frame_id: FrameId) {
        let node = self.nodes.get_mut(&frame_id);
        if node.is_none() {
            return;
        }
        let node = node.unwrap();
        if !node.is_evictable {
            panic!("remove called on non-evictable frame {}", frame_id);
        }
        self.nodes.remove(&frame_id);
        self.current_size -= 1;
    }

    fn size(&self) -> usize {
        self.current_size
    }
}

/// SyncLRUKReplacer implements the thread-safe version of the LRU-k
/// replacement policy, basically all the heavy lifting happens in the
/// LRUKReplacer.
pub struct SyncLRUKReplacer {
    inner: Mutex<LRUKReplacer>,
}

impl SyncLRUKReplacer {
    pub fn new(k: usize, size: usize) -> Self {
        let inner = Mutex::new(LRUKReplacer::new(k, size));
        SyncLRUKReplacer { inner }
    }
}

impl Replacer for SyncLRUKReplacer {
    fn record_access(&self, frame_id: FrameId, access_type: AccessType) {
        let mut guard = self.inner.lock().unwrap();
        guard.record_access(frame_id, access_type)
    }

    fn evict(&self) -> Option<FrameId> {
        let mut guard = self.inner.lock().unwrap();
        guard.evict()
    }

    fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let mut guard = self.inner.lock().unwrap();
        guard.set_evictable(frame_id, evictable)
    }

    fn is_evictable(&self, frame_id: FrameId) -> bool {
        let guard = self.inner.lock().unwrap();
        guard.is_evictable(frame_id)
    }

    fn remove(&self, frame_id: FrameId) {
        let mut guard = self.inner.lock().unwrap();
        guard.remove(frame_id)
    }

    fn size(&self) -> usize {
        let guard = self.inner.lock().unwrap();
        guard.size()
    }
}
