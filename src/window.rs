use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

use crate::types::FeatureTuple;

/// Model input length: feature tuples per vehicle window.
pub const WINDOW_LEN: usize = 5;

const SHARD_COUNT: usize = 16;

struct Entry {
    window: VecDeque<FeatureTuple>,
    last_seen_cycle: u64,
}

/// Per-vehicle bounded history of feature tuples.
///
/// The only long-lived mutable state in the core. Keys are sharded across
/// independent locks so unrelated vehicles never contend; the scheduler
/// guarantees at most one append per vehicle per cycle, so there is no
/// same-key write race to arbitrate here.
pub struct WindowStore {
    capacity: usize,
    shards: Vec<RwLock<HashMap<String, Entry>>>,
}

impl WindowStore {
    /// Create a store whose windows hold up to `capacity` tuples each.
    pub fn new(capacity: usize) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self { capacity, shards }
    }

    fn shard(&self, vehicle_id: &str) -> &RwLock<HashMap<String, Entry>> {
        let mut h = DefaultHasher::new();
        vehicle_id.hash(&mut h);
        &self.shards[(h.finish() as usize) % SHARD_COUNT]
    }

    /// Append one tuple to a vehicle's window, evicting the oldest entry
    /// if the window is full. Creates the window on first sighting.
    pub fn append(&self, vehicle_id: &str, tuple: FeatureTuple, cycle: u64) {
        let mut shard = self.shard(vehicle_id).write();
        let entry = shard.entry(vehicle_id.to_string()).or_insert_with(|| Entry {
            window: VecDeque::with_capacity(self.capacity),
            last_seen_cycle: cycle,
        });
        if entry.window.len() >= self.capacity {
            entry.window.pop_front();
        }
        entry.window.push_back(tuple);
        entry.last_seen_cycle = cycle;
    }

    /// Copy of a vehicle's window in arrival order, oldest first.
    /// Empty if the vehicle has never been seen.
    pub fn snapshot(&self, vehicle_id: &str) -> Vec<FeatureTuple> {
        let shard = self.shard(vehicle_id).read();
        shard
            .get(vehicle_id)
            .map(|e| e.window.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drop windows for vehicles unseen for more than `ttl_cycles` cycles.
    /// Returns how many were evicted.
    pub fn evict_stale(&self, current_cycle: u64, ttl_cycles: u64) -> usize {
        let mut evicted = 0;
        for shard in &self.shards {
            let mut shard = shard.write();
            let before = shard.len();
            shard.retain(|_, e| current_cycle.saturating_sub(e.last_seen_cycle) <= ttl_cycles);
            evicted += before - shard.len();
        }
        evicted
    }

    /// Number of vehicles currently tracked.
    pub fn tracked(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(ratio: f32) -> FeatureTuple {
        FeatureTuple {
            traffic_ratio: ratio,
            temperature: 20.0,
            weather_code: 0,
        }
    }

    #[test]
    fn test_window_bound_holds() {
        let store = WindowStore::new(WINDOW_LEN);
        for i in 0..25 {
            store.append("MTA_1234", tuple(i as f32), i);
            assert!(
                store.snapshot("MTA_1234").len() <= WINDOW_LEN,
                "Window exceeded its bound after {} appends",
                i + 1
            );
        }
        assert_eq!(store.snapshot("MTA_1234").len(), WINDOW_LEN);
    }

    #[test]
    fn test_eviction_is_fifo() {
        let store = WindowStore::new(WINDOW_LEN);
        // W + 3 appends: the stored window must equal the last W, in order.
        for i in 0..(WINDOW_LEN + 3) {
            store.append("MTA_1234", tuple(i as f32), 0);
        }
        let window = store.snapshot("MTA_1234");
        assert_eq!(window.len(), WINDOW_LEN);
        for (offset, t) in window.iter().enumerate() {
            assert_eq!(t.traffic_ratio, (3 + offset) as f32, "FIFO order violated");
        }
    }

    #[test]
    fn test_unseen_vehicle_is_empty() {
        let store = WindowStore::new(WINDOW_LEN);
        assert!(store.snapshot("ghost").is_empty());
        assert_eq!(store.tracked(), 0);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let store = WindowStore::new(WINDOW_LEN);
        store.append("MTA_1234", tuple(1.0), 0);
        let before = store.snapshot("MTA_1234");
        store.append("MTA_1234", tuple(2.0), 1);
        // The earlier snapshot must not observe the later append.
        assert_eq!(before.len(), 1);
        assert_eq!(store.snapshot("MTA_1234").len(), 2);
    }

    #[test]
    fn test_vehicles_are_independent() {
        let store = WindowStore::new(WINDOW_LEN);
        for i in 0..10 {
            store.append("MTA_A", tuple(i as f32), 0);
        }
        store.append("MTA_B", tuple(9.9), 0);
        assert_eq!(store.snapshot("MTA_A").len(), WINDOW_LEN);
        assert_eq!(store.snapshot("MTA_B").len(), 1);
        assert_eq!(store.tracked(), 2);
    }

    #[test]
    fn test_stale_eviction() {
        let store = WindowStore::new(WINDOW_LEN);
        store.append("old", tuple(1.0), 0);
        store.append("fresh", tuple(1.0), 18);

        // Within TTL: nothing goes.
        assert_eq!(store.evict_stale(19, 20), 0);
        assert_eq!(store.tracked(), 2);

        // Cycle 21: "old" is 21 cycles stale, "fresh" only 3.
        assert_eq!(store.evict_stale(21, 20), 1);
        assert!(store.snapshot("old").is_empty());
        assert_eq!(store.snapshot("fresh").len(), 1);
    }
}
