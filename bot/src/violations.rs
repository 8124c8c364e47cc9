use dashmap::DashMap;

/// Per-identity count of confirmed spam incidents since process start.
/// Deliberately not persisted: a restart resets everyone's history while the
/// blacklist itself survives on disk.
#[derive(Default)]
pub struct ViolationTracker {
    counts: DashMap<u64, u32>,
}

impl ViolationTracker {
    /// Increments the count for `user_id` and returns the new value.
    pub fn record(&self, user_id: u64) -> u32 {
        let mut entry = self.counts.entry(user_id).or_insert(0);
        *entry += 1;
        *entry
    }
}
