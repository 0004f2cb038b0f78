/// Cache statistics accumulated since they were last read.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Stats {
    pub miss_count: u64,
    pub hit_count: u64,
    /// Entries dropped because the cache was full. Explicit erases are not counted.
    pub eviction_count: u64,
    pub millis_elapsed: u128,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    hit_count: u64,
    miss_count: u64,
    eviction_count: u64,
}

impl Counters {
    pub(crate) fn increment_hit_count(&mut self) {
        self.hit_count += 1;
    }

    pub(crate) fn increment_miss_count(&mut self) {
        self.miss_count += 1;
    }

    pub(crate) fn increment_eviction_count(&mut self) {
        self.eviction_count += 1;
    }

    /// Moves the current counts into `stats` and starts counting from zero.
    pub(crate) fn drain_into(&mut self, stats: &mut Stats) {
        let counters = std::mem::take(self);
        stats.hit_count += counters.hit_count;
        stats.miss_count += counters.miss_count;
        stats.eviction_count += counters.eviction_count;
    }
}
