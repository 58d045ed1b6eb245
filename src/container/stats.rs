use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub(crate) struct InnerStats {
    total_resolutions: AtomicUsize,
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
    circular_dependency_failures: AtomicUsize,
}

impl InnerStats {
    pub(crate) fn record_resolution(&self) {
        self.total_resolutions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_circular(&self) {
        self.circular_dependency_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(
        &self,
        registered_entries: usize,
        resolved_entries: usize,
        compiled_entries: usize,
    ) -> ContainerStats {
        ContainerStats {
            total_resolutions: self.total_resolutions.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            circular_dependency_failures: self.circular_dependency_failures.load(Ordering::Relaxed),
            registered_entries,
            resolved_entries,
            compiled_entries,
        }
    }
}

/// Point-in-time counters for a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// `get` and `make` calls, including cache hits.
    pub total_resolutions: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub circular_dependency_failures: usize,
    /// Definitions registered at runtime or by the builder (compiled ones excluded).
    pub registered_entries: usize,
    pub resolved_entries: usize,
    pub compiled_entries: usize,
}

impl ContainerStats {
    /// Share of `get` calls served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }

    pub fn performance_summary(&self) -> String {
        format!(
            "resolutions: {}, cache hit rate: {:.1}%, resolved entries: {}, circular failures: {}",
            self.total_resolutions,
            self.hit_rate() * 100.0,
            self.resolved_entries,
            self.circular_dependency_failures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_without_lookups_is_zero() {
        assert_eq!(ContainerStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn snapshot_and_summary() {
        let inner = InnerStats::default();
        for _ in 0..4 {
            inner.record_resolution();
        }
        inner.record_miss();
        inner.record_hit();
        inner.record_hit();
        inner.record_hit();

        let stats = inner.snapshot(2, 1, 0);
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(
            stats.performance_summary(),
            "resolutions: 4, cache hit rate: 75.0%, resolved entries: 1, circular failures: 0"
        );
    }
}
