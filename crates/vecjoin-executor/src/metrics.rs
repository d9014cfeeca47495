use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters for the hash-table loader. Shared across tasks through an `Arc`.
#[derive(Debug)]
pub struct LoaderMetrics {
    pub tables_loaded: AtomicU64,
    pub tables_built_directly: AtomicU64,
    pub bytes_read: AtomicU64,
    pub total_load_time_us: AtomicU64,
    pub load_count: AtomicU64,
}

impl LoaderMetrics {
    pub fn new() -> Self {
        Self {
            tables_loaded: AtomicU64::new(0),
            tables_built_directly: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            total_load_time_us: AtomicU64::new(0),
            load_count: AtomicU64::new(0),
        }
    }

    pub fn record_table_loaded(&self, bytes: u64) {
        self.tables_loaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_tables_built_directly(&self, count: u64) {
        self.tables_built_directly
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_load(&self, duration: Duration) {
        self.load_count.fetch_add(1, Ordering::Relaxed);
        self.total_load_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn get_tables_loaded(&self) -> u64 {
        self.tables_loaded.load(Ordering::Relaxed)
    }

    pub fn get_tables_built_directly(&self) -> u64 {
        self.tables_built_directly.load(Ordering::Relaxed)
    }

    pub fn get_bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    pub fn get_total_load_time_us(&self) -> u64 {
        self.total_load_time_us.load(Ordering::Relaxed)
    }

    pub fn get_load_count(&self) -> u64 {
        self.load_count.load(Ordering::Relaxed)
    }

    pub fn get_average_load_time_us(&self) -> u64 {
        let count = self.get_load_count();
        if count == 0 {
            return 0;
        }
        self.get_total_load_time_us() / count
    }

    pub fn reset(&self) {
        self.tables_loaded.store(0, Ordering::Relaxed);
        self.tables_built_directly.store(0, Ordering::Relaxed);
        self.bytes_read.store(0, Ordering::Relaxed);
        self.total_load_time_us.store(0, Ordering::Relaxed);
        self.load_count.store(0, Ordering::Relaxed);
    }
}

impl Default for LoaderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = LoaderMetrics::new();
        assert_eq!(metrics.get_tables_loaded(), 0);
        assert_eq!(metrics.get_tables_built_directly(), 0);
        assert_eq!(metrics.get_bytes_read(), 0);
        assert_eq!(metrics.get_load_count(), 0);
    }

    #[test]
    fn test_record_table_loaded() {
        let metrics = LoaderMetrics::new();
        metrics.record_table_loaded(100);
        metrics.record_table_loaded(28);
        assert_eq!(metrics.get_tables_loaded(), 2);
        assert_eq!(metrics.get_bytes_read(), 128);
    }

    #[test]
    fn test_average_load_time() {
        let metrics = LoaderMetrics::new();
        assert_eq!(metrics.get_average_load_time_us(), 0);
        metrics.record_load(Duration::from_millis(1));
        metrics.record_load(Duration::from_millis(3));
        assert_eq!(metrics.get_average_load_time_us(), 2_000);
    }

    #[test]
    fn test_reset() {
        let metrics = LoaderMetrics::new();
        metrics.record_table_loaded(10);
        metrics.record_tables_built_directly(2);
        metrics.record_load(Duration::from_millis(5));
        metrics.reset();
        assert_eq!(metrics.get_tables_loaded(), 0);
        assert_eq!(metrics.get_tables_built_directly(), 0);
        assert_eq!(metrics.get_bytes_read(), 0);
        assert_eq!(metrics.get_total_load_time_us(), 0);
        assert_eq!(metrics.get_load_count(), 0);
    }
}
