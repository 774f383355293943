// Transfer counters sampled into download rates.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

use crate::media::NetStats;

struct Sample {
    at: Instant,
    downloaded: u64,
}

pub struct TransferStats {
    downloaded_total: AtomicU64,
    served_total: AtomicU64,
    active_workers: AtomicU32,
    last_sample: Mutex<Sample>,
}

impl TransferStats {
    pub fn new() -> Self {
        Self {
            downloaded_total: AtomicU64::new(0),
            served_total: AtomicU64::new(0),
            active_workers: AtomicU32::new(0),
            last_sample: Mutex::new(Sample {
                at: Instant::now(),
                downloaded: 0,
            }),
        }
    }

    pub fn record_downloaded(&self, bytes: u64) {
        self.downloaded_total.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Bytes handed to a reader.
    pub fn record_served(&self, bytes: u64) {
        self.served_total.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_workers(&self) {
        self.active_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_workers(&self) {
        self.active_workers.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn total_downloaded(&self) -> u64 {
        self.downloaded_total.load(Ordering::Relaxed)
    }

    pub fn total_served(&self) -> u64 {
        self.served_total.load(Ordering::Relaxed)
    }

    pub fn active_workers(&self) -> u32 {
        self.active_workers.load(Ordering::Relaxed)
    }

    /// Download rate since the previous call. Unknown if called again within 100 ms.
    pub fn sample(&self) -> NetStats {
        let now = Instant::now();
        let current = self.total_downloaded();
        let mut last = self.last_sample.lock();
        let elapsed = now.duration_since(last.at).as_secs_f64();
        if elapsed <= 0.1 {
            return NetStats::UNKNOWN;
        }

        let rate = (current - last.downloaded) as f64 / elapsed;
        last.at = now;
        last.downloaded = current;

        // Plain range downloads never upload.
        NetStats {
            download_speed: rate as i64,
            upload_rate: NetStats::UNKNOWN_RATE,
        }
    }
}

impl Default for TransferStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = TransferStats::new();
        stats.record_downloaded(1000);
        stats.record_downloaded(500);
        stats.record_served(200);
        stats.increment_workers();
        stats.increment_workers();
        stats.decrement_workers();

        assert_eq!(stats.total_downloaded(), 1500);
        assert_eq!(stats.total_served(), 200);
        assert_eq!(stats.active_workers(), 1);
    }

    #[test]
    fn sample_reports_rate_after_interval() {
        let stats = TransferStats::new();
        assert_eq!(stats.sample(), NetStats::UNKNOWN);

        std::thread::sleep(Duration::from_millis(150));
        stats.record_downloaded(4096);
        let sample = stats.sample();
        assert!(sample.download_speed > 0);
        assert_eq!(sample.upload_rate, -1);
    }
}
