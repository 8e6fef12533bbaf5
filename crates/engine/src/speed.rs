use std::collections::HashMap;
use std::time::{Duration, Instant};

use wddl_model::Progress;

use crate::buffer::SampleWindow;

/// Samples retained per file.
pub const SAMPLES_PER_FILE: usize = 10;

/// Files not heard from for this long are dropped from the average.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

struct Tracked {
    window: SampleWindow,
    last_seen: Instant,
}

/// Moving-average throughput across in-flight files.
///
/// Each file contributes the mean of its last [`SAMPLES_PER_FILE`] speeds;
/// the global figure is the mean over files, so one stalled transfer cannot
/// dominate it.
pub struct SpeedAggregator {
    files: HashMap<String, Tracked>,
    idle_timeout: Duration,
}

impl Default for SpeedAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeedAggregator {
    pub fn new() -> Self {
        Self::with_idle_timeout(IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            files: HashMap::new(),
            idle_timeout,
        }
    }

    pub fn record(&mut self, progress: &Progress) {
        self.record_at(progress, Instant::now());
    }

    pub fn record_at(&mut self, progress: &Progress, now: Instant) {
        let tracked = self
            .files
            .entry(progress.id.clone())
            .or_insert_with(|| Tracked {
                window: SampleWindow::new(SAMPLES_PER_FILE),
                last_seen: now,
            });
        tracked.window.push(progress.speed);
        tracked.last_seen = now;
    }

    /// Average speed in bytes per second, 0 when nothing is tracked.
    pub fn avg_speed(&mut self) -> u64 {
        self.avg_speed_at(Instant::now())
    }

    pub fn avg_speed_at(&mut self, now: Instant) -> u64 {
        let idle = self.idle_timeout;
        self.files
            .retain(|_, t| now.saturating_duration_since(t.last_seen) <= idle);

        let means: Vec<u64> = self.files.values().filter_map(|t| t.window.mean()).collect();
        if means.is_empty() {
            return 0;
        }
        let sum: u128 = means.iter().map(|&m| u128::from(m)).sum();
        (sum / means.len() as u128) as u64
    }

    /// Number of files currently contributing.
    pub fn tracked(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(id: &str, speed: u64) -> Progress {
        Progress {
            id: id.into(),
            name: format!("{id}.bin"),
            percent: 0.0,
            speed,
        }
    }

    #[test]
    fn empty_is_zero() {
        let mut agg = SpeedAggregator::new();
        assert_eq!(agg.avg_speed(), 0);
    }

    #[test]
    fn averages_per_file_then_across_files() {
        let mut agg = SpeedAggregator::new();
        let now = Instant::now();
        agg.record_at(&progress("a", 100), now);
        agg.record_at(&progress("a", 300), now);
        agg.record_at(&progress("b", 1000), now);

        // a = 200, b = 1000
        assert_eq!(agg.avg_speed_at(now), 600);
        assert_eq!(agg.tracked(), 2);
    }

    #[test]
    fn keeps_last_ten_samples() {
        let mut agg = SpeedAggregator::new();
        let now = Instant::now();
        agg.record_at(&progress("a", 1_000_000), now);
        for _ in 0..SAMPLES_PER_FILE {
            agg.record_at(&progress("a", 50), now);
        }
        assert_eq!(agg.avg_speed_at(now), 50);
    }

    #[test]
    fn evicts_idle_files() {
        let mut agg = SpeedAggregator::with_idle_timeout(Duration::from_secs(60));
        let start = Instant::now();
        agg.record_at(&progress("stalled", 10), start);
        agg.record_at(&progress("active", 90), start + Duration::from_secs(100));

        let now = start + Duration::from_secs(120);
        assert_eq!(agg.avg_speed_at(now), 90);
        assert_eq!(agg.tracked(), 1);
    }

    #[test]
    fn new_sample_refreshes_last_seen() {
        let mut agg = SpeedAggregator::with_idle_timeout(Duration::from_secs(60));
        let start = Instant::now();
        agg.record_at(&progress("a", 10), start);
        agg.record_at(&progress("a", 30), start + Duration::from_secs(50));

        assert_eq!(agg.avg_speed_at(start + Duration::from_secs(100)), 20);
    }
}
