use std::fmt;
use std::time::Duration;

/// Transfer progress of one file, emitted once per completed partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// File identity.
    pub id: String,
    /// File name, for display.
    pub name: String,
    /// Completed share of the file, 0 to 100.
    pub percent: f64,
    /// Throughput of the last partition in bytes per second.
    pub speed: u64,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.2}%) {:.2} KB/s",
            self.name,
            self.percent,
            self.speed as f64 / 1024.0
        )
    }
}

/// Aggregate view of the pending queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStat {
    /// Number of queued files.
    pub files: usize,
    /// Sum of their sizes in bytes.
    pub full_size: u64,
}

impl QueueStat {
    /// Estimated time to drain the queue at `speed` bytes per second.
    ///
    /// Zero when the queue is empty or the speed is unknown.
    pub fn eta(&self, speed: u64) -> Duration {
        if self.files == 0 || speed == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs(self.full_size / speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_display() {
        let p = Progress {
            id: "abc".into(),
            name: "movie.mkv".into(),
            percent: 42.5,
            speed: 2048,
        };
        assert_eq!(p.to_string(), "movie.mkv (42.50%) 2.00 KB/s");
    }

    #[test]
    fn eta_zero_when_empty() {
        let stat = QueueStat {
            files: 0,
            full_size: 0,
        };
        assert_eq!(stat.eta(1024), Duration::ZERO);
    }

    #[test]
    fn eta_zero_when_speed_unknown() {
        let stat = QueueStat {
            files: 2,
            full_size: 3072,
        };
        assert_eq!(stat.eta(0), Duration::ZERO);
    }

    #[test]
    fn eta_divides_remaining_bytes() {
        let stat = QueueStat {
            files: 2,
            full_size: 3072,
        };
        assert_eq!(stat.eta(1024), Duration::from_secs(3));
    }
}
