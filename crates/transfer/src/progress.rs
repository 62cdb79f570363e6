use std::time::{Duration, Instant};

/// Percentage step between progress reports.
const STEP: u8 = 10;

/// Formats a byte count as MiB with two decimals (`"12.50 MB"`).
pub fn format_mib(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Tracks bytes received for one download and decides when to report.
///
/// With a known total, [`record`](Self::record) yields the new percentage
/// each time another 10 % step is crossed. Without one it
/// never reports; callers log the final count instead.
pub struct DownloadProgress {
    total: Option<u64>,
    received: u64,
    last_reported: Option<u8>,
    started: Instant,
}

impl DownloadProgress {
    /// Creates a tracker for a download of `total` bytes, if known.
    pub fn new(total: Option<u64>) -> Self {
        Self {
            total,
            received: 0,
            last_reported: None,
            started: Instant::now(),
        }
    }

    /// Records `bytes` more received. Returns the percentage to report, if any.
    pub fn record(&mut self, bytes: u64) -> Option<u8> {
        self.received += bytes;
        let percent = self.percent()?;
        let bucket = percent - percent % STEP;

        match self.last_reported {
            Some(last) if bucket <= last => None,
            _ => {
                self.last_reported = Some(bucket);
                Some(bucket)
            }
        }
    }

    /// Current completion percentage, if the total is known.
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(0) => Some(100),
            Some(total) => Some(((self.received.min(total) * 100) / total) as u8),
            None => None,
        }
    }

    /// Bytes received so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Time since the tracker was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Average throughput since the start, in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.received as f64 / secs
    }
}
