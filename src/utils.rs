use std::time::{Duration, Instant};

/// Fixed-rate pacing for the scheduling loop
pub struct FrameTicker {
    frame: Duration,
    next_deadline: Option<Instant>,
}

impl FrameTicker {
    /// Create a ticker running at `rate_hz` frames per second
    pub fn new(rate_hz: u32) -> Self {
        let rate_hz = rate_hz.max(1);
        Self {
            frame: Duration::from_secs(1) / rate_hz,
            next_deadline: None,
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame
    }

    /// Time left until the next frame is due.
    ///
    /// The first call starts the clock and returns zero. A loop that fell
    /// behind resynchronizes instead of bursting to catch up.
    pub fn time_until_next(&mut self) -> Duration {
        let now = Instant::now();
        let deadline = match self.next_deadline {
            None => now,
            Some(deadline) if deadline + self.frame < now => now,
            Some(deadline) => deadline,
        };
        self.next_deadline = Some(deadline + self.frame);
        deadline.saturating_duration_since(now)
    }

    /// Sleep until the next frame is due
    pub fn wait(&mut self) {
        let remaining = self.time_until_next();
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
    }

    /// Reset the clock
    pub fn reset(&mut self) {
        self.next_deadline = None;
    }
}

/// Statistics collector for tick durations
pub struct TickStats {
    samples_us: Vec<f64>,
}

impl TickStats {
    pub fn new() -> Self {
        Self {
            samples_us: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples_us: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, elapsed: Duration) {
        self.samples_us.push(elapsed.as_nanos() as f64 / 1000.0);
    }

    pub fn len(&self) -> usize {
        self.samples_us.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples_us.is_empty()
    }

    /// Calculate percentile from sorted data
    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
        sorted[idx]
    }

    /// Mean, p50, p95 and p99 in microseconds
    pub fn summary(&self) -> (f64, f64, f64, f64) {
        if self.samples_us.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }

        let mut values = self.samples_us.clone();
        values.sort_by(f64::total_cmp);

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        (
            mean,
            Self::percentile(&values, 50.0),
            Self::percentile(&values, 95.0),
            Self::percentile(&values, 99.0),
        )
    }

    pub fn log_report(&self) {
        if self.samples_us.is_empty() {
            tracing::info!("No tick timings collected");
            return;
        }

        let (mean, p50, p95, p99) = self.summary();
        tracing::info!(
            "Tick timing over {} ticks: mean {:.0} µs, p50 {:.0} µs, p95 {:.0} µs, p99 {:.0} µs",
            self.samples_us.len(),
            mean,
            p50,
            p95,
            p99
        );
    }
}

impl Default for TickStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_duration() {
        assert_eq!(FrameTicker::new(50).frame_duration(), Duration::from_millis(20));
        // Zero rate is clamped
        assert_eq!(FrameTicker::new(0).frame_duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_first_frame_is_immediate() {
        let mut ticker = FrameTicker::new(10);
        assert_eq!(ticker.time_until_next(), Duration::ZERO);

        let next = ticker.time_until_next();
        assert!(next > Duration::ZERO);
        assert!(next <= Duration::from_millis(100));
    }

    #[test]
    fn test_ticker_reset() {
        let mut ticker = FrameTicker::new(10);
        ticker.time_until_next();
        ticker.reset();
        assert_eq!(ticker.time_until_next(), Duration::ZERO);
    }

    #[test]
    fn test_tick_stats_empty() {
        let stats = TickStats::new();
        assert_eq!(stats.len(), 0);
        assert!(stats.is_empty());
        assert_eq!(stats.summary(), (0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_tick_stats_summary() {
        let mut stats = TickStats::with_capacity(100);
        for us in 1..=100 {
            stats.add(Duration::from_micros(us));
        }

        let (mean, p50, p95, p99) = stats.summary();
        assert!((mean - 50.5).abs() < 1e-6);
        assert_eq!(p50, 51.0);
        assert_eq!(p95, 95.0);
        assert_eq!(p99, 99.0);
    }
}
