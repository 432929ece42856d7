use std::time::Instant;

use parking_lot::Mutex;
use sysinfo::Networks;

use crate::core::dashboard::history::History;
use crate::core::dashboard::{DataSource, MetricPayload, NetworkStats};
use crate::error::Result;

/// Turns cumulative byte counters into per-second rates with history.
#[derive(Debug, Clone, Default)]
pub struct RateTracker {
    last: Option<(Instant, u64, u64)>,
    up_history: History<f64>,
    down_history: History<f64>,
    peak_up: f64,
    peak_down: f64,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record totals observed at `now`. The first observation reports zero
    /// rates; a counter that went backwards (interface reset) reads as zero.
    pub fn observe(&mut self, now: Instant, sent: u64, received: u64) -> NetworkStats {
        let (up, down) = match self.last {
            Some((then, prev_sent, prev_recv)) => {
                let elapsed = now.saturating_duration_since(then).as_secs_f64();
                if elapsed > 0.0 {
                    (
                        sent.saturating_sub(prev_sent) as f64 / elapsed,
                        received.saturating_sub(prev_recv) as f64 / elapsed,
                    )
                } else {
                    (0.0, 0.0)
                }
            }
            None => (0.0, 0.0),
        };
        self.last = Some((now, sent, received));

        self.up_history.push(up);
        self.down_history.push(down);
        self.peak_up = self.peak_up.max(up);
        self.peak_down = self.peak_down.max(down);

        NetworkStats {
            up_bytes_per_sec: up,
            down_bytes_per_sec: down,
            total_sent_bytes: sent,
            total_received_bytes: received,
            peak_up: self.peak_up,
            peak_down: self.peak_down,
            up_history: self.up_history.to_vec(),
            down_history: self.down_history.to_vec(),
        }
    }
}

struct NetworkState {
    networks: Networks,
    tracker: RateTracker,
}

/// Traffic summed over all interfaces.
pub struct NetworkSource {
    state: Mutex<NetworkState>,
}

impl NetworkSource {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(NetworkState {
                networks: Networks::new_with_refreshed_list(),
                tracker: RateTracker::new(),
            }),
        }
    }
}

impl Default for NetworkSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSource for NetworkSource {
    fn fetch(&self) -> Result<MetricPayload> {
        let mut state = self.state.lock();
        state.networks.refresh(true);

        let (sent, received) = state
            .networks
            .values()
            .fold((0u64, 0u64), |(tx, rx), data| {
                (
                    tx.saturating_add(data.total_transmitted()),
                    rx.saturating_add(data.total_received()),
                )
            });

        let stats = state.tracker.observe(Instant::now(), sent, received);
        Ok(MetricPayload::Network(stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rates_from_deltas() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();

        let first = tracker.observe(t0, 1_000, 5_000);
        assert_eq!(first.up_bytes_per_sec, 0.0);
        assert_eq!(first.total_sent_bytes, 1_000);

        let second = tracker.observe(t0 + Duration::from_secs(2), 3_000, 9_000);
        assert_eq!(second.up_bytes_per_sec, 1_000.0);
        assert_eq!(second.down_bytes_per_sec, 2_000.0);
        assert_eq!(second.up_history, vec![0.0, 1_000.0]);

        let third = tracker.observe(t0 + Duration::from_secs(4), 3_000, 9_000);
        assert_eq!(third.up_bytes_per_sec, 0.0);
        assert_eq!(third.peak_up, 1_000.0);
        assert_eq!(third.peak_down, 2_000.0);
    }

    #[test]
    fn test_counter_reset_reads_as_zero() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        tracker.observe(t0, 10_000, 10_000);
        let stats = tracker.observe(t0 + Duration::from_secs(1), 50, 50);
        assert_eq!(stats.up_bytes_per_sec, 0.0);
        assert_eq!(stats.down_bytes_per_sec, 0.0);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        let mut stats = NetworkStats::default();
        for i in 0..100u64 {
            stats = tracker.observe(t0 + Duration::from_secs(i), i * 10, i * 10);
        }
        assert_eq!(stats.up_history.len(), 60);
    }
}
