// SPDX-License-Identifier: MPL-2.0

//! Bandwidth estimation from cumulative byte counters.
//!
//! The operating system exposes how many bytes have been sent and received
//! since boot. Throughput is the difference between two consecutive readings
//! divided by the time between them.
//!
//! ```text
//! sample 1 ──► baseline only, (None, None)
//! sample 2 ──► (recv2 - recv1) / dt,  (sent2 - sent1) / dt   [MB/s]
//! ```
//!
//! A counter that goes backwards (interface restart, driver reload) cannot be
//! compared with the previous reading, so the new sample just becomes the
//! baseline.

use std::time::{SystemTime, UNIX_EPOCH};

use sysinfo::Networks;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Snapshot of the cumulative byte counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ByteCounterSample {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Seconds since the Unix epoch
    pub timestamp_seconds: f64,
}

/// Throughput in MB/s, `None` when no rate could be computed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandwidthRates {
    pub download_mbps: Option<f64>,
    pub upload_mbps: Option<f64>,
}

/// Converts consecutive counter samples into rates.
#[derive(Debug, Default)]
pub struct BandwidthEstimator {
    baseline: Option<ByteCounterSample>,
}

impl BandwidthEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the baseline; the next sample starts over.
    pub fn reset(&mut self) {
        self.baseline = None;
    }

    pub fn baseline(&self) -> Option<&ByteCounterSample> {
        self.baseline.as_ref()
    }

    pub fn sample(&mut self, current: ByteCounterSample) -> BandwidthRates {
        let Some(previous) = self.baseline else {
            self.baseline = Some(current);
            return BandwidthRates::default();
        };

        let delta_time = current.timestamp_seconds - previous.timestamp_seconds;

        // Same instant: ignore the sample and keep the old baseline.
        if delta_time == 0.0 {
            return BandwidthRates::default();
        }

        if !delta_time.is_finite() || delta_time < 0.0 {
            log::debug!("Clock moved backwards by {:.3}s, re-baselining", -delta_time);
            self.baseline = Some(current);
            return BandwidthRates::default();
        }

        let sent = current.bytes_sent.checked_sub(previous.bytes_sent);
        let received = current.bytes_received.checked_sub(previous.bytes_received);
        self.baseline = Some(current);

        match (received, sent) {
            (Some(received), Some(sent)) => BandwidthRates {
                download_mbps: Some(received as f64 / delta_time / BYTES_PER_MB),
                upload_mbps: Some(sent as f64 / delta_time / BYTES_PER_MB),
            },
            _ => {
                log::debug!("Byte counter reset detected, re-baselining");
                BandwidthRates::default()
            }
        }
    }
}

/// Anything that can report cumulative byte counters.
pub trait ByteCounterSource {
    fn read(&mut self) -> ByteCounterSample;
}

/// System-wide counters summed over every network interface.
pub struct SystemCounters {
    networks: Networks,
}

impl SystemCounters {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }

    /// Total data moved since boot as `(sent_gb, received_gb)`.
    pub fn total_usage(&mut self) -> (f64, f64) {
        let sample = self.read();
        (
            sample.bytes_sent as f64 / BYTES_PER_GB,
            sample.bytes_received as f64 / BYTES_PER_GB,
        )
    }
}

impl Default for SystemCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteCounterSource for SystemCounters {
    fn read(&mut self) -> ByteCounterSample {
        self.networks.refresh_list();

        let mut bytes_sent = 0u64;
        let mut bytes_received = 0u64;
        for (_interface_name, network) in &self.networks {
            bytes_sent = bytes_sent.saturating_add(network.total_transmitted());
            bytes_received = bytes_received.saturating_add(network.total_received());
        }

        ByteCounterSample {
            bytes_sent,
            bytes_received,
            timestamp_seconds: unix_now(),
        }
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// `"N/A"`, `"512.0 KB/s"` or `"5.20 MB/s"`.
pub fn format_speed(speed_mbps: Option<f64>) -> String {
    match speed_mbps {
        None => "N/A".to_string(),
        Some(speed) if speed < 1.0 => format!("{:.1} KB/s", speed * 1024.0),
        Some(speed) => format!("{:.2} MB/s", speed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(sent: u64, received: u64, at: f64) -> ByteCounterSample {
        ByteCounterSample {
            bytes_sent: sent,
            bytes_received: received,
            timestamp_seconds: at,
        }
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("rate should be present");
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn test_first_sample_is_baseline_only() {
        let mut estimator = BandwidthEstimator::new();
        assert_eq!(estimator.sample(sample(10, 20, 1.0)), BandwidthRates::default());
        assert_eq!(estimator.baseline(), Some(&sample(10, 20, 1.0)));
    }

    #[test]
    fn test_rates_from_two_samples() {
        let mut estimator = BandwidthEstimator::new();
        estimator.sample(sample(0, 0, 100.0));
        let rates = estimator.sample(sample(1_048_576, 4 * 1_048_576, 102.0));
        assert_close(rates.upload_mbps, 0.5);
        assert_close(rates.download_mbps, 2.0);
    }

    #[test]
    fn test_zero_delta_time_keeps_baseline() {
        let mut estimator = BandwidthEstimator::new();
        estimator.sample(sample(0, 0, 10.0));
        assert_eq!(
            estimator.sample(sample(5_000, 5_000, 10.0)),
            BandwidthRates::default()
        );
        assert_eq!(estimator.baseline(), Some(&sample(0, 0, 10.0)));

        let rates = estimator.sample(sample(2_097_152, 1_048_576, 11.0));
        assert_close(rates.upload_mbps, 2.0);
        assert_close(rates.download_mbps, 1.0);
    }

    #[test]
    fn test_counter_reset_rebaselines() {
        let mut estimator = BandwidthEstimator::new();
        estimator.sample(sample(1000, 1000, 1.0));
        assert_eq!(estimator.sample(sample(500, 2000, 2.0)), BandwidthRates::default());
        assert_eq!(estimator.baseline(), Some(&sample(500, 2000, 2.0)));

        let rates = estimator.sample(sample(500, 2000 + 1_048_576, 3.0));
        assert_close(rates.upload_mbps, 0.0);
        assert_close(rates.download_mbps, 1.0);
    }

    #[test]
    fn test_clock_going_backwards_rebaselines() {
        let mut estimator = BandwidthEstimator::new();
        estimator.sample(sample(0, 0, 50.0));
        assert_eq!(estimator.sample(sample(10, 10, 40.0)), BandwidthRates::default());
        assert_eq!(estimator.baseline(), Some(&sample(10, 10, 40.0)));
    }

    #[test]
    fn test_reset_forgets_baseline() {
        let mut estimator = BandwidthEstimator::new();
        estimator.sample(sample(0, 0, 1.0));
        estimator.reset();
        assert_eq!(estimator.sample(sample(100, 100, 2.0)), BandwidthRates::default());
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(None), "N/A");
        assert_eq!(format_speed(Some(0.5)), "512.0 KB/s");
        assert_eq!(format_speed(Some(5.2)), "5.20 MB/s");
    }
}
