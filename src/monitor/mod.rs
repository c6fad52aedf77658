// SPDX-License-Identifier: MPL-2.0

//! Monitor module organization and the per-tick check sequence.
//!
//! One tick:
//!
//! ```text
//! probe ──► tracker ──(edge)──► latency + connection info
//!                                   │
//!                                   ├──► history entry
//!                                   ├──► notification (if enabled)
//!                                   └──► commit state
//!       ──► latency refresh ──► bandwidth sample ──► snapshot
//! ```

pub mod bandwidth;
pub mod connection_info;
pub mod connectivity;
pub mod tracker;

pub use bandwidth::{BandwidthEstimator, BandwidthRates, ByteCounterSample, ByteCounterSource};
pub use connection_info::{ConnectionInfo, ConnectionInfoSource, ConnectionKind};
pub use connectivity::{HttpProber, Probe, ProbeOutcome};
pub use tracker::{ConnectionState, ConnectionTracker, Transition};

use chrono::{DateTime, Local};

use crate::config::Settings;
use crate::history::{EventKind, HistoryLog};
use crate::notifications::{Notification, Notifier};

/// Everything the presentation layer needs after a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub state: ConnectionState,
    pub latency: Option<u32>,
    /// `None` when bandwidth monitoring is disabled
    pub bandwidth: Option<BandwidthRates>,
    /// Only looked up while connected
    pub connection: Option<ConnectionInfo>,
    pub last_check: Option<DateTime<Local>>,
    pub paused: bool,
}

/// Owns all monitoring state and runs the check sequence.
///
/// Collaborators are passed in explicitly so tests can swap the network,
/// the byte counters and the notification sink.
pub struct Monitor<P, C> {
    prober: P,
    connection_info: C,
    counters: Box<dyn ByteCounterSource + Send>,
    notifier: Box<dyn Notifier + Send>,
    history: HistoryLog,
    settings: Settings,
    tracker: ConnectionTracker,
    estimator: BandwidthEstimator,
    bandwidth: Option<BandwidthRates>,
    connection: Option<ConnectionInfo>,
    last_check: Option<DateTime<Local>>,
    paused: bool,
}

impl<P, C> Monitor<P, C>
where
    P: Probe,
    C: ConnectionInfoSource,
{
    pub fn new(
        prober: P,
        connection_info: C,
        counters: Box<dyn ByteCounterSource + Send>,
        notifier: Box<dyn Notifier + Send>,
        history: HistoryLog,
        settings: Settings,
    ) -> Self {
        Self {
            prober,
            connection_info,
            counters,
            notifier,
            history,
            settings,
            tracker: ConnectionTracker::new(),
            estimator: BandwidthEstimator::new(),
            bandwidth: None,
            connection: None,
            last_check: None,
            paused: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.tracker.state()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn pause(&mut self) {
        self.paused = true;
        log::info!("Monitoring paused");
    }

    pub fn resume(&mut self) {
        self.paused = false;
        log::info!("Monitoring resumed");
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.tracker.state(),
            latency: self.tracker.latency(),
            bandwidth: self.bandwidth,
            connection: self.connection.clone(),
            last_check: self.last_check,
            paused: self.paused,
        }
    }

    /// Run one check. Returns `None` without doing anything while paused.
    pub async fn tick(&mut self) -> Option<StatusSnapshot> {
        if self.paused {
            return None;
        }
        self.last_check = Some(Local::now());

        let outcome = self.prober.check_connection().await;
        let reachable = outcome.is_connected();

        // On an edge the latency and connection info were just measured.
        let measured = match self.tracker.detect(reachable) {
            Some(transition) => Some(self.handle_transition(transition).await),
            None => None,
        };

        if reachable {
            let (latency, connection) = match measured {
                Some(measured) => measured,
                None => (
                    self.prober.measure_latency().await,
                    Some(self.connection_info.lookup().await),
                ),
            };
            self.tracker.set_latency(latency);
            self.connection = connection;
        } else {
            self.tracker.set_latency(None);
            self.connection = None;
        }

        self.bandwidth = if self.settings.bandwidth_enabled {
            Some(self.estimator.sample(self.counters.read()))
        } else {
            None
        };

        let snapshot = self.snapshot();
        log::debug!(
            "Tick: {} latency={:?} bandwidth={:?}",
            snapshot.state,
            snapshot.latency,
            snapshot.bandwidth
        );
        Some(snapshot)
    }

    /// Side effects of a state change, then commit.
    async fn handle_transition(
        &mut self,
        transition: Transition,
    ) -> (Option<u32>, Option<ConnectionInfo>) {
        let measured = match transition.to {
            ConnectionState::Connected => {
                let latency = self.prober.measure_latency().await;
                let info = self.connection_info.lookup().await;
                let details = info.details();
                log::info!("Internet connected ({}, latency {:?}ms)", details, latency);

                self.record(transition.to.into(), latency, details.clone());
                let subtitle = match latency {
                    Some(ms) if ms > 0 => format!("Latency: {}ms", ms),
                    _ => "Connected".to_string(),
                };
                self.announce(Notification::new("Internet Connected", subtitle, details));
                (latency, Some(info))
            }
            ConnectionState::Disconnected => {
                log::info!("Internet disconnected");
                self.record(transition.to.into(), None, "Connection lost".to_string());
                self.announce(Notification::new(
                    "Internet Disconnected",
                    "No internet connection",
                    "Please check your network settings",
                ));
                (None, None)
            }
        };

        self.tracker.commit(transition);
        measured
    }

    fn record(&mut self, kind: EventKind, latency: Option<u32>, details: String) {
        if let Err(e) = self.history.log_event(kind, latency, Some(details)) {
            log::error!("Failed to save history: {}", e);
        }
    }

    fn announce(&self, notification: Notification) {
        if self.settings.notifications_enabled {
            self.notifier.notify(&notification);
        }
    }
}
