// SPDX-License-Identifier: MPL-2.0

//! Terminal rendering of the monitor state.

use std::io::Write;

use chrono::{DateTime, Local};

use crate::monitor::bandwidth::format_speed;
use crate::monitor::StatusSnapshot;

pub const STATUS_CONNECTED: &str = "●";
pub const STATUS_DISCONNECTED: &str = "○";
pub const STATUS_PAUSED: &str = "⏸";

/// Latency at which the indicator switches to "slow".
pub const SLOW_LATENCY_MS: u32 = 100;

/// Rendered text for each status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub indicator: String,
    pub status: String,
    pub latency: String,
    pub bandwidth: String,
    pub connection: String,
    pub last_check: String,
}

impl StatusView {
    pub fn render(snapshot: &StatusSnapshot, now: DateTime<Local>) -> Self {
        let connected = snapshot.state.is_connected();

        let indicator = if snapshot.paused {
            STATUS_PAUSED.to_string()
        } else if !connected {
            STATUS_DISCONNECTED.to_string()
        } else if snapshot.latency.is_some_and(|ms| ms >= SLOW_LATENCY_MS) {
            format!("{} slow", STATUS_CONNECTED)
        } else {
            STATUS_CONNECTED.to_string()
        };

        let icon = if connected {
            STATUS_CONNECTED
        } else {
            STATUS_DISCONNECTED
        };

        let latency = match snapshot.latency {
            Some(ms) => format!("Ping: {}ms", ms),
            None => "Ping: --".to_string(),
        };

        let bandwidth = match snapshot.bandwidth {
            Some(rates) => format!(
                "↓ {}  ↑ {}",
                format_speed(rates.download_mbps),
                format_speed(rates.upload_mbps)
            ),
            None => "Bandwidth: Disabled".to_string(),
        };

        let connection = match (&snapshot.connection, connected) {
            (Some(info), true) => format!("Connection: {}", info.display()),
            _ => "Connection: --".to_string(),
        };

        Self {
            indicator,
            status: format!("Status: {} {}", icon, snapshot.state),
            latency,
            bandwidth,
            connection,
            last_check: format_last_check(snapshot.last_check, now),
        }
    }

    /// Single line form used by the terminal presenter.
    pub fn line(&self) -> String {
        format!(
            "{} | {} | {} | {} | {} | {}",
            self.indicator, self.status, self.latency, self.bandwidth, self.connection, self.last_check
        )
    }
}

/// `"Last check: Never"`, `"Updated 12s ago"` or `"Updated 3m ago"`.
pub fn format_last_check(last_check: Option<DateTime<Local>>, now: DateTime<Local>) -> String {
    let Some(at) = last_check else {
        return "Last check: Never".to_string();
    };
    let elapsed = (now - at).num_seconds().max(0);
    if elapsed < 60 {
        format!("Updated {}s ago", elapsed)
    } else {
        format!("Updated {}m ago", elapsed / 60)
    }
}

/// Consumer of rendered state and user-facing alerts.
pub trait Presenter {
    fn show(&mut self, view: &StatusView);
    fn alert(&mut self, title: &str, message: &str);
}

/// Prints status lines to stdout.
#[derive(Debug, Default)]
pub struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn show(&mut self, view: &StatusView) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", view.line());
    }

    fn alert(&mut self, title: &str, message: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "== {} ==\n{}", title, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{BandwidthRates, ConnectionInfo, ConnectionKind, ConnectionState};
    use chrono::Duration;

    fn connected(latency: u32) -> StatusSnapshot {
        StatusSnapshot {
            state: ConnectionState::Connected,
            latency: Some(latency),
            bandwidth: Some(BandwidthRates {
                download_mbps: Some(2.5),
                upload_mbps: Some(0.25),
            }),
            connection: Some(ConnectionInfo {
                kind: ConnectionKind::Wifi,
                ssid: Some("Home".into()),
                local_ip: None,
            }),
            last_check: None,
            paused: false,
        }
    }

    #[test]
    fn test_render_connected() {
        let view = StatusView::render(&connected(23), Local::now());
        assert_eq!(view.indicator, STATUS_CONNECTED);
        assert_eq!(view.status, "Status: ● Connected");
        assert_eq!(view.latency, "Ping: 23ms");
        assert_eq!(view.bandwidth, "↓ 2.50 MB/s  ↑ 256.0 KB/s");
        assert_eq!(view.connection, "Connection: WiFi (Home)");
        assert_eq!(view.last_check, "Last check: Never");
    }

    #[test]
    fn test_render_slow_and_paused() {
        assert_eq!(
            StatusView::render(&connected(150), Local::now()).indicator,
            "● slow"
        );

        let mut paused = connected(10);
        paused.paused = true;
        assert_eq!(StatusView::render(&paused, Local::now()).indicator, STATUS_PAUSED);
    }

    #[test]
    fn test_render_disconnected_without_bandwidth() {
        let snapshot = StatusSnapshot {
            state: ConnectionState::Disconnected,
            latency: None,
            bandwidth: None,
            connection: None,
            last_check: None,
            paused: false,
        };
        let view = StatusView::render(&snapshot, Local::now());
        assert_eq!(view.indicator, STATUS_DISCONNECTED);
        assert_eq!(view.latency, "Ping: --");
        assert_eq!(view.bandwidth, "Bandwidth: Disabled");
        assert_eq!(view.connection, "Connection: --");
    }

    #[test]
    fn test_format_last_check() {
        let now = Local::now();
        assert_eq!(
            format_last_check(Some(now - Duration::seconds(12)), now),
            "Updated 12s ago"
        );
        assert_eq!(
            format_last_check(Some(now - Duration::seconds(185)), now),
            "Updated 3m ago"
        );
    }
}
