// SPDX-License-Identifier: MPL-2.0

//! # Desktop Notifications
//!
//! Connection changes are announced through the FreeDesktop notification
//! service using the `notify-send` command line tool.
//!
//! ```text
//! notify-send --app-name netstat-monitor "Internet Connected" "Latency: 23ms
//! WiFi - HomeNetwork"
//! ```
//!
//! Delivery is fire and forget: the child process is reaped by a short-lived
//! background thread, and a missing `notify-send` only produces a log line.

use std::process::{Command, Stdio};

const APP_NAME: &str = "netstat-monitor";

/// A notification request from the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub subtitle: String,
    pub body: String,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            body: body.into(),
        }
    }

    /// Subtitle and body joined the way notification daemons render them.
    pub fn message(&self) -> String {
        match (self.subtitle.is_empty(), self.body.is_empty()) {
            (true, _) => self.body.clone(),
            (false, true) => self.subtitle.clone(),
            (false, false) => format!("{}\n{}", self.subtitle, self.body),
        }
    }
}

/// Sink for notification requests.
pub trait Notifier {
    fn notify(&self, notification: &Notification);
}

/// Sends notifications to the desktop via `notify-send`.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) {
        let spawned = Command::new("notify-send")
            .args(["--app-name", APP_NAME])
            .arg(&notification.title)
            .arg(notification.message())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                log::debug!("Sent notification: {}", notification.title);
                // Reap in the background so the tick never waits on the daemon
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => log::warn!("Could not send notification '{}': {}", notification.title, e),
        }
    }
}

/// Writes notifications to the log only.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        log::info!("{}: {}", notification.title, notification.message().replace('\n', " - "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_joins_subtitle_and_body() {
        let n = Notification::new("Internet Connected", "Latency: 23ms", "WiFi - Home");
        assert_eq!(n.message(), "Latency: 23ms\nWiFi - Home");
        assert_eq!(Notification::new("t", "", "body").message(), "body");
        assert_eq!(Notification::new("t", "sub", "").message(), "sub");
    }
}
