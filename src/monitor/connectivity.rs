// SPDX-License-Identifier: MPL-2.0

//! Internet reachability and latency probing.
//!
//! A probe is a single GET against an endpoint that answers `204 No Content`,
//! so it costs almost no traffic. Anything other than a 204 within the
//! timeout counts as "not connected". The failure reason is kept in the
//! outcome for logging but callers only ever look at [`ProbeOutcome::is_connected`].

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use thiserror::Error;

/// Endpoint returning 204 No Content.
pub const DEFAULT_ENDPOINT: &str = "https://www.google.com/generate_204";

/// Plain-text external IP lookup.
pub const EXTERNAL_IP_ENDPOINT: &str = "https://api.ipify.org?format=text";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    UnexpectedStatus(StatusCode),
}

/// Result of one probe.
#[derive(Debug)]
pub enum ProbeOutcome {
    Reachable { latency: Duration },
    Failed(ProbeError),
}

impl ProbeOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable { .. })
    }

    /// Round trip in whole milliseconds, only for a successful probe.
    pub fn latency_ms(&self) -> Option<u32> {
        match self {
            ProbeOutcome::Reachable { latency } => {
                Some(u32::try_from(latency.as_millis()).unwrap_or(u32::MAX))
            }
            ProbeOutcome::Failed(_) => None,
        }
    }
}

/// Reachability check used by the monitor on every tick.
pub trait Probe {
    fn check_connection(&self) -> impl Future<Output = ProbeOutcome> + Send;

    /// Separate request timed end to end; `None` unless it succeeds.
    fn measure_latency(&self) -> impl Future<Output = Option<u32>> + Send;
}

/// HTTP implementation of [`Probe`].
#[derive(Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    endpoint: String,
    external_ip_endpoint: String,
}

impl HttpProber {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            external_ip_endpoint: EXTERNAL_IP_ENDPOINT.to_string(),
        })
    }

    pub fn with_external_ip_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.external_ip_endpoint = endpoint.into();
        self
    }

    async fn probe_once(&self) -> ProbeOutcome {
        let start = Instant::now();
        match self.client.get(&self.endpoint).send().await {
            Ok(response) if response.status() == StatusCode::NO_CONTENT => {
                ProbeOutcome::Reachable {
                    latency: start.elapsed(),
                }
            }
            Ok(response) => ProbeOutcome::Failed(ProbeError::UnexpectedStatus(response.status())),
            Err(e) => ProbeOutcome::Failed(ProbeError::Transport(e)),
        }
    }

    /// Public address as seen from the internet.
    pub async fn external_ip(&self) -> Option<String> {
        let response = match self.client.get(&self.external_ip_endpoint).send().await {
            Ok(response) if response.status() == StatusCode::OK => response,
            Ok(response) => {
                log::debug!("External IP lookup returned {}", response.status());
                return None;
            }
            Err(e) => {
                log::debug!("External IP lookup failed: {}", e);
                return None;
            }
        };

        response
            .text()
            .await
            .ok()
            .map(|body| body.trim().to_string())
            .filter(|ip| !ip.is_empty())
    }
}

impl Probe for HttpProber {
    async fn check_connection(&self) -> ProbeOutcome {
        let outcome = self.probe_once().await;
        if let ProbeOutcome::Failed(e) = &outcome {
            log::debug!("Probe of {} failed: {}", self.endpoint, e);
        }
        outcome
    }

    async fn measure_latency(&self) -> Option<u32> {
        self.probe_once().await.latency_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_collapses_failures() {
        let ok = ProbeOutcome::Reachable {
            latency: Duration::from_millis(42),
        };
        assert!(ok.is_connected());
        assert_eq!(ok.latency_ms(), Some(42));

        let failed = ProbeOutcome::Failed(ProbeError::UnexpectedStatus(StatusCode::OK));
        assert!(!failed.is_connected());
        assert_eq!(failed.latency_ms(), None);
    }
}
