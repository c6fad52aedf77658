// SPDX-License-Identifier: MPL-2.0

//! Connection metadata: link type, WiFi SSID and local address.
//!
//! # Detection order
//!
//! 1. **WiFi**: `iwgetid -r` prints the SSID of the associated network
//! 2. **Ethernet**: a wired interface (`en*`, `eth*`) is present
//! 3. **Unknown**: nothing matched
//!
//! The local address is the source address the kernel picks for a UDP socket
//! "connected" to a public resolver. No packet is sent.

use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;

use sysinfo::Networks;
use tokio::net::UdpSocket;
use tokio::process::Command;

/// Upper bound for each external lookup.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionKind {
    Wifi,
    Ethernet,
    #[default]
    Unknown,
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionKind::Wifi => f.write_str("WiFi"),
            ConnectionKind::Ethernet => f.write_str("Ethernet"),
            ConnectionKind::Unknown => f.write_str("Unknown"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionInfo {
    pub kind: ConnectionKind,
    pub ssid: Option<String>,
    pub local_ip: Option<IpAddr>,
}

impl ConnectionInfo {
    /// History details, e.g. `"WiFi - HomeNetwork"`.
    pub fn details(&self) -> String {
        match &self.ssid {
            Some(ssid) => format!("{} - {}", self.kind, ssid),
            None => self.kind.to_string(),
        }
    }

    /// Status line text, e.g. `"WiFi (HomeNetwork)"`.
    pub fn display(&self) -> String {
        match &self.ssid {
            Some(ssid) => format!("{} ({})", self.kind, ssid),
            None => self.kind.to_string(),
        }
    }
}

pub trait ConnectionInfoSource {
    fn lookup(&mut self) -> impl Future<Output = ConnectionInfo> + Send;
}

/// Looks up connection details from the running system.
pub struct SystemConnectionInfo {
    networks: Networks,
}

impl SystemConnectionInfo {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }

    fn interface_names(&mut self) -> Vec<String> {
        self.networks.refresh_list();
        let mut names = Vec::new();
        for (interface_name, _network) in &self.networks {
            names.push(interface_name.clone());
        }
        names
    }
}

impl Default for SystemConnectionInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionInfoSource for SystemConnectionInfo {
    async fn lookup(&mut self) -> ConnectionInfo {
        let ssid = wifi_ssid().await;
        let interfaces = self.interface_names();
        ConnectionInfo {
            kind: classify(ssid.as_deref(), &interfaces),
            ssid,
            local_ip: local_ip().await,
        }
    }
}

/// Pick the link type from the SSID lookup and the interface list.
pub fn classify(ssid: Option<&str>, interfaces: &[String]) -> ConnectionKind {
    if ssid.is_some() {
        return ConnectionKind::Wifi;
    }
    let wired = interfaces
        .iter()
        .any(|name| name.starts_with("en") || name.starts_with("eth"));
    if wired {
        ConnectionKind::Ethernet
    } else {
        ConnectionKind::Unknown
    }
}

/// SSID from `iwgetid -r` output; empty output means not associated.
pub fn parse_ssid(output: &str) -> Option<String> {
    let ssid = output.lines().next()?.trim();
    (!ssid.is_empty()).then(|| ssid.to_string())
}

async fn wifi_ssid() -> Option<String> {
    let mut cmd = Command::new("iwgetid");
    cmd.arg("-r")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match tokio::time::timeout(LOOKUP_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) if output.status.success() => {
            parse_ssid(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            log::debug!("iwgetid unavailable: {}", e);
            None
        }
        Err(_) => {
            log::debug!("iwgetid timed out");
            None
        }
    }
}

async fn local_ip() -> Option<IpAddr> {
    let lookup = async {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect("8.8.8.8:80").await?;
        socket.local_addr()
    };

    match tokio::time::timeout(LOOKUP_TIMEOUT, lookup).await {
        Ok(Ok(addr)) => Some(addr.ip()),
        Ok(Err(e)) => {
            log::debug!("Local IP lookup failed: {}", e);
            None
        }
        Err(_) => None,
    }
}
