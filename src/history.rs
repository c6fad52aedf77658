// SPDX-License-Identifier: MPL-2.0

//! # Connection History
//!
//! Append-only log of connection transitions, persisted as a JSON array in
//! `~/.netstat-monitor/history.json`.
//!
//! ## File Format
//!
//! ```text
//! [
//!   { "timestamp": "2025-03-01T09:12:44.120381", "event": "connected",
//!     "latency": 23, "details": "WiFi - HomeNetwork" },
//!   { "timestamp": "2025-03-01T11:40:02.553170", "event": "disconnected",
//!     "details": "Connection lost" }
//! ]
//! ```
//!
//! ## Retention
//!
//! - Entries are stored oldest first
//! - Capacity defaults to 100; appending beyond it drops the oldest entries
//! - The whole file is rewritten after every append

use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of events kept on disk.
pub const MAX_HISTORY_ENTRIES: usize = 100;

// ============================================================================
// Entry Types
// ============================================================================

/// Kind of transition recorded in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Connected,
    Disconnected,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Connected => f.write_str("Connected"),
            EventKind::Disconnected => f.write_str("Disconnected"),
        }
    }
}

/// One recorded transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Local wall-clock time of the event
    pub timestamp: NaiveDateTime,
    #[serde(rename = "event")]
    pub kind: EventKind,
    /// Latency in milliseconds at the time of the event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<u32>,
    /// Free-form description, e.g. "WiFi - HomeNetwork"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HistoryEntry {
    /// `[2025-03-01 09:12:44] Connected (23ms) - WiFi - HomeNetwork`
    pub fn format_line(&self) -> String {
        let mut line = format!(
            "[{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.kind
        );
        if let Some(latency) = self.latency {
            line.push_str(&format!(" ({}ms)", latency));
        }
        if let Some(details) = &self.details {
            line.push_str(&format!(" - {}", details));
        }
        line
    }
}

/// Aggregate counts over the whole stored history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStats {
    pub total_events: usize,
    pub connected_count: usize,
    pub disconnected_count: usize,
    /// Mean of all recorded latencies, `None` when no entry has one
    pub average_latency: Option<f64>,
}

impl fmt::Display for HistoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stats: {} events, ", self.total_events)?;
        match self.average_latency {
            Some(avg) => write!(f, "avg latency: {:.0}ms", avg),
            None => f.write_str("no latency data"),
        }
    }
}

// ============================================================================
// History Log
// ============================================================================

/// Bounded, file-backed history of connection events.
pub struct HistoryLog {
    path: PathBuf,
    max_entries: usize,
    /// Oldest first
    entries: VecDeque<HistoryEntry>,
}

impl HistoryLog {
    /// Open the log at `path` with the default capacity.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_capacity(path, MAX_HISTORY_ENTRIES)
    }

    pub fn with_capacity(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        let mut history = Self {
            path: path.into(),
            max_entries,
            entries: VecDeque::new(),
        };
        history.load();
        history
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reload from disk. A missing or malformed file yields an empty history.
    pub fn load(&mut self) {
        self.entries = match read_entries(&self.path) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Error loading history: {}. Starting empty.", e);
                VecDeque::new()
            }
        };
        self.trim();
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let json =
            serde_json::to_string_pretty(&self.entries).map_err(|e| Error::json(&self.path, e))?;
        fs::write(&self.path, json).map_err(|e| Error::io(&self.path, e))
    }

    /// Append an event stamped with the current local time and persist.
    ///
    /// The entry is kept in memory even when the write fails.
    pub fn log_event(
        &mut self,
        kind: EventKind,
        latency: Option<u32>,
        details: Option<String>,
    ) -> Result<()> {
        self.push(HistoryEntry {
            timestamp: Local::now().naive_local(),
            kind,
            latency,
            details,
        })
    }

    pub fn push(&mut self, entry: HistoryEntry) -> Result<()> {
        log::debug!("History: {}", entry.format_line());
        self.entries.push_back(entry);
        self.trim();
        self.save()
    }

    /// Entries newest first, at most `limit` of them.
    pub fn recent(&self, limit: Option<usize>) -> Vec<&HistoryEntry> {
        let limit = limit.unwrap_or(self.entries.len());
        self.entries.iter().rev().take(limit).collect()
    }

    /// Human readable listing of the most recent `limit` entries.
    pub fn formatted(&self, limit: usize) -> String {
        let entries = self.recent(Some(limit));
        if entries.is_empty() {
            return "No history yet.".to_string();
        }

        let mut lines = vec!["Connection History:".to_string(), "-".repeat(40)];
        lines.extend(entries.iter().map(|entry| entry.format_line()));
        lines.join("\n")
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.save()
    }

    pub fn stats(&self) -> HistoryStats {
        let count = |kind: EventKind| self.entries.iter().filter(|e| e.kind == kind).count();
        let latencies: Vec<u32> = self.entries.iter().filter_map(|e| e.latency).collect();
        let average_latency = if latencies.is_empty() {
            None
        } else {
            let sum: u64 = latencies.iter().map(|&l| u64::from(l)).sum();
            Some(sum as f64 / latencies.len() as f64)
        };

        HistoryStats {
            total_events: self.entries.len(),
            connected_count: count(EventKind::Connected),
            disconnected_count: count(EventKind::Disconnected),
            average_latency,
        }
    }

    fn trim(&mut self) {
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }
}

fn read_entries(path: &Path) -> Result<VecDeque<HistoryEntry>> {
    if !path.exists() {
        return Ok(VecDeque::new());
    }
    let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&contents).map_err(|e| Error::json(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_in(dir: &tempfile::TempDir) -> HistoryLog {
        HistoryLog::open(dir.path().join("history.json"))
    }

    #[test]
    fn test_log_event_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = open_in(&dir);
        history
            .log_event(EventKind::Connected, Some(25), Some("WiFi - HomeNetwork".into()))
            .unwrap();
        history
            .log_event(EventKind::Disconnected, None, Some("Connection lost".into()))
            .unwrap();

        let reloaded = open_in(&dir);
        let recent = reloaded.recent(None);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].kind, EventKind::Disconnected);
        assert_eq!(recent[1].latency, Some(25));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = open_in(&dir);
        for i in 0..=MAX_HISTORY_ENTRIES {
            history
                .log_event(EventKind::Connected, Some(i as u32), None)
                .unwrap();
        }

        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        let oldest = history.recent(None).last().map(|e| e.latency);
        assert_eq!(oldest, Some(Some(1)));
        assert_eq!(open_in(&dir).len(), MAX_HISTORY_ENTRIES);
    }

    #[test]
    fn test_json_omits_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = open_in(&dir);
        history.log_event(EventKind::Disconnected, None, None).unwrap();

        let raw = fs::read_to_string(history.path()).unwrap();
        assert!(raw.contains("\"event\": \"disconnected\""));
        assert!(!raw.contains("latency"));
        assert!(!raw.contains("details"));
    }

    #[test]
    fn test_reads_python_style_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(
            &path,
            r#"[{"timestamp": "2024-05-01T08:30:00.123456", "event": "connected", "latency": 31}]"#,
        )
        .unwrap();

        let history = HistoryLog::open(&path);
        assert_eq!(
            history.formatted(20),
            "Connection History:\n----------------------------------------\n\
             [2024-05-01 08:30:00] Connected (31ms)"
        );
    }

    #[test]
    fn test_malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "[{").unwrap();
        let history = HistoryLog::open(&path);
        assert!(history.is_empty());
        assert_eq!(history.formatted(5), "No history yet.");
    }

    #[test]
    fn test_stats() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = open_in(&dir);
        history.log_event(EventKind::Connected, Some(20), None).unwrap();
        history.log_event(EventKind::Disconnected, None, None).unwrap();
        history.log_event(EventKind::Connected, Some(40), None).unwrap();

        let stats = history.stats();
        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.connected_count, 2);
        assert_eq!(stats.disconnected_count, 1);
        assert_eq!(stats.average_latency, Some(30.0));
        assert_eq!(stats.to_string(), "Stats: 3 events, avg latency: 30ms");
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = open_in(&dir);
        history.log_event(EventKind::Connected, None, None).unwrap();
        history.clear().unwrap();
        assert!(open_in(&dir).is_empty());
        assert_eq!(history.stats().to_string(), "Stats: 0 events, no latency data");
    }
}
