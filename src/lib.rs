// SPDX-License-Identifier: MPL-2.0

//! Internet connectivity monitor.
//!
//! Periodically checks reachability against a 204 endpoint, measures
//! latency, estimates throughput from the system byte counters and records
//! connect/disconnect events with optional desktop notifications.

pub mod config;
pub mod error;
pub mod history;
pub mod monitor;
pub mod notifications;
pub mod presentation;
pub mod scheduler;

pub use error::{Error, Result};
