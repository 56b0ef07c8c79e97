//! Aggregate status report emitted by `supervisor report`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::NodeId;

/// Per-node status as it appears in a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Healthy,
    /// Tracked by the supervisor but not answering its health check
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
    pub name: String,
    pub port: u16,
    pub group: String,
    pub status: ReportStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub running: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub not_found: usize,
}

/// Point-in-time report over the whole registry; generated on demand, never cached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub timestamp: DateTime<Utc>,
    pub nodes: BTreeMap<NodeId, NodeReport>,
    pub summary: ReportSummary,
}

impl Report {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            nodes: BTreeMap::new(),
            summary: ReportSummary::default(),
        }
    }
}
