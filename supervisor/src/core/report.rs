//! Status classification and tallying
//!
//! Pure functions that turn (descriptor, tracked, probe result) observations
//! into console snapshot rows and structured reports.

use chrono::{DateTime, Utc};
use shared::{HealthResult, NodeDescriptor, NodeReport, Report, ReportStatus};

/// One probed registry entry
#[derive(Debug, Clone)]
pub struct Observation {
    pub descriptor: NodeDescriptor,
    pub tracked: bool,
    pub health: HealthResult,
}

/// Console classification used by `status` and `monitor`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Healthy,
    Unhealthy,
    NotRunning,
}

impl CheckState {
    /// Untracked nodes are "not running" even if something answers on their port
    pub fn classify(tracked: bool, healthy: bool) -> Self {
        match (tracked, healthy) {
            (true, true) => CheckState::Healthy,
            (true, false) => CheckState::Unhealthy,
            (false, _) => CheckState::NotRunning,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckRow {
    pub descriptor: NodeDescriptor,
    pub state: CheckState,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckCounts {
    pub healthy: usize,
    pub unhealthy: usize,
    pub not_running: usize,
}

impl CheckCounts {
    pub fn total(&self) -> usize {
        self.healthy + self.unhealthy + self.not_running
    }
}

/// Result of one `check_all` pass, rows ordered by port
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub checked_at: DateTime<Utc>,
    pub rows: Vec<CheckRow>,
    pub counts: CheckCounts,
}

impl StatusSnapshot {
    pub fn from_observations(checked_at: DateTime<Utc>, mut observations: Vec<Observation>) -> Self {
        observations.sort_by(|a, b| {
            a.descriptor
                .port
                .cmp(&b.descriptor.port)
                .then_with(|| a.descriptor.id.cmp(&b.descriptor.id))
        });

        let mut counts = CheckCounts::default();
        let rows = observations
            .into_iter()
            .map(|observation| {
                let state = CheckState::classify(observation.tracked, observation.health.healthy);
                match state {
                    CheckState::Healthy => counts.healthy += 1,
                    CheckState::Unhealthy => counts.unhealthy += 1,
                    CheckState::NotRunning => counts.not_running += 1,
                }
                CheckRow {
                    descriptor: observation.descriptor,
                    state,
                    detail: observation.health.detail,
                }
            })
            .collect();

        Self {
            checked_at,
            rows,
            counts,
        }
    }
}

/// Report classification: a successful probe is healthy regardless of tracking
pub fn report_status(tracked: bool, healthy: bool) -> ReportStatus {
    if healthy {
        ReportStatus::Healthy
    } else if tracked {
        ReportStatus::Running
    } else {
        ReportStatus::Stopped
    }
}

/// Build a report; `healthy + unhealthy + not_found == total == observations.len()`
pub fn build_report(timestamp: DateTime<Utc>, observations: Vec<Observation>) -> Report {
    let mut report = Report::new(timestamp);

    for observation in observations {
        let status = report_status(observation.tracked, observation.health.healthy);

        report.summary.total += 1;
        if observation.tracked {
            report.summary.running += 1;
        }
        match status {
            ReportStatus::Healthy => report.summary.healthy += 1,
            ReportStatus::Running => report.summary.unhealthy += 1,
            ReportStatus::Stopped => report.summary.not_found += 1,
        }

        let descriptor = observation.descriptor;
        report.nodes.insert(
            descriptor.id,
            NodeReport {
                name: descriptor.name,
                port: descriptor.port,
                group: descriptor.group,
                status,
            },
        );
    }

    report
}
