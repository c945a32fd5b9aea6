//! Per-device results and the run summary.

use std::fmt;

use crate::driver::FailureReason;
use crate::inventory::Rejection;

/// What happened to one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceStatus {
    /// Configuration written; `committed` is false when nothing changed.
    BackedUp { committed: bool },

    Failed(FailureReason),
}

/// Result for one attempted device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceReport {
    pub address: String,
    pub name: Option<String>,
    pub status: DeviceStatus,
}

impl DeviceReport {
    pub fn is_success(&self) -> bool {
        matches!(self.status, DeviceStatus::BackedUp { .. })
    }
}

/// Summary of one backup run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// One report per attempted device, in completion order.
    pub reports: Vec<DeviceReport>,

    /// Devices rejected before any connection attempt.
    pub rejected: Vec<Rejection>,
}

impl RunSummary {
    pub fn attempted(&self) -> usize {
        self.reports.len()
    }

    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    /// Committed artifacts, i.e. devices whose configuration changed.
    pub fn committed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, DeviceStatus::BackedUp { committed: true }))
            .count()
    }

    /// Overall success: at least one device backed up.
    pub fn is_success(&self) -> bool {
        self.succeeded() > 0
    }

    /// Failed device reports.
    pub fn failures(&self) -> impl Iterator<Item = (&DeviceReport, &FailureReason)> {
        self.reports.iter().filter_map(|r| match &r.status {
            DeviceStatus::Failed(reason) => Some((r, reason)),
            DeviceStatus::BackedUp { .. } => None,
        })
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "attempted: {}, succeeded: {} ({} changed), failed: {}, rejected: {}",
            self.attempted(),
            self.succeeded(),
            self.committed(),
            self.failed(),
            self.rejected.len()
        )?;
        for (report, reason) in self.failures() {
            writeln!(f, "  failed   {}: {}", report.address, reason)?;
        }
        for rejection in &self.rejected {
            writeln!(f, "  rejected {}: {}", rejection.address, rejection.reason)?;
        }
        Ok(())
    }
}
