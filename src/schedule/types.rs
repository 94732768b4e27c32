use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::catchall::CatchAllVerdict;
use crate::mx::MxHost;
use crate::smtp::ProbeResult;
use crate::validator::Domain;

/// Progress notifications, delivered in order as the run advances.
#[derive(Debug, Clone, Copy)]
pub enum RunEvent<'a> {
    MxResolved { domain: &'a Domain, mx: &'a MxHost },
    AddressOfRecord(&'a ProbeResult),
    CatchAll(&'a CatchAllVerdict),
    /// `index` is 1-based within the selected partition.
    Probed {
        index: usize,
        of: usize,
        result: &'a ProbeResult,
    },
    Pausing(Duration),
    Cancelled { remaining: usize },
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Cancelled,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        })
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub accepted: usize,
    /// Candidates actually probed.
    pub total: usize,
    /// Candidates of the partition left unprobed after a cancel.
    pub skipped: usize,
}

impl RunSummary {
    pub(crate) fn tally(results: &[ProbeResult], planned: usize) -> Self {
        Self {
            accepted: results.iter().filter(|r| r.accepted).count(),
            total: results.len(),
            skipped: planned.saturating_sub(results.len()),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} accepted", self.accepted, self.total)?;
        if self.skipped > 0 {
            write!(f, " ({} skipped)", self.skipped)?;
        }
        Ok(())
    }
}

/// Everything a run produced. Results appear in candidate order.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub domain: Domain,
    pub mx: MxHost,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub address_of_record: Option<ProbeResult>,
    /// Absent only when the run was cancelled before the check ran.
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub catch_all: Option<CatchAllVerdict>,
    pub results: Vec<ProbeResult>,
    pub status: RunStatus,
    pub summary: RunSummary,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn accepted(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results.iter().filter(|r| r.accepted)
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }
}
