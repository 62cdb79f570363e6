//! Per-descriptor outcomes and the end-of-run summary.

use tracing::{info, warn};

use crate::error::ItemError;
use crate::types::FileDescriptor;

/// How a descriptor reached the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Sent as a single document.
    Whole { bytes: u64 },
    /// Sent as `parts` consecutive documents.
    Split { bytes: u64, parts: u32 },
}

/// Result of processing one descriptor.
#[derive(Debug)]
pub struct ItemReport {
    pub id: String,
    pub name: String,
    pub result: Result<Delivery, ItemError>,
}

impl ItemReport {
    pub fn new(descriptor: &FileDescriptor, result: Result<Delivery, ItemError>) -> Self {
        Self {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            result,
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.result.is_ok()
    }
}

/// Aggregated outcome of a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Descriptors produced by enumeration.
    pub considered: usize,
    /// One report per processed descriptor, in processing order.
    pub reports: Vec<ItemReport>,
    /// Set when the run stopped early on request.
    pub cancelled: bool,
}

impl RunSummary {
    /// Number of descriptors delivered completely.
    pub fn delivered(&self) -> usize {
        self.reports.iter().filter(|r| r.is_delivered()).count()
    }

    /// Number of descriptors that failed at any stage.
    pub fn failed(&self) -> usize {
        self.reports.len() - self.delivered()
    }

    /// Descriptors never attempted because the run was cancelled.
    pub fn skipped(&self) -> usize {
        self.considered - self.reports.len()
    }

    /// Reports of failed descriptors.
    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.reports.iter().filter(|r| !r.is_delivered())
    }

    /// Total payload bytes of delivered descriptors.
    pub fn delivered_bytes(&self) -> u64 {
        self.reports
            .iter()
            .filter_map(|r| match r.result {
                Ok(Delivery::Whole { bytes }) | Ok(Delivery::Split { bytes, .. }) => Some(bytes),
                Err(_) => None,
            })
            .sum()
    }

    /// Writes the summary to the log.
    pub fn log(&self) {
        info!(
            considered = self.considered,
            delivered = self.delivered(),
            failed = self.failed(),
            skipped = self.skipped(),
            bytes = self.delivered_bytes(),
            cancelled = self.cancelled,
            "run finished"
        );
        for report in self.failures() {
            if let Err(e) = &report.result {
                warn!(file = %report.name, id = %report.id, stage = e.stage(), error = %e, "not delivered");
            }
        }
    }
}
