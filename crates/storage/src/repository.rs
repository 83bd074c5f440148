//! Repository Implementation

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Generated report record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: i64,
    pub connection_id: String,
    pub participant_name: String,
    pub room_id: String,
    /// Artifact location
    pub path: String,
    pub average_attention: f64,
    pub overall_score: f64,
    pub frame_count: usize,
    pub generated_at_ms: i64,
}

/// In-memory index of generated reports
pub struct Repository {
    /// Report records, oldest first
    reports: Mutex<VecDeque<ReportRecord>>,
    /// Max report records kept
    max_report_records: usize,
    /// Next report ID
    next_report_id: Mutex<i64>,
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self::with_retention(10_000)
    }

    /// Create a repository keeping at most `max_report_records` records
    pub fn with_retention(max_report_records: usize) -> Self {
        info!(
            "Creating in-memory report repository (retention {})",
            max_report_records
        );
        Self {
            reports: Mutex::new(VecDeque::with_capacity(max_report_records.min(1000))),
            max_report_records: max_report_records.max(1),
            next_report_id: Mutex::new(1),
        }
    }

    /// Insert a report record, returning its assigned ID
    pub fn insert_report(&self, mut record: ReportRecord) -> i64 {
        let mut reports = self.reports.lock();

        let mut id = self.next_report_id.lock();
        record.id = *id;
        *id += 1;

        // Enforce retention
        while reports.len() >= self.max_report_records {
            reports.pop_front();
        }

        let returned_id = record.id;
        reports.push_back(record);
        debug!("Inserted report with ID {}", returned_id);

        returned_id
    }

    /// Most recent reports first
    pub fn get_reports(&self, limit: usize) -> Vec<ReportRecord> {
        self.reports.lock().iter().rev().take(limit).cloned().collect()
    }

    /// Get total report count
    pub fn report_count(&self) -> usize {
        self.reports.lock().len()
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}
