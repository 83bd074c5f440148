//! End-of-meeting reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use storage::{sanitize_file_stem, ArtifactWriter, ReportRecord, Repository, StorageError};
use tracing::info;

use crate::behavior::BehaviorLabel;
use crate::scoring::{mean, BehaviorWeights};
use crate::session::{ConnectionId, SessionSnapshot, SessionStore};
use crate::EngagementError;

/// Artifact format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }
}

/// Immutable report computed from one session snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub connection_id: ConnectionId,
    pub participant_name: String,
    pub room_id: String,
    pub average_attention: f64,
    pub overall_score: f64,
    pub generated_at: DateTime<Utc>,
    pub attention_history: Vec<f32>,
    pub behavior_history: Vec<BehaviorLabel>,
}

impl Report {
    pub fn from_snapshot(
        snapshot: SessionSnapshot,
        weights: &BehaviorWeights,
    ) -> Result<Self, EngagementError> {
        let overall_score =
            weights.score(&snapshot.attention_history, &snapshot.behavior_history)?;
        let average_attention = mean(snapshot.attention_history.iter().map(|a| *a as f64));

        Ok(Self {
            connection_id: snapshot.connection_id,
            participant_name: snapshot.display_name,
            room_id: snapshot.room_id,
            average_attention,
            overall_score,
            generated_at: Utc::now(),
            attention_history: snapshot.attention_history,
            behavior_history: snapshot.behavior_history,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.attention_history.len()
    }

    /// Frame count per observed behavior, in label order
    pub fn behavior_breakdown(&self) -> Vec<(BehaviorLabel, usize)> {
        BehaviorLabel::ALL
            .into_iter()
            .map(|label| {
                let count = self.behavior_history.iter().filter(|b| **b == label).count();
                (label, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    /// `<name>_<connection prefix>_meeting_report.<ext>`
    pub fn file_name(&self, format: ReportFormat) -> String {
        format!(
            "{}_{}_meeting_report.{}",
            sanitize_file_stem(&self.participant_name),
            self.connection_id.short(),
            format.extension()
        )
    }

    pub fn render_text(&self) -> String {
        self.to_string()
    }

    pub fn render(&self, format: ReportFormat) -> Result<Vec<u8>, EngagementError> {
        match format {
            ReportFormat::Text => Ok(self.render_text().into_bytes()),
            ReportFormat::Json => serde_json::to_vec_pretty(self)
                .map_err(|e| StorageError::SerializationError(e.to_string()).into()),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Meeting Report for {}", self.participant_name)?;
        writeln!(f, "Room: {}", self.room_id)?;
        writeln!(f, "Average Attention Level: {:.2}", self.average_attention)?;
        writeln!(f, "Overall Score: {:.2}/100", self.overall_score)?;
        writeln!(f, "Frames Analyzed: {}", self.frame_count())?;
        writeln!(f, "Behavior Breakdown:")?;
        for (label, count) in self.behavior_breakdown() {
            let share = count as f64 / self.frame_count() as f64 * 100.0;
            writeln!(f, "  {}: {} ({:.1}%)", label, count, share)?;
        }
        writeln!(f, "Generated At: {}", self.generated_at.to_rfc3339())
    }
}

/// A written report and where it lives
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub id: i64,
    pub report: Report,
    pub path: PathBuf,
}

/// Scores sessions and writes report artifacts
pub struct ReportEngine {
    store: Arc<SessionStore>,
    weights: BehaviorWeights,
    writer: ArtifactWriter,
    repository: Arc<Repository>,
    format: ReportFormat,
}

impl ReportEngine {
    pub fn new(
        store: Arc<SessionStore>,
        weights: BehaviorWeights,
        writer: ArtifactWriter,
        repository: Arc<Repository>,
        format: ReportFormat,
    ) -> Self {
        Self {
            store,
            weights,
            writer,
            repository,
            format,
        }
    }

    pub fn repository(&self) -> &Arc<Repository> {
        &self.repository
    }

    /// Current score of a live session, without writing anything
    pub fn running_score(&self, conn: ConnectionId) -> Result<f64, EngagementError> {
        let snapshot = self.store.snapshot(conn)?;
        self.weights
            .score(&snapshot.attention_history, &snapshot.behavior_history)
    }

    /// Snapshot, score and write the report for `conn`
    pub async fn generate_report(
        &self,
        conn: ConnectionId,
    ) -> Result<GeneratedReport, EngagementError> {
        let snapshot = self.store.snapshot(conn)?;
        let report = Report::from_snapshot(snapshot, &self.weights)?;

        let contents = report.render(self.format)?;
        let path = self
            .writer
            .write(&report.file_name(self.format), &contents)
            .await?;

        let id = self.repository.insert_report(ReportRecord {
            id: 0,
            connection_id: conn.to_string(),
            participant_name: report.participant_name.clone(),
            room_id: report.room_id.clone(),
            path: path.display().to_string(),
            average_attention: report.average_attention,
            overall_score: report.overall_score,
            frame_count: report.frame_count(),
            generated_at_ms: report.generated_at.timestamp_millis(),
        });

        info!(
            %conn,
            score = report.overall_score,
            frames = report.frame_count(),
            "Report generated: {}",
            path.display()
        );
        Ok(GeneratedReport { id, report, path })
    }
}
