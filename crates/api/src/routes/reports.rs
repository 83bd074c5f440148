//! Report Routes

use axum::{
    extract::{Path, Query, State},
    Json,
};
use engagement::ConnectionId;
use serde::{Deserialize, Serialize};
use storage::ReportRecord;
use tracing::debug;

use crate::{ApiError, SharedState};

/// Parse a connection id path segment
pub(crate) fn parse_connection_id(raw: &str) -> Result<ConnectionId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::InvalidConnectionId(raw.to_string()))
}

/// Score the participant's session and write its report artifact
pub async fn generate_report(
    State(state): State<SharedState>,
    Path(connection_id): Path<String>,
) -> Result<String, ApiError> {
    let conn = parse_connection_id(&connection_id)?;
    debug!(%conn, "Report requested");

    let generated = state.reports.generate_report(conn).await?;
    metrics::counter!("reports_generated_total").increment(1);

    Ok(format!("Report generated: {}", generated.path.display()))
}

/// Query parameters for reports endpoint
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// Maximum number of records to return
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for reports endpoint
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub data: Vec<ReportRecord>,
    pub meta: ReportMeta,
}

#[derive(Debug, Serialize)]
pub struct ReportMeta {
    pub count: usize,
    pub limit: usize,
}

/// Recently generated reports, newest first
pub async fn get_reports(
    State(state): State<SharedState>,
    Query(params): Query<ReportQuery>,
) -> Json<ReportResponse> {
    let limit = params.limit.min(1000);
    let data = state.reports.repository().get_reports(limit);

    Json(ReportResponse {
        meta: ReportMeta {
            count: data.len(),
            limit,
        },
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use engagement::BehaviorLabel;

    #[tokio::test]
    async fn test_get_reports_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_support::state(tmp.path());

        for name in ["Alice", "Bob"] {
            let conn = ConnectionId::new();
            state.store.on_join(conn, "r1", name).unwrap();
            state.store.append(conn, 0.8, BehaviorLabel::Engaged).unwrap();
            generate_report(State(state.clone()), Path(conn.to_string()))
                .await
                .unwrap();
        }

        let Json(response) = get_reports(
            State(state),
            Query(ReportQuery { limit: 10 }),
        )
        .await;
        assert_eq!(response.meta.count, 2);
        assert_eq!(response.data[0].participant_name, "Bob");
        assert_eq!(response.data[1].participant_name, "Alice");
    }

    #[test]
    fn test_parse_connection_id() {
        let conn = ConnectionId::new();
        assert_eq!(parse_connection_id(&conn.to_string()).unwrap(), conn);
        assert!(matches!(
            parse_connection_id("abc"),
            Err(ApiError::InvalidConnectionId(_))
        ));
    }
}
