//! Session Routes

use axum::{
    extract::{Path, State},
    Json,
};
use engagement::{ConnectionId, Participant};
use serde::Serialize;

use super::reports::parse_connection_id;
use crate::{ApiError, SharedState};

#[derive(Debug, Serialize)]
pub struct ParticipantsResponse {
    pub room_id: String,
    pub participants: Vec<Participant>,
}

/// Live participants of a room
pub async fn get_participants(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
) -> Json<ParticipantsResponse> {
    let participants = state.store.participants(&room_id);
    Json(ParticipantsResponse {
        room_id,
        participants,
    })
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub connection_id: ConnectionId,
    pub score: f64,
}

/// Running engagement score of a live session
pub async fn get_score(
    State(state): State<SharedState>,
    Path(connection_id): Path<String>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let conn = parse_connection_id(&connection_id)?;
    let score = state.reports.running_score(conn)?;
    Ok(Json(ScoreResponse {
        connection_id: conn,
        score,
    }))
}
