//! Per-participant session state
//!
//! The store owns one [`SessionState`] per live connection. The registry lock
//! is held only to look up, insert or remove a session handle; all history
//! mutation happens under that session's own mutex, so participants never
//! contend with each other.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::behavior::BehaviorLabel;
use crate::EngagementError;

/// Identity of one participant's live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First 8 hex characters, for file names and log lines
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Live state for one participant
#[derive(Debug)]
pub struct SessionState {
    pub display_name: String,
    pub room_id: String,
    pub joined_at: DateTime<Utc>,
    attention_history: Vec<f32>,
    behavior_history: Vec<BehaviorLabel>,
    /// Set by leave; a handle obtained before removal must not record further frames
    closed: bool,
}

impl SessionState {
    fn new(room_id: String, display_name: String) -> Self {
        Self {
            display_name,
            room_id,
            joined_at: Utc::now(),
            attention_history: Vec::new(),
            behavior_history: Vec::new(),
            closed: false,
        }
    }

    /// Number of recorded frames
    pub fn frame_count(&self) -> usize {
        self.attention_history.len()
    }

    fn push(&mut self, attention: f32, behavior: BehaviorLabel) {
        self.attention_history.push(attention);
        self.behavior_history.push(behavior);
        debug_assert_eq!(self.attention_history.len(), self.behavior_history.len());
    }
}

/// Read-consistent copy of a session, used for scoring and reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub room_id: String,
    pub joined_at: DateTime<Utc>,
    pub attention_history: Vec<f32>,
    pub behavior_history: Vec<BehaviorLabel>,
}

/// Live participant summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub frame_count: usize,
}

type SessionHandle = Arc<Mutex<SessionState>>;

/// Process-wide registry of live sessions
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<ConnectionId, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session. A second join for a live id is rejected.
    pub fn on_join(
        &self,
        conn: ConnectionId,
        room_id: &str,
        display_name: &str,
    ) -> Result<(), EngagementError> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&conn) {
            return Err(EngagementError::DuplicateSession(conn));
        }

        let state = SessionState::new(room_id.to_string(), display_name.to_string());
        sessions.insert(conn, Arc::new(Mutex::new(state)));
        info!("[{}] New member joined: {} ({})", room_id, display_name, conn);
        Ok(())
    }

    /// End a session and discard its state
    pub fn on_leave(&self, conn: ConnectionId) -> Result<(), EngagementError> {
        let handle = self
            .sessions
            .write()
            .remove(&conn)
            .ok_or(EngagementError::UnknownSession(conn))?;

        let mut state = handle.lock();
        state.closed = true;
        info!(
            "[{}] Member left: {} ({}, {} frames)",
            state.room_id,
            state.display_name,
            conn,
            state.frame_count()
        );
        Ok(())
    }

    /// Append one frame result to both histories
    pub fn append(
        &self,
        conn: ConnectionId,
        attention: f32,
        behavior: BehaviorLabel,
    ) -> Result<(), EngagementError> {
        let handle = self.handle(conn)?;
        let mut state = handle.lock();
        if state.closed {
            return Err(EngagementError::UnknownSession(conn));
        }

        state.push(attention, behavior);
        debug!(%conn, attention, %behavior, frames = state.frame_count(), "Frame recorded");
        Ok(())
    }

    /// Copy a session's histories under its lock
    pub fn snapshot(&self, conn: ConnectionId) -> Result<SessionSnapshot, EngagementError> {
        let handle = self.handle(conn)?;
        let state = handle.lock();
        if state.closed {
            return Err(EngagementError::UnknownSession(conn));
        }

        Ok(SessionSnapshot {
            connection_id: conn,
            display_name: state.display_name.clone(),
            room_id: state.room_id.clone(),
            joined_at: state.joined_at,
            attention_history: state.attention_history.clone(),
            behavior_history: state.behavior_history.clone(),
        })
    }

    /// Live participants of a room, in join order
    pub fn participants(&self, room_id: &str) -> Vec<Participant> {
        let handles: Vec<(ConnectionId, SessionHandle)> = self
            .sessions
            .read()
            .iter()
            .map(|(id, h)| (*id, Arc::clone(h)))
            .collect();

        let mut participants: Vec<(DateTime<Utc>, Participant)> = handles
            .into_iter()
            .filter_map(|(connection_id, handle)| {
                let state = handle.lock();
                if state.room_id != room_id || state.closed {
                    return None;
                }
                let participant = Participant {
                    connection_id,
                    display_name: state.display_name.clone(),
                    frame_count: state.frame_count(),
                };
                Some((state.joined_at, participant))
            })
            .collect();

        participants.sort_by_key(|(joined_at, _)| *joined_at);
        participants.into_iter().map(|(_, p)| p).collect()
    }

    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.sessions.read().contains_key(&conn)
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn handle(&self, conn: ConnectionId) -> Result<SessionHandle, EngagementError> {
        self.sessions
            .read()
            .get(&conn)
            .cloned()
            .ok_or(EngagementError::UnknownSession(conn))
    }
}
