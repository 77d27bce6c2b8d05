use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::{
    player::PlayerDto,
    session::{SessionQuestionUpdate, SessionSummary},
};

pub const EVENT_HANDSHAKE: &str = "handshake";
pub const EVENT_TURN_CHANGED: &str = "session.turn";
pub const EVENT_QUESTION_CHANGED: &str = "session.question";
pub const EVENT_PLAYER_JOINED: &str = "session.player_joined";
pub const EVENT_PLAYER_LEFT: &str = "session.player_left";
pub const EVENT_SESSION_ENDED: &str = "session.ended";

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self::new(event.into(), serde_json::to_string(payload)?))
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// First message of a session stream.
pub struct SessionHandshake {
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
    pub session: SessionSummary,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TurnChangedEvent {
    pub session_id: Uuid,
    pub current_turn: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionChangedEvent {
    pub session_id: Uuid,
    pub update: SessionQuestionUpdate,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoinedEvent {
    pub session_id: Uuid,
    pub player: PlayerDto,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeftEvent {
    pub session_id: Uuid,
    pub player_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Sent once when the session is finalized. `winnerId` is absent on a tie.
pub struct SessionEndedEvent {
    pub session_id: Uuid,
    pub ended_at: String,
    pub winner_id: Option<Uuid>,
    pub players: Vec<PlayerDto>,
}
