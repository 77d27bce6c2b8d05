use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        format_system_time,
        player::PlayerDto,
        session::SessionQuestionUpdate,
        sse::{
            EVENT_PLAYER_JOINED, EVENT_PLAYER_LEFT, EVENT_QUESTION_CHANGED, EVENT_SESSION_ENDED,
            EVENT_TURN_CHANGED, PlayerJoinedEvent, PlayerLeftEvent, QuestionChangedEvent,
            ServerEvent, SessionEndedEvent, TurnChangedEvent,
        },
    },
    dao::models::{GameSessionEntity, PlayerEntity},
    state::SharedState,
};

/// Broadcast the new turn holder of a session.
pub fn broadcast_turn_changed(state: &SharedState, session: &GameSessionEntity) {
    let payload = TurnChangedEvent {
        session_id: session.id,
        current_turn: session.current_turn,
    };
    send_session_event(state, session.id, EVENT_TURN_CHANGED, &payload);
}

/// Broadcast a question reveal or answer, with the score change it caused.
pub fn broadcast_question_changed(
    state: &SharedState,
    session_id: Uuid,
    update: SessionQuestionUpdate,
) {
    let payload = QuestionChangedEvent { session_id, update };
    send_session_event(state, session_id, EVENT_QUESTION_CHANGED, &payload);
}

pub fn broadcast_player_joined(state: &SharedState, player: &PlayerEntity) {
    let payload = PlayerJoinedEvent {
        session_id: player.game_session_id,
        player: PlayerDto::from(player),
    };
    send_session_event(state, player.game_session_id, EVENT_PLAYER_JOINED, &payload);
}

pub fn broadcast_player_left(state: &SharedState, session_id: Uuid, player_id: Uuid) {
    let payload = PlayerLeftEvent {
        session_id,
        player_id,
    };
    send_session_event(state, session_id, EVENT_PLAYER_LEFT, &payload);
}

/// Broadcast the final standings of a session.
pub fn broadcast_session_ended(
    state: &SharedState,
    session: &GameSessionEntity,
    winner_id: Option<Uuid>,
    players: &[PlayerEntity],
) {
    let Some(ended_at) = session.ended_at else {
        return;
    };
    let payload = SessionEndedEvent {
        session_id: session.id,
        ended_at: format_system_time(ended_at),
        winner_id,
        players: players.iter().map(PlayerDto::from).collect(),
    };
    send_session_event(state, session.id, EVENT_SESSION_ENDED, &payload);
}

fn send_session_event(state: &SharedState, session_id: Uuid, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.session_streams().publish(session_id, event),
        Err(err) => warn!(event, %session_id, error = %err, "failed to serialize session SSE payload"),
    }
}
