use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{GameEntity, GameSessionEntity, PlayerEntity, SessionQuestionEntity},
    dto::{
        format_system_time,
        game::GameDetail,
        player::PlayerDto,
        validation::{collect, field_error, finish, validate_not_blank},
    },
    state::session::SessionRole,
};

const MAX_NAME_LEN: usize = 100;

/// Start a new playthrough of a game. Numeric settings fall back to their defaults.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub game_id: Option<Uuid>,
    pub name: Option<String>,
    /// 2 to 10, default 3.
    #[serde(default)]
    pub number_of_players: Option<i64>,
    /// 0 to `numberOfPlayers`, default 0.
    #[serde(default)]
    pub number_of_ai_players: Option<i64>,
    /// Seconds per question, 5 to 120, default 30.
    #[serde(default)]
    pub default_timer: Option<i64>,
}

impl Validate for CreateSessionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.game_id.is_none() {
            errors.add("gameId", field_error("required", "is required"));
        }
        match self.name.as_deref() {
            Some(name) => {
                collect(&mut errors, "name", validate_not_blank(name));
                if name.chars().count() > MAX_NAME_LEN {
                    errors.add(
                        "name",
                        field_error("length", format!("must be at most {MAX_NAME_LEN} characters")),
                    );
                }
            }
            None => errors.add("name", field_error("required", "is required")),
        }
        finish(errors)
    }
}

/// Hand the turn to a seated player.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTurnRequest {
    pub current_turn: Option<Uuid>,
}

/// Flag changes for one question of a session.
///
/// Scoring happens when the update answers the question and both `playerId` and
/// `isCorrect` are given.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionQuestionRequest {
    #[serde(default)]
    pub is_revealed: Option<bool>,
    #[serde(default)]
    pub is_answered: Option<bool>,
    #[serde(default)]
    pub player_id: Option<Uuid>,
    #[serde(default)]
    pub is_correct: Option<bool>,
}

/// Live state of a question, resolved against the board.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuestionDto {
    pub id: Uuid,
    pub question_id: Uuid,
    pub category_id: Option<Uuid>,
    pub row_id: Option<Uuid>,
    pub question: Option<String>,
    pub answer: Option<String>,
    /// Points of the row the question sits in.
    pub value: Option<i32>,
    pub is_revealed: bool,
    pub is_answered: bool,
    pub answered_by: Option<Uuid>,
}

impl SessionQuestionDto {
    pub fn new(state: &SessionQuestionEntity, game: &GameEntity) -> Self {
        let question = game.question(state.question_id);
        Self {
            id: state.id,
            question_id: state.question_id,
            category_id: question.map(|question| question.category_id),
            row_id: question.map(|question| question.row_id),
            question: question.map(|question| question.question.clone()),
            answer: question.map(|question| question.answer.clone()),
            value: game.question_value(state.question_id),
            is_revealed: state.is_revealed,
            is_answered: state.is_answered,
            answered_by: state.answered_by,
        }
    }
}

/// Points change produced by a scored answer.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreChange {
    pub player_id: Uuid,
    pub delta: i32,
    /// Player total after the change.
    pub points: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuestionUpdate {
    #[serde(flatten)]
    pub question: SessionQuestionDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreChange>,
}

/// Session header with its players and the caller's derived role.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub game_id: Uuid,
    pub game_title: String,
    pub name: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub current_turn: Option<Uuid>,
    pub number_of_players: u8,
    pub number_of_ai_players: u8,
    pub default_timer: u16,
    pub players: Vec<PlayerDto>,
    pub user_role: SessionRole,
}

impl SessionSummary {
    pub fn new(
        session: &GameSessionEntity,
        game: &GameEntity,
        players: &[PlayerEntity],
        user_role: SessionRole,
    ) -> Self {
        Self {
            id: session.id,
            game_id: session.game_id,
            game_title: game.title.clone(),
            name: session.name.clone(),
            started_at: format_system_time(session.started_at),
            ended_at: session.ended_at.map(format_system_time),
            current_turn: session.current_turn,
            number_of_players: session.number_of_players,
            number_of_ai_players: session.number_of_ai_players,
            default_timer: session.default_timer,
            players: players.iter().map(PlayerDto::from).collect(),
            user_role,
        }
    }
}

/// Full session view: header, board and per-question state.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: SessionSummary,
    pub game: GameDetail,
    pub questions: Vec<SessionQuestionDto>,
}

impl SessionDetail {
    pub fn new(
        session: &GameSessionEntity,
        game: &GameEntity,
        players: &[PlayerEntity],
        user_role: SessionRole,
    ) -> Self {
        Self {
            session: SessionSummary::new(session, game, players, user_role),
            game: GameDetail::from(game),
            questions: session
                .questions
                .iter()
                .map(|state| SessionQuestionDto::new(state, game))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_requires_game_and_name() {
        let errors = CreateSessionRequest::default().validate().unwrap_err();
        assert!(errors.field_errors().contains_key("gameId"));
        assert!(errors.field_errors().contains_key("name"));

        let request: CreateSessionRequest = serde_json::from_value(serde_json::json!({
            "gameId": Uuid::new_v4(),
            "name": "Friday",
            "numberOfPlayers": 4,
        }))
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.number_of_players, Some(4));
    }

    #[test]
    fn question_update_accepts_partial_payloads() {
        let request: UpdateSessionQuestionRequest =
            serde_json::from_str(r#"{"isRevealed":true}"#).unwrap();
        assert_eq!(request.is_revealed, Some(true));
        assert!(request.is_answered.is_none());
        assert!(request.player_id.is_none());
    }
}
