use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Aggregate game entity: a reusable board of categories × point rows × questions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Display title of the board.
    pub title: String,
    /// Whether the game is offered for new sessions.
    pub is_active: bool,
    /// User that created the game and owns its mutations.
    pub creator_id: Uuid,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the game entity was updated.
    pub updated_at: SystemTime,
    /// Board columns.
    pub categories: Vec<CategoryEntity>,
    /// Board rows, each carrying the point value shared by its cells.
    pub rows: Vec<QuestionRowEntity>,
    /// Filled cells of the board.
    pub questions: Vec<QuestionEntity>,
}

impl GameEntity {
    /// Look up a category of this game.
    pub fn category(&self, id: Uuid) -> Option<&CategoryEntity> {
        self.categories.iter().find(|category| category.id == id)
    }

    /// Look up a question row of this game.
    pub fn row(&self, id: Uuid) -> Option<&QuestionRowEntity> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// Look up a question of this game.
    pub fn question(&self, id: Uuid) -> Option<&QuestionEntity> {
        self.questions.iter().find(|question| question.id == id)
    }

    /// Point value of the row a question sits in.
    pub fn question_value(&self, question_id: Uuid) -> Option<i32> {
        let question = self.question(question_id)?;
        self.row(question.row_id).map(|row| row.value)
    }
}

/// Board column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryEntity {
    pub id: Uuid,
    pub name: String,
    /// Display position, unique within the game.
    pub order: i32,
}

/// Board row sharing one point value across all categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionRowEntity {
    pub id: Uuid,
    pub value: i32,
    /// Display position, unique within the game.
    pub order: i32,
}

/// Single cell of the board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    pub id: Uuid,
    pub category_id: Uuid,
    pub row_id: Uuid,
    /// Clue shown to the players.
    pub question: String,
    pub answer: String,
}

/// One live playthrough of a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSessionEntity {
    pub id: Uuid,
    pub game_id: Uuid,
    pub name: String,
    pub started_at: SystemTime,
    /// Set once the session is finalized; the session is terminal afterwards.
    pub ended_at: Option<SystemTime>,
    /// Player currently holding the turn.
    pub current_turn: Option<Uuid>,
    pub number_of_players: u8,
    pub number_of_ai_players: u8,
    /// Default per-question timer in seconds.
    pub default_timer: u16,
    /// Snapshot of every question of the game taken when the session was created.
    pub questions: Vec<SessionQuestionEntity>,
}

impl GameSessionEntity {
    /// Whether the session has been finalized.
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Look up the live state of a question within this session.
    pub fn question(&self, question_id: Uuid) -> Option<&SessionQuestionEntity> {
        self.questions
            .iter()
            .find(|state| state.question_id == question_id)
    }
}

/// Reveal/answer state of one question inside one session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionQuestionEntity {
    pub id: Uuid,
    pub question_id: Uuid,
    pub is_revealed: bool,
    pub is_answered: bool,
    /// Player credited with the answer, if any.
    pub answered_by: Option<Uuid>,
}

impl SessionQuestionEntity {
    /// Fresh, hidden state for a question of the board.
    pub fn hidden(question_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            question_id,
            is_revealed: false,
            is_answered: false,
            answered_by: None,
        }
    }
}

/// Role a player holds within a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerRole {
    /// Runs the board alongside the host.
    GameMaster,
    #[default]
    Contestant,
}

/// Session-scoped participant, human (linked to a user) or AI/anonymous.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    pub id: Uuid,
    pub game_session_id: Uuid,
    /// Owning user; `None` for AI or anonymous players.
    pub user_id: Option<Uuid>,
    pub name: String,
    /// Running score, may go negative.
    pub points: i32,
    pub role: PlayerRole,
    /// Join timestamp, used to order players.
    pub joined_at: SystemTime,
}

/// Per-user aggregate statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileEntity {
    pub user_id: Uuid,
    pub games_played: u32,
    pub games_won: u32,
    pub rating: i32,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

impl ProfileEntity {
    /// Profile of a user that has not finished any session yet.
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            games_played: 0,
            games_won: 0,
            rating: 0,
            avatar: None,
            bio: None,
        }
    }
}
