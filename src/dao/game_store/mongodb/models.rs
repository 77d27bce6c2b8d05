use mongodb::bson::{Bson, DateTime, Document, Uuid as BsonUuid, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    CategoryEntity, GameEntity, GameSessionEntity, PlayerEntity, PlayerRole, ProfileEntity,
    QuestionEntity, QuestionRowEntity, SessionQuestionEntity,
};

pub fn bson_uuid(id: Uuid) -> BsonUuid {
    BsonUuid::from_bytes(id.into_bytes())
}

fn from_bson_uuid(id: BsonUuid) -> Uuid {
    Uuid::from_bytes(id.bytes())
}

pub fn optional_uuid(id: Option<Uuid>) -> Bson {
    match id {
        Some(id) => Bson::from(bson_uuid(id)),
        None => Bson::Null,
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": bson_uuid(id)}
}

pub fn role_value(role: PlayerRole) -> &'static str {
    match role {
        PlayerRole::GameMaster => "GAME_MASTER",
        PlayerRole::Contestant => "CONTESTANT",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    title: String,
    is_active: bool,
    creator_id: BsonUuid,
    created_at: DateTime,
    updated_at: DateTime,
    categories: Vec<MongoCategoryDocument>,
    rows: Vec<MongoRowDocument>,
    questions: Vec<MongoQuestionDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoCategoryDocument {
    id: BsonUuid,
    name: String,
    order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoRowDocument {
    id: BsonUuid,
    value: i32,
    order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoQuestionDocument {
    id: BsonUuid,
    category_id: BsonUuid,
    row_id: BsonUuid,
    question: String,
    answer: String,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            title: value.title,
            is_active: value.is_active,
            creator_id: bson_uuid(value.creator_id),
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
            categories: value
                .categories
                .into_iter()
                .map(|category| MongoCategoryDocument {
                    id: bson_uuid(category.id),
                    name: category.name,
                    order: category.order,
                })
                .collect(),
            rows: value
                .rows
                .into_iter()
                .map(|row| MongoRowDocument {
                    id: bson_uuid(row.id),
                    value: row.value,
                    order: row.order,
                })
                .collect(),
            questions: value
                .questions
                .into_iter()
                .map(|question| MongoQuestionDocument {
                    id: bson_uuid(question.id),
                    category_id: bson_uuid(question.category_id),
                    row_id: bson_uuid(question.row_id),
                    question: question.question,
                    answer: question.answer,
                })
                .collect(),
        }
    }
}

impl From<MongoGameDocument> for GameEntity {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            title: value.title,
            is_active: value.is_active,
            creator_id: from_bson_uuid(value.creator_id),
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
            categories: value
                .categories
                .into_iter()
                .map(|category| CategoryEntity {
                    id: from_bson_uuid(category.id),
                    name: category.name,
                    order: category.order,
                })
                .collect(),
            rows: value
                .rows
                .into_iter()
                .map(|row| QuestionRowEntity {
                    id: from_bson_uuid(row.id),
                    value: row.value,
                    order: row.order,
                })
                .collect(),
            questions: value
                .questions
                .into_iter()
                .map(|question| QuestionEntity {
                    id: from_bson_uuid(question.id),
                    category_id: from_bson_uuid(question.category_id),
                    row_id: from_bson_uuid(question.row_id),
                    question: question.question,
                    answer: question.answer,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    game_id: BsonUuid,
    name: String,
    started_at: DateTime,
    ended_at: Option<DateTime>,
    current_turn: Option<BsonUuid>,
    number_of_players: i32,
    number_of_ai_players: i32,
    default_timer: i32,
    questions: Vec<MongoSessionQuestionDocument>,
    /// Player ids admitted while the session was live; only grows through a live-filtered update.
    #[serde(default)]
    seated: Vec<BsonUuid>,
}

impl MongoSessionDocument {
    pub fn seated(&self) -> &[BsonUuid] {
        &self.seated
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionQuestionDocument {
    id: BsonUuid,
    question_id: BsonUuid,
    is_revealed: bool,
    is_answered: bool,
    answered_by: Option<BsonUuid>,
}

impl From<SessionQuestionEntity> for MongoSessionQuestionDocument {
    fn from(value: SessionQuestionEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            question_id: bson_uuid(value.question_id),
            is_revealed: value.is_revealed,
            is_answered: value.is_answered,
            answered_by: value.answered_by.map(bson_uuid),
        }
    }
}

impl From<MongoSessionQuestionDocument> for SessionQuestionEntity {
    fn from(value: MongoSessionQuestionDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            question_id: from_bson_uuid(value.question_id),
            is_revealed: value.is_revealed,
            is_answered: value.is_answered,
            answered_by: value.answered_by.map(from_bson_uuid),
        }
    }
}

impl From<GameSessionEntity> for MongoSessionDocument {
    fn from(value: GameSessionEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            game_id: bson_uuid(value.game_id),
            name: value.name,
            started_at: DateTime::from_system_time(value.started_at),
            ended_at: value.ended_at.map(DateTime::from_system_time),
            current_turn: value.current_turn.map(bson_uuid),
            number_of_players: value.number_of_players.into(),
            number_of_ai_players: value.number_of_ai_players.into(),
            default_timer: value.default_timer.into(),
            questions: value.questions.into_iter().map(Into::into).collect(),
            seated: Vec::new(),
        }
    }
}

impl From<MongoSessionDocument> for GameSessionEntity {
    fn from(value: MongoSessionDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            game_id: from_bson_uuid(value.game_id),
            name: value.name,
            started_at: value.started_at.to_system_time(),
            ended_at: value.ended_at.map(DateTime::to_system_time),
            current_turn: value.current_turn.map(from_bson_uuid),
            number_of_players: u8::try_from(value.number_of_players).unwrap_or(u8::MAX),
            number_of_ai_players: u8::try_from(value.number_of_ai_players).unwrap_or_default(),
            default_timer: u16::try_from(value.default_timer).unwrap_or_default(),
            questions: value.questions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    game_session_id: BsonUuid,
    user_id: Option<BsonUuid>,
    name: String,
    points: i32,
    role: PlayerRole,
    joined_at: DateTime,
    /// Set by `finish_session`; scoring writes skip closed players.
    #[serde(default)]
    scores_closed: bool,
}

impl From<PlayerEntity> for MongoPlayerDocument {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            game_session_id: bson_uuid(value.game_session_id),
            user_id: value.user_id.map(bson_uuid),
            name: value.name,
            points: value.points,
            role: value.role,
            joined_at: DateTime::from_system_time(value.joined_at),
            scores_closed: false,
        }
    }
}

impl From<MongoPlayerDocument> for PlayerEntity {
    fn from(value: MongoPlayerDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            game_session_id: from_bson_uuid(value.game_session_id),
            user_id: value.user_id.map(from_bson_uuid),
            name: value.name,
            points: value.points,
            role: value.role,
            joined_at: value.joined_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoProfileDocument {
    #[serde(rename = "_id")]
    user_id: BsonUuid,
    #[serde(default)]
    games_played: i64,
    #[serde(default)]
    games_won: i64,
    #[serde(default)]
    rating: i32,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    bio: Option<String>,
}

impl From<MongoProfileDocument> for ProfileEntity {
    fn from(value: MongoProfileDocument) -> Self {
        Self {
            user_id: from_bson_uuid(value.user_id),
            games_played: u32::try_from(value.games_played).unwrap_or_default(),
            games_won: u32::try_from(value.games_won).unwrap_or_default(),
            rating: value.rating,
            avatar: value.avatar,
            bio: value.bio,
        }
    }
}
