pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::SystemTime;

use crate::dao::models::{
    GameEntity, GameSessionEntity, PlayerEntity, PlayerRole, ProfileEntity, SessionQuestionEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

pub use memory::MemoryGameStore;

/// Question state and scored player produced by [`GameStore::claim_and_score`].
#[derive(Debug, Clone)]
pub struct ClaimedAnswer {
    pub question: SessionQuestionEntity,
    pub player: Option<PlayerEntity>,
}

/// A session as it was ended, with the players seated at that moment.
#[derive(Debug, Clone)]
pub struct FinishedSession {
    pub session: GameSessionEntity,
    pub players: Vec<PlayerEntity>,
}

/// Statistics overwritten by [`GameStore::update_profile_stats`]; `None` keeps the stored value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileStats {
    pub games_played: Option<u32>,
    pub games_won: Option<u32>,
    pub rating: Option<i32>,
}

/// Abstraction over the persistence layer for games, sessions, players and profiles.
///
/// Conditional operations (`set_current_turn`, `reveal_question`, `claim_and_score`,
/// `finish_session`) only apply while the session has no `ended_at`, and return `None`
/// when their precondition does not hold. None of them can interleave with a
/// `finish_session` of the same session.
pub trait GameStore: Send + Sync {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Delete a game together with its sessions and their players.
    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    /// Insert a session with its fully materialized question grid.
    fn insert_session(&self, session: GameSessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_session(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>>;
    fn list_sessions(&self) -> BoxFuture<'static, StorageResult<Vec<GameSessionEntity>>>;
    /// Delete a session together with its players.
    fn delete_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    fn set_current_turn(
        &self,
        session_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>>;
    fn reveal_question(
        &self,
        session_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SessionQuestionEntity>>>;
    /// Mark a question answered and apply `score` (player, point delta) with it.
    ///
    /// Succeeds for at most one caller per question. Returns `None` when the question is
    /// already answered, the session has ended, or the scored player is not seated in the
    /// session; in that case no points move.
    fn claim_and_score(
        &self,
        session_id: Uuid,
        question_id: Uuid,
        answered_by: Option<Uuid>,
        score: Option<(Uuid, i32)>,
    ) -> BoxFuture<'static, StorageResult<Option<ClaimedAnswer>>>;
    /// Set `ended_at`, succeeding for at most one caller per session. Once this returns,
    /// no score of the session can change and the returned roster is final: a join that
    /// raced the finish is either listed or rejected.
    fn finish_session(
        &self,
        session_id: Uuid,
        ended_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<FinishedSession>>>;

    /// Insert a player, failing with [`StorageError::Duplicate`](crate::dao::storage::StorageError)
    /// when the user already has a seat in the session. Returns `false`, leaving nothing
    /// behind, when the session has already ended.
    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<bool>>;
    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    fn list_players(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    fn list_players_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    fn update_player(
        &self,
        id: Uuid,
        name: Option<String>,
        role: Option<PlayerRole>,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// Delete a player, releasing the turn if they held it.
    fn delete_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    fn find_profile(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ProfileEntity>>>;
    /// Atomically bump `games_played` (and `games_won` when `won`), creating the profile if needed.
    fn record_game_result(&self, user_id: Uuid, won: bool)
    -> BoxFuture<'static, StorageResult<()>>;
    /// Set avatar and bio, creating a zeroed profile if needed. `None` leaves a field as is.
    fn upsert_profile_details(
        &self,
        user_id: Uuid,
        avatar: Option<String>,
        bio: Option<String>,
    ) -> BoxFuture<'static, StorageResult<ProfileEntity>>;
    /// Overwrite the given statistics of an existing profile.
    fn update_profile_stats(
        &self,
        user_id: Uuid,
        stats: ProfileStats,
    ) -> BoxFuture<'static, StorageResult<Option<ProfileEntity>>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
