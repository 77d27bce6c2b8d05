use std::{collections::HashMap, sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    game_store::{ClaimedAnswer, FinishedSession, GameStore, ProfileStats},
    models::{
        GameEntity, GameSessionEntity, PlayerEntity, PlayerRole, ProfileEntity,
        SessionQuestionEntity,
    },
    storage::{StorageError, StorageResult},
};

/// In-process [`GameStore`] used for local runs and tests.
///
/// Every mutation runs under a single write lock, which gives the same
/// single-winner semantics as the conditional updates of the Mongo backend.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    games: HashMap<Uuid, GameEntity>,
    sessions: HashMap<Uuid, GameSessionEntity>,
    players: HashMap<Uuid, PlayerEntity>,
    profiles: HashMap<Uuid, ProfileEntity>,
}

impl MemoryState {
    fn live_session_mut(&mut self, id: Uuid) -> Option<&mut GameSessionEntity> {
        self.sessions
            .get_mut(&id)
            .filter(|session| !session.is_ended())
    }

    fn drop_session_players(&mut self, session_id: Uuid) {
        self.players
            .retain(|_, player| player.game_session_id != session_id);
    }
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_players(mut players: Vec<PlayerEntity>) -> Vec<PlayerEntity> {
    players.sort_by_key(|player| player.joined_at);
    players
}

impl GameStore for MemoryGameStore {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.write().await.games.insert(game.id, game);
            Ok(())
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.games.get(&id).cloned()) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut games: Vec<_> = inner.read().await.games.values().cloned().collect();
            games.sort_by_key(|game| game.created_at);
            Ok(games)
        })
    }

    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.write().await;
            if state.games.remove(&id).is_none() {
                return Ok(false);
            }
            let session_ids: Vec<Uuid> = state
                .sessions
                .values()
                .filter(|session| session.game_id == id)
                .map(|session| session.id)
                .collect();
            for session_id in session_ids {
                state.sessions.remove(&session_id);
                state.drop_session_players(session_id);
            }
            Ok(true)
        })
    }

    fn insert_session(&self, session: GameSessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.write().await.sessions.insert(session.id, session);
            Ok(())
        })
    }

    fn find_session(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.sessions.get(&id).cloned()) })
    }

    fn list_sessions(&self) -> BoxFuture<'static, StorageResult<Vec<GameSessionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut sessions: Vec<_> = inner.read().await.sessions.values().cloned().collect();
            sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
            Ok(sessions)
        })
    }

    fn delete_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.write().await;
            if state.sessions.remove(&id).is_none() {
                return Ok(false);
            }
            state.drop_session_players(id);
            Ok(true)
        })
    }

    fn set_current_turn(
        &self,
        session_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.write().await;
            Ok(state.live_session_mut(session_id).map(|session| {
                session.current_turn = Some(player_id);
                session.clone()
            }))
        })
    }

    fn reveal_question(
        &self,
        session_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SessionQuestionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.write().await;
            let Some(session) = state.live_session_mut(session_id) else {
                return Ok(None);
            };
            Ok(session
                .questions
                .iter_mut()
                .find(|question| question.question_id == question_id)
                .map(|question| {
                    question.is_revealed = true;
                    question.clone()
                }))
        })
    }

    fn claim_and_score(
        &self,
        session_id: Uuid,
        question_id: Uuid,
        answered_by: Option<Uuid>,
        score: Option<(Uuid, i32)>,
    ) -> BoxFuture<'static, StorageResult<Option<ClaimedAnswer>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.write().await;
            if let Some((player_id, _)) = score {
                let seated = state
                    .players
                    .get(&player_id)
                    .is_some_and(|player| player.game_session_id == session_id);
                if !seated {
                    return Ok(None);
                }
            }

            let Some(question) = state.live_session_mut(session_id).and_then(|session| {
                session
                    .questions
                    .iter_mut()
                    .find(|question| question.question_id == question_id && !question.is_answered)
            }) else {
                return Ok(None);
            };
            question.is_revealed = true;
            question.is_answered = true;
            question.answered_by = answered_by;
            let question = question.clone();

            let player = score.and_then(|(player_id, delta)| {
                state.players.get_mut(&player_id).map(|player| {
                    player.points = player.points.saturating_add(delta);
                    player.clone()
                })
            });
            Ok(Some(ClaimedAnswer { question, player }))
        })
    }

    fn finish_session(
        &self,
        session_id: Uuid,
        ended_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<FinishedSession>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.write().await;
            let Some(session) = state.live_session_mut(session_id) else {
                return Ok(None);
            };
            session.ended_at = Some(ended_at);
            let session = session.clone();
            let players = state
                .players
                .values()
                .filter(|player| player.game_session_id == session_id)
                .cloned()
                .collect();
            Ok(Some(FinishedSession {
                session,
                players: sorted_players(players),
            }))
        })
    }

    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.write().await;
            let ended = state
                .sessions
                .get(&player.game_session_id)
                .is_some_and(GameSessionEntity::is_ended);
            if ended {
                return Ok(false);
            }
            if let Some(user_id) = player.user_id {
                let seated = state.players.values().any(|existing| {
                    existing.game_session_id == player.game_session_id
                        && existing.user_id == Some(user_id)
                });
                if seated {
                    return Err(StorageError::duplicate(format!(
                        "user {user_id} already joined session {}",
                        player.game_session_id
                    )));
                }
            }
            state.players.insert(player.id, player);
            Ok(true)
        })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.players.get(&id).cloned()) })
    }

    fn list_players(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let players = inner
                .read()
                .await
                .players
                .values()
                .filter(|player| player.game_session_id == session_id)
                .cloned()
                .collect();
            Ok(sorted_players(players))
        })
    }

    fn list_players_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let players = inner
                .read()
                .await
                .players
                .values()
                .filter(|player| player.user_id == Some(user_id))
                .cloned()
                .collect();
            Ok(sorted_players(players))
        })
    }

    fn update_player(
        &self,
        id: Uuid,
        name: Option<String>,
        role: Option<PlayerRole>,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.write().await;
            Ok(state.players.get_mut(&id).map(|player| {
                if let Some(name) = name {
                    player.name = name;
                }
                if let Some(role) = role {
                    player.role = role;
                }
                player.clone()
            }))
        })
    }

    fn delete_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.write().await;
            let Some(player) = state.players.remove(&id) else {
                return Ok(false);
            };
            if let Some(session) = state.sessions.get_mut(&player.game_session_id) {
                if session.current_turn == Some(id) {
                    session.current_turn = None;
                }
            }
            Ok(true)
        })
    }

    fn find_profile(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ProfileEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.profiles.get(&user_id).cloned()) })
    }

    fn record_game_result(
        &self,
        user_id: Uuid,
        won: bool,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.write().await;
            let profile = state
                .profiles
                .entry(user_id)
                .or_insert_with(|| ProfileEntity::empty(user_id));
            profile.games_played += 1;
            if won {
                profile.games_won += 1;
            }
            Ok(())
        })
    }

    fn upsert_profile_details(
        &self,
        user_id: Uuid,
        avatar: Option<String>,
        bio: Option<String>,
    ) -> BoxFuture<'static, StorageResult<ProfileEntity>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.write().await;
            let profile = state
                .profiles
                .entry(user_id)
                .or_insert_with(|| ProfileEntity::empty(user_id));
            if avatar.is_some() {
                profile.avatar = avatar;
            }
            if bio.is_some() {
                profile.bio = bio;
            }
            Ok(profile.clone())
        })
    }

    fn update_profile_stats(
        &self,
        user_id: Uuid,
        stats: ProfileStats,
    ) -> BoxFuture<'static, StorageResult<Option<ProfileEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.write().await;
            Ok(state.profiles.get_mut(&user_id).map(|profile| {
                if let Some(games_played) = stats.games_played {
                    profile.games_played = games_played;
                }
                if let Some(games_won) = stats.games_won {
                    profile.games_won = games_won;
                }
                if let Some(rating) = stats.rating {
                    profile.rating = rating;
                }
                profile.clone()
            }))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn session(game_id: Uuid, question_ids: &[Uuid]) -> GameSessionEntity {
        GameSessionEntity {
            id: Uuid::new_v4(),
            game_id,
            name: "Friday night".into(),
            started_at: SystemTime::now(),
            ended_at: None,
            current_turn: None,
            number_of_players: 3,
            number_of_ai_players: 0,
            default_timer: 30,
            questions: question_ids
                .iter()
                .copied()
                .map(SessionQuestionEntity::hidden)
                .collect(),
        }
    }

    fn player(session_id: Uuid, user_id: Option<Uuid>, offset: u64) -> PlayerEntity {
        PlayerEntity {
            id: Uuid::new_v4(),
            game_session_id: session_id,
            user_id,
            name: "Ada".into(),
            points: 0,
            role: PlayerRole::Contestant,
            joined_at: SystemTime::UNIX_EPOCH + Duration::from_secs(offset),
        }
    }

    #[tokio::test]
    async fn claim_and_score_succeeds_once() {
        let store = MemoryGameStore::new();
        let question_id = Uuid::new_v4();
        let session = session(Uuid::new_v4(), &[question_id]);
        let session_id = session.id;
        store.insert_session(session).await.unwrap();
        let seated = player(session_id, Some(Uuid::new_v4()), 1);
        let player_id = seated.id;
        store.insert_player(seated).await.unwrap();

        let first = store
            .claim_and_score(session_id, question_id, Some(player_id), Some((player_id, 300)))
            .await
            .unwrap();
        let second = store
            .claim_and_score(session_id, question_id, Some(player_id), Some((player_id, 300)))
            .await
            .unwrap();

        let claimed = first.expect("first claim wins");
        assert!(claimed.question.is_answered && claimed.question.is_revealed);
        assert_eq!(claimed.question.answered_by, Some(player_id));
        assert_eq!(claimed.player.map(|player| player.points), Some(300));
        assert!(second.is_none());
        let stored = store.find_player(player_id).await.unwrap().unwrap();
        assert_eq!(stored.points, 300);
    }

    #[tokio::test]
    async fn claim_for_a_foreign_player_changes_nothing() {
        let store = MemoryGameStore::new();
        let question_id = Uuid::new_v4();
        let session = session(Uuid::new_v4(), &[question_id]);
        let session_id = session.id;
        store.insert_session(session).await.unwrap();
        let elsewhere = player(Uuid::new_v4(), None, 1);
        let elsewhere_id = elsewhere.id;
        store.insert_player(elsewhere).await.unwrap();

        let claimed = store
            .claim_and_score(session_id, question_id, Some(elsewhere_id), Some((elsewhere_id, 100)))
            .await
            .unwrap();
        assert!(claimed.is_none());

        let session = store.find_session(session_id).await.unwrap().unwrap();
        assert!(!session.questions[0].is_answered);
        let stored = store.find_player(elsewhere_id).await.unwrap().unwrap();
        assert_eq!(stored.points, 0);
    }

    #[tokio::test]
    async fn finished_session_fences_scoring_and_joins() {
        let store = MemoryGameStore::new();
        let question_id = Uuid::new_v4();
        let session = session(Uuid::new_v4(), &[question_id]);
        let session_id = session.id;
        store.insert_session(session).await.unwrap();
        let seated = player(session_id, Some(Uuid::new_v4()), 1);
        let player_id = seated.id;
        assert!(store.insert_player(seated).await.unwrap());

        let finished = store
            .finish_session(session_id, SystemTime::now())
            .await
            .unwrap()
            .unwrap();
        assert!(finished.session.is_ended());
        let roster: Vec<Uuid> = finished.players.iter().map(|player| player.id).collect();
        assert_eq!(roster, vec![player_id]);

        let late_score = store
            .claim_and_score(session_id, question_id, Some(player_id), Some((player_id, 500)))
            .await
            .unwrap();
        assert!(late_score.is_none());
        let stored = store.find_player(player_id).await.unwrap().unwrap();
        assert_eq!(stored.points, 0);
        let session = store.find_session(session_id).await.unwrap().unwrap();
        assert!(!session.questions[0].is_answered);

        let late_join = player(session_id, Some(Uuid::new_v4()), 2);
        assert!(!store.insert_player(late_join).await.unwrap());
        assert_eq!(store.list_players(session_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ended_session_rejects_conditional_writes() {
        let store = MemoryGameStore::new();
        let question_id = Uuid::new_v4();
        let session = session(Uuid::new_v4(), &[question_id]);
        let session_id = session.id;
        store.insert_session(session).await.unwrap();

        assert!(
            store
                .finish_session(session_id, SystemTime::now())
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            store
                .finish_session(session_id, SystemTime::now())
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .reveal_question(session_id, question_id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .set_current_turn(session_id, Uuid::new_v4())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn same_user_cannot_join_twice_but_ai_players_can() {
        let store = MemoryGameStore::new();
        let session_id = Uuid::new_v4();
        let user = Uuid::new_v4();

        store.insert_player(player(session_id, Some(user), 1)).await.unwrap();
        let err = store
            .insert_player(player(session_id, Some(user), 2))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Duplicate { .. }));

        store.insert_player(player(session_id, None, 3)).await.unwrap();
        store.insert_player(player(session_id, None, 4)).await.unwrap();
        assert_eq!(store.list_players(session_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn deleting_turn_holder_clears_turn() {
        let store = MemoryGameStore::new();
        let session = session(Uuid::new_v4(), &[]);
        let session_id = session.id;
        store.insert_session(session).await.unwrap();
        let seated = player(session_id, None, 1);
        let player_id = seated.id;
        store.insert_player(seated).await.unwrap();
        store.set_current_turn(session_id, player_id).await.unwrap();

        assert!(store.delete_player(player_id).await.unwrap());
        let session = store.find_session(session_id).await.unwrap().unwrap();
        assert_eq!(session.current_turn, None);
    }

    #[tokio::test]
    async fn delete_game_cascades_to_sessions_and_players() {
        let store = MemoryGameStore::new();
        let game_id = Uuid::new_v4();
        store
            .save_game(GameEntity {
                id: game_id,
                title: "Trivia".into(),
                is_active: true,
                creator_id: Uuid::new_v4(),
                created_at: SystemTime::now(),
                updated_at: SystemTime::now(),
                categories: vec![],
                rows: vec![],
                questions: vec![],
            })
            .await
            .unwrap();
        let session = session(game_id, &[]);
        let session_id = session.id;
        store.insert_session(session).await.unwrap();
        store.insert_player(player(session_id, None, 1)).await.unwrap();

        assert!(store.delete_game(game_id).await.unwrap());
        assert!(store.find_session(session_id).await.unwrap().is_none());
        assert!(store.list_players(session_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_game_result_upserts_profile() {
        let store = MemoryGameStore::new();
        let user = Uuid::new_v4();
        store.record_game_result(user, true).await.unwrap();
        store.record_game_result(user, false).await.unwrap();

        let profile = store.find_profile(user).await.unwrap().unwrap();
        assert_eq!(profile.games_played, 2);
        assert_eq!(profile.games_won, 1);
    }

    #[tokio::test]
    async fn profile_details_upsert_and_stats_require_a_profile() {
        let store = MemoryGameStore::new();
        let user = Uuid::new_v4();
        let stats = ProfileStats {
            rating: Some(1200),
            ..Default::default()
        };
        assert!(store.update_profile_stats(user, stats).await.unwrap().is_none());

        let created = store
            .upsert_profile_details(user, Some("https://img/a.png".into()), None)
            .await
            .unwrap();
        assert_eq!(created.games_played, 0);
        assert_eq!(created.avatar.as_deref(), Some("https://img/a.png"));

        let updated = store
            .upsert_profile_details(user, None, Some("Quiz fan".into()))
            .await
            .unwrap();
        assert_eq!(updated.avatar.as_deref(), Some("https://img/a.png"));
        assert_eq!(updated.bio.as_deref(), Some("Quiz fan"));

        store.record_game_result(user, true).await.unwrap();
        let rated = store.update_profile_stats(user, stats).await.unwrap().unwrap();
        assert_eq!((rated.games_played, rated.games_won, rated.rating), (1, 1, 1200));
    }
}
