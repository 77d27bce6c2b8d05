use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{DateTime, Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{
        MongoGameDocument, MongoPlayerDocument, MongoProfileDocument, MongoSessionDocument,
        bson_uuid, doc_id, optional_uuid, role_value,
    },
};
use crate::dao::{
    game_store::{ClaimedAnswer, FinishedSession, GameStore, ProfileStats},
    models::{
        GameEntity, GameSessionEntity, PlayerEntity, PlayerRole, ProfileEntity,
        SessionQuestionEntity,
    },
    storage::{StorageError, StorageResult},
};

const GAME_COLLECTION_NAME: &str = "games";
const SESSION_COLLECTION_NAME: &str = "game_sessions";
const PLAYER_COLLECTION_NAME: &str = "players";
const PROFILE_COLLECTION_NAME: &str = "profiles";

/// MongoDB-backed [`GameStore`] implementation.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    // Kept alive alongside the database handle.
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = establish_connection(&self.config).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

/// Filter matching a session that has not been finalized yet.
fn live_session(session_id: Uuid) -> Document {
    doc! {"_id": bson_uuid(session_id), "ended_at": null}
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = establish_connection(&config).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let sessions = database.collection::<Document>(SESSION_COLLECTION_NAME);
        let session_index = IndexModel::builder()
            .keys(doc! {"game_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("session_game_idx".to_owned()))
                    .build(),
            )
            .build();
        sessions
            .create_index(session_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SESSION_COLLECTION_NAME,
                index: "game_id",
                source,
            })?;

        // One seat per user and session; AI players carry no user id and are not constrained.
        let players = database.collection::<Document>(PLAYER_COLLECTION_NAME);
        let seat_index = IndexModel::builder()
            .keys(doc! {"game_session_id": 1, "user_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("player_seat_idx".to_owned()))
                    .unique(Some(true))
                    .partial_filter_expression(Some(doc! {"user_id": {"$type": "binData"}}))
                    .build(),
            )
            .build();
        players
            .create_index(seat_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PLAYER_COLLECTION_NAME,
                index: "game_session_id,user_id",
                source,
            })?;

        let user_index = IndexModel::builder()
            .keys(doc! {"user_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("player_user_idx".to_owned()))
                    .build(),
            )
            .build();
        players
            .create_index(user_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PLAYER_COLLECTION_NAME,
                index: "user_id",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn games(&self) -> Collection<MongoGameDocument> {
        self.database().await.collection(GAME_COLLECTION_NAME)
    }

    async fn sessions(&self) -> Collection<MongoSessionDocument> {
        self.database().await.collection(SESSION_COLLECTION_NAME)
    }

    async fn players(&self) -> Collection<MongoPlayerDocument> {
        self.database().await.collection(PLAYER_COLLECTION_NAME)
    }

    async fn profiles(&self) -> Collection<MongoProfileDocument> {
        self.database().await.collection(PROFILE_COLLECTION_NAME)
    }

    async fn save_game(&self, game: GameEntity) -> MongoResult<()> {
        let id = game.id;
        let document: MongoGameDocument = game.into();
        self.games()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveGame { id, source })?;
        Ok(())
    }

    async fn find_game(&self, id: Uuid) -> MongoResult<Option<GameEntity>> {
        let document = self
            .games()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn list_games(&self) -> MongoResult<Vec<GameEntity>> {
        let documents: Vec<MongoGameDocument> = self
            .games()
            .await
            .find(doc! {})
            .sort(doc! {"created_at": 1})
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn delete_game(&self, id: Uuid) -> MongoResult<bool> {
        let result = self
            .games()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeleteGame { id, source })?;
        if result.deleted_count == 0 {
            return Ok(false);
        }

        let sessions = self.sessions().await;
        let session_ids: Vec<_> = sessions
            .find(doc! {"game_id": bson_uuid(id)})
            .await
            .map_err(|source| MongoDaoError::DeleteGame { id, source })?
            .try_collect::<Vec<MongoSessionDocument>>()
            .await
            .map_err(|source| MongoDaoError::DeleteGame { id, source })?
            .into_iter()
            .map(|document| bson_uuid(GameSessionEntity::from(document).id))
            .collect();

        self.players()
            .await
            .delete_many(doc! {"game_session_id": {"$in": session_ids}})
            .await
            .map_err(|source| MongoDaoError::DeleteGame { id, source })?;
        sessions
            .delete_many(doc! {"game_id": bson_uuid(id)})
            .await
            .map_err(|source| MongoDaoError::DeleteGame { id, source })?;
        Ok(true)
    }

    async fn insert_session(&self, session: GameSessionEntity) -> MongoResult<()> {
        let id = session.id;
        let document: MongoSessionDocument = session.into();
        self.sessions()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveSession { id, source })?;
        Ok(())
    }

    async fn find_session(&self, id: Uuid) -> MongoResult<Option<GameSessionEntity>> {
        let document = self
            .sessions()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadSession { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn list_sessions(&self) -> MongoResult<Vec<GameSessionEntity>> {
        let documents: Vec<MongoSessionDocument> = self
            .sessions()
            .await
            .find(doc! {})
            .sort(doc! {"started_at": -1})
            .await
            .map_err(|source| MongoDaoError::ListSessions { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListSessions { source })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn delete_session(&self, id: Uuid) -> MongoResult<bool> {
        let result = self
            .sessions()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeleteSession { id, source })?;
        if result.deleted_count == 0 {
            return Ok(false);
        }
        self.players()
            .await
            .delete_many(doc! {"game_session_id": bson_uuid(id)})
            .await
            .map_err(|source| MongoDaoError::DeleteSession { id, source })?;
        Ok(true)
    }

    /// Apply `update` to a live session, returning the updated session if the filter matched.
    async fn update_live_session(
        &self,
        id: Uuid,
        filter: Document,
        update: Document,
    ) -> MongoResult<Option<GameSessionEntity>> {
        let document = self
            .sessions()
            .await
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::UpdateSession { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn set_current_turn(
        &self,
        session_id: Uuid,
        player_id: Uuid,
    ) -> MongoResult<Option<GameSessionEntity>> {
        self.update_live_session(
            session_id,
            live_session(session_id),
            doc! {"$set": {"current_turn": bson_uuid(player_id)}},
        )
        .await
    }

    async fn reveal_question(
        &self,
        session_id: Uuid,
        question_id: Uuid,
    ) -> MongoResult<Option<SessionQuestionEntity>> {
        let mut filter = live_session(session_id);
        filter.insert("questions.question_id", bson_uuid(question_id));
        let session = self
            .update_live_session(
                session_id,
                filter,
                doc! {"$set": {"questions.$.is_revealed": true}},
            )
            .await?;
        Ok(session.and_then(|session| session.question(question_id).cloned()))
    }

    async fn claim_question(
        &self,
        session_id: Uuid,
        question_id: Uuid,
        player_id: Option<Uuid>,
    ) -> MongoResult<Option<SessionQuestionEntity>> {
        let mut filter = live_session(session_id);
        filter.insert(
            "questions",
            doc! {"$elemMatch": {"question_id": bson_uuid(question_id), "is_answered": false}},
        );
        let session = self
            .update_live_session(
                session_id,
                filter,
                doc! {"$set": {
                    "questions.$.is_revealed": true,
                    "questions.$.is_answered": true,
                    "questions.$.answered_by": optional_uuid(player_id),
                }},
            )
            .await?;
        Ok(session.and_then(|session| session.question(question_id).cloned()))
    }

    /// Undo a claim whose score could not be applied, as long as the session is live.
    async fn release_question(
        &self,
        session_id: Uuid,
        question_id: Uuid,
        answered_by: Option<Uuid>,
    ) -> MongoResult<()> {
        let mut filter = live_session(session_id);
        filter.insert(
            "questions",
            doc! {"$elemMatch": {
                "question_id": bson_uuid(question_id),
                "is_answered": true,
                "answered_by": optional_uuid(answered_by),
            }},
        );
        self.update_live_session(
            session_id,
            filter,
            doc! {"$set": {
                "questions.$.is_answered": false,
                "questions.$.answered_by": null,
            }},
        )
        .await?;
        Ok(())
    }

    /// Claim the question, then add the points to a player whose scores are still open.
    /// `finish_session` closes the scores of every seated player before the standings are
    /// read, so a score either lands before finalization or not at all.
    async fn claim_and_score(
        &self,
        session_id: Uuid,
        question_id: Uuid,
        answered_by: Option<Uuid>,
        score: Option<(Uuid, i32)>,
    ) -> MongoResult<Option<ClaimedAnswer>> {
        if let Some((player_id, _)) = score {
            let seated = self
                .find_player(player_id)
                .await?
                .is_some_and(|player| player.game_session_id == session_id);
            if !seated {
                return Ok(None);
            }
        }

        let Some(question) = self
            .claim_question(session_id, question_id, answered_by)
            .await?
        else {
            return Ok(None);
        };
        let Some((player_id, delta)) = score else {
            return Ok(Some(ClaimedAnswer {
                question,
                player: None,
            }));
        };

        let scored = self
            .players()
            .await
            .find_one_and_update(
                doc! {
                    "_id": bson_uuid(player_id),
                    "game_session_id": bson_uuid(session_id),
                    "scores_closed": {"$ne": true},
                },
                doc! {"$inc": {"points": delta}},
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::UpdatePlayer {
                id: player_id,
                source,
            })?;
        match scored {
            Some(player) => Ok(Some(ClaimedAnswer {
                question,
                player: Some(player.into()),
            })),
            None => {
                self.release_question(session_id, question_id, answered_by)
                    .await?;
                Ok(None)
            }
        }
    }

    async fn finish_session(
        &self,
        session_id: Uuid,
        ended_at: SystemTime,
    ) -> MongoResult<Option<FinishedSession>> {
        let finished = self
            .sessions()
            .await
            .find_one_and_update(
                live_session(session_id),
                doc! {"$set": {"ended_at": DateTime::from_system_time(ended_at)}},
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::UpdateSession {
                id: session_id,
                source,
            })?;
        let Some(document) = finished else {
            return Ok(None);
        };

        self.players()
            .await
            .update_many(
                doc! {"game_session_id": bson_uuid(session_id)},
                doc! {"$set": {"scores_closed": true}},
            )
            .await
            .map_err(|source| MongoDaoError::UpdateSession {
                id: session_id,
                source,
            })?;

        // `seated` was frozen by the same write that set `ended_at`.
        let players = self
            .list_players_matching(doc! {
                "game_session_id": bson_uuid(session_id),
                "_id": {"$in": document.seated().to_vec()},
            })
            .await?;
        Ok(Some(FinishedSession {
            session: document.into(),
            players,
        }))
    }

    async fn insert_player(&self, player: PlayerEntity) -> StorageResult<bool> {
        let id = player.id;
        let session_id = player.game_session_id;
        let document: MongoPlayerDocument = player.into();
        match self.players().await.insert_one(&document).await {
            Ok(_) => {}
            Err(source) if is_duplicate_key(&source) => {
                return Err(StorageError::duplicate(format!(
                    "user already joined session {session_id}"
                )));
            }
            Err(source) => return Err(MongoDaoError::SavePlayer { id, source }.into()),
        }

        // The seat only counts once the live session admits it.
        let admitted = self
            .sessions()
            .await
            .update_one(
                live_session(session_id),
                doc! {"$addToSet": {"seated": bson_uuid(id)}},
            )
            .await
            .map_err(|source| MongoDaoError::UpdateSession {
                id: session_id,
                source,
            })?;
        if admitted.matched_count == 0 {
            self.players()
                .await
                .delete_one(doc_id(id))
                .await
                .map_err(|source| MongoDaoError::UpdatePlayer { id, source })?;
            return Ok(false);
        }
        Ok(true)
    }

    async fn find_player(&self, id: Uuid) -> MongoResult<Option<PlayerEntity>> {
        let document = self
            .players()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadPlayers { source })?;
        Ok(document.map(Into::into))
    }

    async fn list_players_matching(&self, filter: Document) -> MongoResult<Vec<PlayerEntity>> {
        let documents: Vec<MongoPlayerDocument> = self
            .players()
            .await
            .find(filter)
            .sort(doc! {"joined_at": 1})
            .await
            .map_err(|source| MongoDaoError::LoadPlayers { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadPlayers { source })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn update_player(
        &self,
        id: Uuid,
        name: Option<String>,
        role: Option<PlayerRole>,
    ) -> MongoResult<Option<PlayerEntity>> {
        let mut changes = Document::new();
        if let Some(name) = name {
            changes.insert("name", name);
        }
        if let Some(role) = role {
            changes.insert("role", role_value(role));
        }
        if changes.is_empty() {
            return self.find_player(id).await;
        }
        self.modify_player(id, doc! {"$set": changes}).await
    }

    async fn modify_player(&self, id: Uuid, update: Document) -> MongoResult<Option<PlayerEntity>> {
        let document = self
            .players()
            .await
            .find_one_and_update(doc_id(id), update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::UpdatePlayer { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn delete_player(&self, id: Uuid) -> MongoResult<bool> {
        let deleted = self
            .players()
            .await
            .find_one_and_delete(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::UpdatePlayer { id, source })?;
        let Some(document) = deleted else {
            return Ok(false);
        };

        let player: PlayerEntity = document.into();
        let sessions = self.sessions().await;
        sessions
            .update_one(
                doc_id(player.game_session_id),
                doc! {"$pull": {"seated": bson_uuid(id)}},
            )
            .await
            .map_err(|source| MongoDaoError::UpdateSession {
                id: player.game_session_id,
                source,
            })?;
        sessions
            .update_one(
                doc! {"_id": bson_uuid(player.game_session_id), "current_turn": bson_uuid(id)},
                doc! {"$set": {"current_turn": null}},
            )
            .await
            .map_err(|source| MongoDaoError::UpdateSession {
                id: player.game_session_id,
                source,
            })?;
        Ok(true)
    }

    async fn find_profile(&self, user_id: Uuid) -> MongoResult<Option<ProfileEntity>> {
        let document = self
            .profiles()
            .await
            .find_one(doc_id(user_id))
            .await
            .map_err(|source| MongoDaoError::LoadProfile { user_id, source })?;
        Ok(document.map(Into::into))
    }

    async fn record_game_result(&self, user_id: Uuid, won: bool) -> MongoResult<()> {
        let won: i64 = if won { 1 } else { 0 };
        self.profiles()
            .await
            .update_one(
                doc_id(user_id),
                doc! {
                    "$inc": {"games_played": 1_i64, "games_won": won},
                    "$setOnInsert": {"rating": 0},
                },
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::UpdateProfile { user_id, source })?;
        Ok(())
    }

    async fn modify_profile(
        &self,
        user_id: Uuid,
        update: Document,
        upsert: bool,
    ) -> MongoResult<Option<ProfileEntity>> {
        let document = self
            .profiles()
            .await
            .find_one_and_update(doc_id(user_id), update)
            .upsert(upsert)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::UpdateProfile { user_id, source })?;
        Ok(document.map(Into::into))
    }

    async fn upsert_profile_details(
        &self,
        user_id: Uuid,
        avatar: Option<String>,
        bio: Option<String>,
    ) -> MongoResult<ProfileEntity> {
        let mut changes = Document::new();
        if let Some(avatar) = avatar {
            changes.insert("avatar", avatar);
        }
        if let Some(bio) = bio {
            changes.insert("bio", bio);
        }
        let mut update = doc! {
            "$setOnInsert": {"games_played": 0_i64, "games_won": 0_i64, "rating": 0},
        };
        if !changes.is_empty() {
            update.insert("$set", changes);
        }
        let profile = self.modify_profile(user_id, update, true).await?;
        Ok(profile.unwrap_or_else(|| ProfileEntity::empty(user_id)))
    }

    async fn update_profile_stats(
        &self,
        user_id: Uuid,
        stats: ProfileStats,
    ) -> MongoResult<Option<ProfileEntity>> {
        let mut changes = Document::new();
        if let Some(games_played) = stats.games_played {
            changes.insert("games_played", i64::from(games_played));
        }
        if let Some(games_won) = stats.games_won {
            changes.insert("games_won", i64::from(games_won));
        }
        if let Some(rating) = stats.rating {
            changes.insert("rating", rating);
        }
        if changes.is_empty() {
            return self.find_profile(user_id).await;
        }
        self.modify_profile(user_id, doc! {"$set": changes}, false)
            .await
    }
}

impl GameStore for MongoGameStore {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_games().await.map_err(Into::into) })
    }

    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_game(id).await.map_err(Into::into) })
    }

    fn insert_session(&self, session: GameSessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_session(session).await.map_err(Into::into) })
    }

    fn find_session(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_session(id).await.map_err(Into::into) })
    }

    fn list_sessions(&self) -> BoxFuture<'static, StorageResult<Vec<GameSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_sessions().await.map_err(Into::into) })
    }

    fn delete_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_session(id).await.map_err(Into::into) })
    }

    fn set_current_turn(
        &self,
        session_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .set_current_turn(session_id, player_id)
                .await
                .map_err(Into::into)
        })
    }

    fn reveal_question(
        &self,
        session_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SessionQuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .reveal_question(session_id, question_id)
                .await
                .map_err(Into::into)
        })
    }

    fn claim_and_score(
        &self,
        session_id: Uuid,
        question_id: Uuid,
        answered_by: Option<Uuid>,
        score: Option<(Uuid, i32)>,
    ) -> BoxFuture<'static, StorageResult<Option<ClaimedAnswer>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .claim_and_score(session_id, question_id, answered_by, score)
                .await
                .map_err(Into::into)
        })
    }

    fn finish_session(
        &self,
        session_id: Uuid,
        ended_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<FinishedSession>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .finish_session(session_id, ended_at)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.insert_player(player).await })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_player(id).await.map_err(Into::into) })
    }

    fn list_players(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_players_matching(doc! {"game_session_id": bson_uuid(session_id)})
                .await
                .map_err(Into::into)
        })
    }

    fn list_players_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_players_matching(doc! {"user_id": bson_uuid(user_id)})
                .await
                .map_err(Into::into)
        })
    }

    fn update_player(
        &self,
        id: Uuid,
        name: Option<String>,
        role: Option<PlayerRole>,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.update_player(id, name, role).await.map_err(Into::into) })
    }

    fn delete_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_player(id).await.map_err(Into::into) })
    }

    fn find_profile(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ProfileEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_profile(user_id).await.map_err(Into::into) })
    }

    fn record_game_result(
        &self,
        user_id: Uuid,
        won: bool,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .record_game_result(user_id, won)
                .await
                .map_err(Into::into)
        })
    }

    fn upsert_profile_details(
        &self,
        user_id: Uuid,
        avatar: Option<String>,
        bio: Option<String>,
    ) -> BoxFuture<'static, StorageResult<ProfileEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .upsert_profile_details(user_id, avatar, bio)
                .await
                .map_err(Into::into)
        })
    }

    fn update_profile_stats(
        &self,
        user_id: Uuid,
        stats: ProfileStats,
    ) -> BoxFuture<'static, StorageResult<Option<ProfileEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_profile_stats(user_id, stats)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
