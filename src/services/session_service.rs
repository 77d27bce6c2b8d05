//! Session lifecycle: creation with grid materialization, turn handling, question
//! transitions with scoring, and finalization with profile statistics.
//!
//! Every write that must happen at most once (answer claim, finalization) is a single
//! conditional store operation; a `None` result means another request won the race
//! or the session already ended.

use std::{collections::HashMap, time::SystemTime};

use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::{
        game_store::FinishedSession,
        models::{GameEntity, GameSessionEntity, PlayerEntity, SessionQuestionEntity},
    },
    dto::session::{
        CreateSessionRequest, ScoreChange, SessionDetail, SessionQuestionDto,
        SessionQuestionUpdate, SessionSummary, UpdateSessionQuestionRequest, UpdateTurnRequest,
    },
    error::ServiceError,
    services::sse_events,
    state::{
        SharedState,
        identity::Caller,
        question_state::{QuestionStatus, plan_update},
        session::{
            SessionRole, SessionSettings, can_administer, can_manage_board, can_set_turn,
            derive_role, is_seated, point_delta, select_winner,
        },
    },
};

/// Session loaded together with its board and seated players.
struct SessionContext {
    session: GameSessionEntity,
    game: GameEntity,
    players: Vec<PlayerEntity>,
}

impl SessionContext {
    fn role_of(&self, caller: &Caller) -> SessionRole {
        derive_role(self.game.creator_id, caller.user_id, &self.players)
    }

    fn player(&self, id: Uuid) -> Option<&PlayerEntity> {
        self.players.iter().find(|player| player.id == id)
    }

    fn ensure_live(&self) -> Result<(), ServiceError> {
        if self.session.is_ended() {
            Err(ServiceError::InvalidState(format!(
                "session `{}` has already ended",
                self.session.id
            )))
        } else {
            Ok(())
        }
    }
}

async fn load_context(state: &SharedState, session_id: Uuid) -> Result<SessionContext, ServiceError> {
    let store = state.require_game_store().await?;
    let session = store
        .find_session(session_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game session `{session_id}` not found")))?;
    let game = store.find_game(session.game_id).await?.ok_or_else(|| {
        ServiceError::NotFound(format!("game `{}` not found", session.game_id))
    })?;
    let players = store.list_players(session_id).await?;
    Ok(SessionContext {
        session,
        game,
        players,
    })
}

/// Start a session and snapshot every question of the game into it.
pub async fn create_session(
    state: &SharedState,
    caller: &Caller,
    request: CreateSessionRequest,
) -> Result<SessionDetail, ServiceError> {
    request.validate()?;
    let settings = SessionSettings::resolve(
        request.number_of_players,
        request.number_of_ai_players,
        request.default_timer,
    )
    .map_err(ServiceError::InvalidInput)?;
    let (Some(game_id), Some(name)) = (request.game_id, request.name) else {
        return Err(ServiceError::InvalidInput("gameId and name are required".into()));
    };

    let store = state.require_game_store().await?;
    let game = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;

    let session = GameSessionEntity {
        id: Uuid::new_v4(),
        game_id,
        name: name.trim().to_owned(),
        started_at: SystemTime::now(),
        ended_at: None,
        current_turn: None,
        number_of_players: settings.number_of_players,
        number_of_ai_players: settings.number_of_ai_players,
        default_timer: settings.default_timer,
        questions: game
            .questions
            .iter()
            .map(|question| SessionQuestionEntity::hidden(question.id))
            .collect(),
    };
    store.insert_session(session.clone()).await?;

    info!(
        session_id = %session.id,
        %game_id,
        questions = session.questions.len(),
        "game session created"
    );
    let role = derive_role(game.creator_id, caller.user_id, &[]);
    Ok(SessionDetail::new(&session, &game, &[], role))
}

/// Sessions the caller hosts or is seated in; every session for admins.
pub async fn list_sessions(
    state: &SharedState,
    caller: &Caller,
) -> Result<Vec<SessionSummary>, ServiceError> {
    let store = state.require_game_store().await?;
    let sessions = store.list_sessions().await?;

    let mut games: HashMap<Uuid, Option<GameEntity>> = HashMap::new();
    let mut summaries = Vec::new();
    for session in sessions {
        if !games.contains_key(&session.game_id) {
            let game = store.find_game(session.game_id).await?;
            games.insert(session.game_id, game);
        }
        let Some(Some(game)) = games.get(&session.game_id) else {
            debug!(session_id = %session.id, "skipping session whose game is gone");
            continue;
        };

        let players = store.list_players(session.id).await?;
        let visible = caller.is_admin()
            || game.creator_id == caller.user_id
            || is_seated(caller.user_id, &players);
        if !visible {
            continue;
        }

        let role = derive_role(game.creator_id, caller.user_id, &players);
        summaries.push(SessionSummary::new(&session, game, &players, role));
    }
    Ok(summaries)
}

/// Full view of a session annotated with the caller's role.
pub async fn get_session(
    state: &SharedState,
    caller: &Caller,
    session_id: Uuid,
) -> Result<SessionDetail, ServiceError> {
    let context = load_context(state, session_id).await?;
    let role = context.role_of(caller);
    Ok(SessionDetail::new(
        &context.session,
        &context.game,
        &context.players,
        role,
    ))
}

/// Hand the turn to a player seated in the same session.
pub async fn set_turn(
    state: &SharedState,
    caller: &Caller,
    session_id: Uuid,
    request: UpdateTurnRequest,
) -> Result<SessionSummary, ServiceError> {
    let context = load_context(state, session_id).await?;
    let role = context.role_of(caller);
    if !can_set_turn(role, caller, &context.players) {
        return Err(ServiceError::Forbidden(
            "only players of this session can change the turn".into(),
        ));
    }

    let target = request
        .current_turn
        .ok_or_else(|| ServiceError::InvalidInput("currentTurn is required".into()))?;
    if context.player(target).is_none() {
        return Err(ServiceError::InvalidInput(format!(
            "player `{target}` is not seated in this session"
        )));
    }
    context.ensure_live()?;

    let store = state.require_game_store().await?;
    let session = store
        .set_current_turn(session_id, target)
        .await?
        .ok_or_else(|| ServiceError::InvalidState(format!("session `{session_id}` has already ended")))?;

    debug!(%session_id, player_id = %target, "turn changed");
    sse_events::broadcast_turn_changed(state, &session);
    Ok(SessionSummary::new(
        &session,
        &context.game,
        &context.players,
        role,
    ))
}

/// Reveal and/or answer a question, scoring the responding player when the answer
/// carries `playerId` and `isCorrect`.
pub async fn update_question(
    state: &SharedState,
    caller: &Caller,
    session_id: Uuid,
    question_id: Uuid,
    request: UpdateSessionQuestionRequest,
) -> Result<SessionQuestionUpdate, ServiceError> {
    let context = load_context(state, session_id).await?;
    let role = context.role_of(caller);
    if !can_manage_board(role, caller) {
        return Err(ServiceError::Forbidden(
            "only the host, a gamemaster or an admin can update questions".into(),
        ));
    }

    let current = context.session.question(question_id).ok_or_else(|| {
        ServiceError::NotFound(format!(
            "question `{question_id}` not found in session `{session_id}`"
        ))
    })?;
    if let Some(player_id) = request.player_id {
        if context.player(player_id).is_none() {
            return Err(ServiceError::InvalidInput(format!(
                "player `{player_id}` is not seated in this session"
            )));
        }
    }
    context.ensure_live()?;

    let plan = plan_update(
        QuestionStatus::from_flags(current.is_revealed, current.is_answered),
        request.is_revealed,
        request.is_answered,
    )?;

    // Resolve the scoring before any write so a rejected request leaves the question open.
    let scoring = match (request.player_id, request.is_correct) {
        (Some(player_id), Some(correct)) if plan.answers() => {
            let value = context.game.question_value(question_id).ok_or_else(|| {
                ServiceError::InvalidState(format!(
                    "question `{question_id}` has no point value on the board"
                ))
            })?;
            Some((player_id, point_delta(value, correct)))
        }
        _ => None,
    };

    let store = state.require_game_store().await?;
    let mut score = None;
    let updated = if plan.answers() {
        let claimed = store
            .claim_and_score(session_id, question_id, request.player_id, scoring)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidState(format!(
                    "question `{question_id}` can no longer be answered in session `{session_id}`"
                ))
            })?;

        match (scoring, claimed.player) {
            (Some((player_id, delta)), Some(player)) => {
                info!(%session_id, %question_id, %player_id, delta, points = player.points, "answer scored");
                score = Some(ScoreChange {
                    player_id,
                    delta,
                    points: player.points,
                });
            }
            _ => info!(%session_id, %question_id, "question answered without scoring"),
        }
        claimed.question
    } else if plan.reveals() {
        let revealed = store
            .reveal_question(session_id, question_id)
            .await?
            .ok_or_else(|| ServiceError::InvalidState(format!("session `{session_id}` has already ended")))?;
        debug!(%session_id, %question_id, "question revealed");
        revealed
    } else {
        current.clone()
    };

    let update = SessionQuestionUpdate {
        question: SessionQuestionDto::new(&updated, &context.game),
        score,
    };
    if plan.answers() || plan.reveals() {
        sse_events::broadcast_question_changed(state, session_id, update.clone());
    }
    Ok(update)
}

/// Close the session, pick the winner and update the players' profiles.
///
/// Only the first finalization succeeds; later calls fail with a conflict and leave
/// statistics untouched.
pub async fn end_session(
    state: &SharedState,
    caller: &Caller,
    session_id: Uuid,
) -> Result<SessionDetail, ServiceError> {
    let context = load_context(state, session_id).await?;
    let role = context.role_of(caller);
    if !can_manage_board(role, caller) {
        return Err(ServiceError::Forbidden(
            "only the host, a gamemaster or an admin can end the session".into(),
        ));
    }

    let store = state.require_game_store().await?;
    let FinishedSession { session, players } = store
        .finish_session(session_id, SystemTime::now())
        .await?
        .ok_or_else(|| ServiceError::InvalidState(format!("session `{session_id}` has already ended")))?;

    // `finish_session` fences scoring and joins, so these standings are final.
    let winner_id = select_winner(&players).map(|player| player.id);
    for player in &players {
        let Some(user_id) = player.user_id else {
            continue;
        };
        store
            .record_game_result(user_id, Some(player.id) == winner_id)
            .await?;
    }

    match winner_id {
        Some(winner_id) => info!(%session_id, %winner_id, "game session finished"),
        None => info!(%session_id, "game session finished without a single winner"),
    }
    sse_events::broadcast_session_ended(state, &session, winner_id, &players);
    Ok(SessionDetail::new(&session, &context.game, &players, role))
}

/// Delete a session with its players. Host or admin only.
pub async fn delete_session(
    state: &SharedState,
    caller: &Caller,
    session_id: Uuid,
) -> Result<(), ServiceError> {
    let context = load_context(state, session_id).await?;
    if !can_administer(context.role_of(caller), caller) {
        return Err(ServiceError::Forbidden(
            "only the host or an admin can delete the session".into(),
        ));
    }

    let store = state.require_game_store().await?;
    if !store.delete_session(session_id).await? {
        return Err(ServiceError::NotFound(format!(
            "game session `{session_id}` not found"
        )));
    }
    state.session_streams().close(session_id);
    info!(%session_id, "game session deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{game_store::MemoryGameStore, models::PlayerRole},
        services::catalog_service,
        state::{AppState, identity::SystemRole},
    };
    use std::sync::Arc;

    struct Fixture {
        state: SharedState,
        host: Caller,
        game: GameEntity,
    }

    async fn fixture() -> Fixture {
        let state =
            AppState::with_store(AppConfig::default(), None, Arc::new(MemoryGameStore::new()))
                .await;
        let host = Caller::new(Uuid::new_v4(), SystemRole::User);
        let detail = catalog_service::create_template_game(&state, &host)
            .await
            .unwrap();
        let store = state.game_store().await.unwrap();
        let game = store.find_game(detail.id).await.unwrap().unwrap();
        Fixture { state, host, game }
    }

    fn create_request(game_id: Uuid) -> CreateSessionRequest {
        CreateSessionRequest {
            game_id: Some(game_id),
            name: Some("Friday quiz".into()),
            ..Default::default()
        }
    }

    async fn seat(state: &SharedState, session_id: Uuid, user_id: Option<Uuid>) -> PlayerEntity {
        let player = PlayerEntity {
            id: Uuid::new_v4(),
            game_session_id: session_id,
            user_id,
            name: "seat".into(),
            points: 0,
            role: PlayerRole::Contestant,
            joined_at: SystemTime::now(),
        };
        let store = state.game_store().await.unwrap();
        store.insert_player(player.clone()).await.unwrap();
        player
    }

    #[tokio::test]
    async fn create_materializes_every_question() {
        let fx = fixture().await;
        let session = create_session(&fx.state, &fx.host, create_request(fx.game.id))
            .await
            .unwrap();

        assert_eq!(session.questions.len(), 25);
        assert!(session.questions.iter().all(|q| !q.is_revealed && !q.is_answered));
        assert_eq!(session.session.user_role, SessionRole::Host);
        assert!(session.session.players.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_unknown_game_and_bad_settings() {
        let fx = fixture().await;
        let missing = create_session(&fx.state, &fx.host, create_request(Uuid::new_v4())).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));

        let mut request = create_request(fx.game.id);
        request.default_timer = Some(500);
        let invalid = create_session(&fx.state, &fx.host, request).await;
        assert!(matches!(invalid, Err(ServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn turn_requires_seat_for_caller_and_target() {
        let fx = fixture().await;
        let session = create_session(&fx.state, &fx.host, create_request(fx.game.id))
            .await
            .unwrap();
        let user = Caller::new(Uuid::new_v4(), SystemRole::User);
        let outsider = Caller::new(Uuid::new_v4(), SystemRole::User);
        let player = seat(&fx.state, session.session.id, Some(user.user_id)).await;

        let denied = set_turn(
            &fx.state,
            &outsider,
            session.session.id,
            UpdateTurnRequest {
                current_turn: Some(player.id),
            },
        )
        .await;
        assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

        let stranger_target = set_turn(
            &fx.state,
            &user,
            session.session.id,
            UpdateTurnRequest {
                current_turn: Some(Uuid::new_v4()),
            },
        )
        .await;
        assert!(matches!(stranger_target, Err(ServiceError::InvalidInput(_))));

        let updated = set_turn(
            &fx.state,
            &user,
            session.session.id,
            UpdateTurnRequest {
                current_turn: Some(player.id),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.current_turn, Some(player.id));
    }

    #[tokio::test]
    async fn answered_question_scores_once_and_cannot_be_hidden() {
        let fx = fixture().await;
        let session = create_session(&fx.state, &fx.host, create_request(fx.game.id))
            .await
            .unwrap();
        let session_id = session.session.id;
        let player = seat(&fx.state, session_id, Some(Uuid::new_v4())).await;
        let question = &session.questions[0];

        let answer = || UpdateSessionQuestionRequest {
            is_answered: Some(true),
            player_id: Some(player.id),
            is_correct: Some(true),
            ..Default::default()
        };
        let first = update_question(&fx.state, &fx.host, session_id, question.question_id, answer())
            .await
            .unwrap();
        let value = question.value.unwrap();
        let score = first.score.unwrap();
        assert_eq!(score.delta, value);
        assert_eq!(score.points, value);
        assert!(first.question.is_answered && first.question.is_revealed);
        assert_eq!(first.question.answered_by, Some(player.id));

        let second =
            update_question(&fx.state, &fx.host, session_id, question.question_id, answer()).await;
        assert!(matches!(second, Err(ServiceError::InvalidState(_))));

        let hide = update_question(
            &fx.state,
            &fx.host,
            session_id,
            question.question_id,
            UpdateSessionQuestionRequest {
                is_revealed: Some(false),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(hide, Err(ServiceError::InvalidState(_))));

        let store = fx.state.game_store().await.unwrap();
        let reloaded = store.find_player(player.id).await.unwrap().unwrap();
        assert_eq!(reloaded.points, value);
    }

    #[tokio::test]
    async fn unscorable_answer_leaves_the_question_open() {
        let fx = fixture().await;
        let session = create_session(&fx.state, &fx.host, create_request(fx.game.id))
            .await
            .unwrap();
        let session_id = session.session.id;
        let player = seat(&fx.state, session_id, Some(Uuid::new_v4())).await;
        let question = &session.questions[0];
        catalog_service::delete_row(&fx.state, &fx.host, fx.game.id, question.row_id.unwrap())
            .await
            .unwrap();

        let scored = update_question(
            &fx.state,
            &fx.host,
            session_id,
            question.question_id,
            UpdateSessionQuestionRequest {
                is_answered: Some(true),
                player_id: Some(player.id),
                is_correct: Some(true),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(scored, Err(ServiceError::InvalidState(_))));

        let detail = get_session(&fx.state, &fx.host, session_id).await.unwrap();
        let untouched = detail
            .questions
            .iter()
            .find(|q| q.question_id == question.question_id)
            .unwrap();
        assert!(!untouched.is_answered);
        assert_eq!(untouched.answered_by, None);

        let closed = update_question(
            &fx.state,
            &fx.host,
            session_id,
            question.question_id,
            UpdateSessionQuestionRequest {
                is_answered: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(closed.question.is_answered);
        assert!(closed.score.is_none());
    }

    #[tokio::test]
    async fn scores_cannot_move_after_the_session_ends() {
        let fx = fixture().await;
        let session = create_session(&fx.state, &fx.host, create_request(fx.game.id))
            .await
            .unwrap();
        let session_id = session.session.id;
        let user_id = Uuid::new_v4();
        let player = seat(&fx.state, session_id, Some(user_id)).await;
        let rival = seat(&fx.state, session_id, Some(Uuid::new_v4())).await;
        let first = &session.questions[0];

        update_question(
            &fx.state,
            &fx.host,
            session_id,
            first.question_id,
            UpdateSessionQuestionRequest {
                is_answered: Some(true),
                player_id: Some(player.id),
                is_correct: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        end_session(&fx.state, &fx.host, session_id).await.unwrap();

        let store = fx.state.game_store().await.unwrap();
        let late = store
            .claim_and_score(
                session_id,
                session.questions[1].question_id,
                Some(rival.id),
                Some((rival.id, 500)),
            )
            .await
            .unwrap();
        assert!(late.is_none());

        let rival = store.find_player(rival.id).await.unwrap().unwrap();
        assert_eq!(rival.points, 0);
        let profile = store.find_profile(user_id).await.unwrap().unwrap();
        assert_eq!((profile.games_played, profile.games_won), (1, 1));
    }

    #[tokio::test]
    async fn plain_players_cannot_touch_the_board() {
        let fx = fixture().await;
        let session = create_session(&fx.state, &fx.host, create_request(fx.game.id))
            .await
            .unwrap();
        let user = Caller::new(Uuid::new_v4(), SystemRole::User);
        seat(&fx.state, session.session.id, Some(user.user_id)).await;

        let result = update_question(
            &fx.state,
            &user,
            session.session.id,
            session.questions[0].question_id,
            UpdateSessionQuestionRequest {
                is_revealed: Some(true),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn ending_twice_is_rejected_and_freezes_the_session() {
        let fx = fixture().await;
        let session = create_session(&fx.state, &fx.host, create_request(fx.game.id))
            .await
            .unwrap();
        let session_id = session.session.id;
        let user_id = Uuid::new_v4();
        let player = seat(&fx.state, session_id, Some(user_id)).await;

        let ended = end_session(&fx.state, &fx.host, session_id).await.unwrap();
        assert!(ended.session.ended_at.is_some());

        let again = end_session(&fx.state, &fx.host, session_id).await;
        assert!(matches!(again, Err(ServiceError::InvalidState(_))));

        let turn = set_turn(
            &fx.state,
            &fx.host,
            session_id,
            UpdateTurnRequest {
                current_turn: Some(player.id),
            },
        )
        .await;
        assert!(matches!(turn, Err(ServiceError::InvalidState(_))));

        let store = fx.state.game_store().await.unwrap();
        let profile = store.find_profile(user_id).await.unwrap().unwrap();
        assert_eq!(profile.games_played, 1);
        assert_eq!(profile.games_won, 1);
    }

    #[tokio::test]
    async fn list_is_filtered_to_participants() {
        let fx = fixture().await;
        let session = create_session(&fx.state, &fx.host, create_request(fx.game.id))
            .await
            .unwrap();
        let member = Caller::new(Uuid::new_v4(), SystemRole::User);
        let outsider = Caller::new(Uuid::new_v4(), SystemRole::User);
        let admin = Caller::new(Uuid::new_v4(), SystemRole::Admin);
        seat(&fx.state, session.session.id, Some(member.user_id)).await;

        let host_view = list_sessions(&fx.state, &fx.host).await.unwrap();
        assert_eq!(host_view.len(), 1);
        assert_eq!(host_view[0].user_role, SessionRole::Host);

        let member_view = list_sessions(&fx.state, &member).await.unwrap();
        assert_eq!(member_view[0].user_role, SessionRole::Player);

        assert!(list_sessions(&fx.state, &outsider).await.unwrap().is_empty());
        assert_eq!(list_sessions(&fx.state, &admin).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_requires_host() {
        let fx = fixture().await;
        let session = create_session(&fx.state, &fx.host, create_request(fx.game.id))
            .await
            .unwrap();
        let user = Caller::new(Uuid::new_v4(), SystemRole::User);

        let denied = delete_session(&fx.state, &user, session.session.id).await;
        assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

        delete_session(&fx.state, &fx.host, session.session.id)
            .await
            .unwrap();
        let missing = get_session(&fx.state, &fx.host, session.session.id).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }
}
