use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{GameEntity, GameSessionEntity, PlayerEntity, PlayerRole},
    dto::player::{CreatePlayerRequest, PlayerDto, UpdatePlayerRequest},
    error::ServiceError,
    services::sse_events,
    state::{
        SharedState,
        identity::Caller,
        session::{can_administer, derive_role},
    },
};

async fn load_session(
    state: &SharedState,
    session_id: Uuid,
) -> Result<(GameSessionEntity, GameEntity), ServiceError> {
    let store = state.require_game_store().await?;
    let session = store
        .find_session(session_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game session `{session_id}` not found")))?;
    let game = store.find_game(session.game_id).await?.ok_or_else(|| {
        ServiceError::NotFound(format!("game `{}` not found", session.game_id))
    })?;
    Ok((session, game))
}

async fn load_player(state: &SharedState, id: Uuid) -> Result<PlayerEntity, ServiceError> {
    let store = state.require_game_store().await?;
    store
        .find_player(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("player `{id}` not found")))
}

/// Whether the caller is host/admin of the player's session, and whether the player is theirs.
async fn player_rights(
    state: &SharedState,
    caller: &Caller,
    player: &PlayerEntity,
) -> Result<(bool, bool), ServiceError> {
    let (_, game) = load_session(state, player.game_session_id).await?;
    let store = state.require_game_store().await?;
    let players = store.list_players(player.game_session_id).await?;
    let administers = can_administer(derive_role(game.creator_id, caller.user_id, &players), caller);
    Ok((administers, player.user_id == Some(caller.user_id)))
}

/// Seat the caller in a session, or seat an AI player on behalf of the host.
pub async fn join_session(
    state: &SharedState,
    caller: &Caller,
    request: CreatePlayerRequest,
) -> Result<PlayerDto, ServiceError> {
    request.validate()?;
    let (Some(session_id), Some(name)) = (request.game_session_id, request.name) else {
        return Err(ServiceError::InvalidInput(
            "gameSessionId and name are required".into(),
        ));
    };

    let (session, game) = load_session(state, session_id).await?;
    if session.is_ended() {
        return Err(ServiceError::InvalidState(format!(
            "session `{session_id}` has already ended"
        )));
    }

    let store = state.require_game_store().await?;
    let user_id = if request.is_ai {
        let players = store.list_players(session_id).await?;
        if !can_administer(derive_role(game.creator_id, caller.user_id, &players), caller) {
            return Err(ServiceError::Forbidden(
                "only the host or an admin can add AI players".into(),
            ));
        }
        None
    } else {
        Some(caller.user_id)
    };

    let player = PlayerEntity {
        id: Uuid::new_v4(),
        game_session_id: session_id,
        user_id,
        name: name.trim().to_owned(),
        points: 0,
        role: PlayerRole::Contestant,
        joined_at: SystemTime::now(),
    };
    if !store.insert_player(player.clone()).await? {
        return Err(ServiceError::InvalidState(format!(
            "session `{session_id}` has already ended"
        )));
    }

    info!(%session_id, player_id = %player.id, ai = request.is_ai, "player joined session");
    sse_events::broadcast_player_joined(state, &player);
    Ok(PlayerDto::from(player))
}

pub async fn list_players(
    state: &SharedState,
    session_id: Uuid,
) -> Result<Vec<PlayerDto>, ServiceError> {
    load_session(state, session_id).await?;
    let store = state.require_game_store().await?;
    let players = store.list_players(session_id).await?;
    Ok(players.into_iter().map(PlayerDto::from).collect())
}

pub async fn get_player(state: &SharedState, id: Uuid) -> Result<PlayerDto, ServiceError> {
    load_player(state, id).await.map(PlayerDto::from)
}

/// Rename a player or change its role. Players may rename themselves; only the host or
/// an admin may change roles.
pub async fn update_player(
    state: &SharedState,
    caller: &Caller,
    id: Uuid,
    request: UpdatePlayerRequest,
) -> Result<PlayerDto, ServiceError> {
    request.validate()?;
    let player = load_player(state, id).await?;
    let (administers, owns) = player_rights(state, caller, &player).await?;
    if !administers && !owns {
        return Err(ServiceError::Forbidden(
            "only the player, the host or an admin can update this player".into(),
        ));
    }
    if request.role.is_some() && !administers {
        return Err(ServiceError::Forbidden(
            "only the host or an admin can change player roles".into(),
        ));
    }

    let store = state.require_game_store().await?;
    let name = request.name.map(|name| name.trim().to_owned());
    let updated = store
        .update_player(id, name, request.role)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("player `{id}` not found")))?;
    Ok(PlayerDto::from(updated))
}

/// Remove a player from its session, releasing the turn if they held it.
pub async fn delete_player(
    state: &SharedState,
    caller: &Caller,
    id: Uuid,
) -> Result<(), ServiceError> {
    let player = load_player(state, id).await?;
    let (administers, owns) = player_rights(state, caller, &player).await?;
    if !administers && !owns {
        return Err(ServiceError::Forbidden(
            "only the player, the host or an admin can remove this player".into(),
        ));
    }

    let store = state.require_game_store().await?;
    if !store.delete_player(id).await? {
        return Err(ServiceError::NotFound(format!("player `{id}` not found")));
    }
    info!(session_id = %player.game_session_id, player_id = %id, "player left session");
    sse_events::broadcast_player_left(state, player.game_session_id, id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::MemoryGameStore,
        dto::session::CreateSessionRequest,
        services::{catalog_service, session_service},
        state::{AppState, identity::SystemRole},
    };
    use std::sync::Arc;

    async fn session_fixture() -> (SharedState, Caller, Uuid) {
        let state =
            AppState::with_store(AppConfig::default(), None, Arc::new(MemoryGameStore::new()))
                .await;
        let host = Caller::new(Uuid::new_v4(), SystemRole::User);
        let game = catalog_service::create_template_game(&state, &host)
            .await
            .unwrap();
        let session = session_service::create_session(
            &state,
            &host,
            CreateSessionRequest {
                game_id: Some(game.id),
                name: Some("Evening".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (state, host, session.session.id)
    }

    fn join(session_id: Uuid, name: &str, is_ai: bool) -> CreatePlayerRequest {
        CreatePlayerRequest {
            game_session_id: Some(session_id),
            name: Some(name.into()),
            is_ai,
        }
    }

    #[tokio::test]
    async fn second_join_by_same_user_conflicts() {
        let (state, _, session_id) = session_fixture().await;
        let user = Caller::new(Uuid::new_v4(), SystemRole::User);

        let player = join_session(&state, &user, join(session_id, "Ada", false))
            .await
            .unwrap();
        assert_eq!(player.role, PlayerRole::Contestant);
        assert_eq!(player.user_id, Some(user.user_id));

        let again = join_session(&state, &user, join(session_id, "Ada again", false)).await;
        assert!(matches!(again, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn joining_an_ended_session_is_rejected() {
        let (state, host, session_id) = session_fixture().await;
        session_service::end_session(&state, &host, session_id)
            .await
            .unwrap();

        let user = Caller::new(Uuid::new_v4(), SystemRole::User);
        let result = join_session(&state, &user, join(session_id, "Late", false)).await;
        assert!(matches!(result, Err(ServiceError::InvalidState(_))));
        assert!(list_players(&state, session_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn joining_a_missing_session_is_not_found() {
        let (state, _, _) = session_fixture().await;
        let user = Caller::new(Uuid::new_v4(), SystemRole::User);
        let result = join_session(&state, &user, join(Uuid::new_v4(), "Ada", false)).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn only_host_seats_ai_players() {
        let (state, host, session_id) = session_fixture().await;
        let user = Caller::new(Uuid::new_v4(), SystemRole::User);

        let denied = join_session(&state, &user, join(session_id, "Bot", true)).await;
        assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

        let first = join_session(&state, &host, join(session_id, "Bot 1", true))
            .await
            .unwrap();
        let second = join_session(&state, &host, join(session_id, "Bot 2", true))
            .await
            .unwrap();
        assert!(first.user_id.is_none() && second.user_id.is_none());
        assert_eq!(list_players(&state, session_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn role_changes_are_reserved_to_the_host() {
        let (state, host, session_id) = session_fixture().await;
        let user = Caller::new(Uuid::new_v4(), SystemRole::User);
        let player = join_session(&state, &user, join(session_id, "Ada", false))
            .await
            .unwrap();

        let promote = || UpdatePlayerRequest {
            name: None,
            role: Some(PlayerRole::GameMaster),
        };
        let denied = update_player(&state, &user, player.id, promote()).await;
        assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

        let renamed = update_player(
            &state,
            &user,
            player.id,
            UpdatePlayerRequest {
                name: Some("Ada L.".into()),
                role: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.name, "Ada L.");

        let promoted = update_player(&state, &host, player.id, promote()).await.unwrap();
        assert_eq!(promoted.role, PlayerRole::GameMaster);
    }
}
