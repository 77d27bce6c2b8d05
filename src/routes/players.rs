use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::player::{CreatePlayerRequest, PlayerDto, UpdatePlayerRequest},
    error::AppError,
    services::player_service,
    state::{SharedState, identity::Caller},
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/players", post(join_session))
        .route(
            "/api/players/session/{game_session_id}",
            get(list_session_players),
        )
        .route(
            "/api/players/{id}",
            get(get_player).patch(update_player).delete(delete_player),
        )
}

/// Take a seat in a session.
#[utoipa::path(
    post,
    path = "/api/players",
    tag = "players",
    security(("bearer" = [])),
    request_body = CreatePlayerRequest,
    responses(
        (status = 201, description = "Player created", body = PlayerDto),
        (status = 404, description = "Unknown session"),
        (status = 409, description = "Caller already joined this session")
    )
)]
pub async fn join_session(
    State(state): State<SharedState>,
    caller: Caller,
    Json(payload): Json<CreatePlayerRequest>,
) -> Result<(StatusCode, Json<PlayerDto>), AppError> {
    let player = player_service::join_session(&state, &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(player)))
}

#[utoipa::path(
    get,
    path = "/api/players/session/{game_session_id}",
    tag = "players",
    security(("bearer" = [])),
    params(("game_session_id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Players in join order", body = [PlayerDto]))
)]
pub async fn list_session_players(
    State(state): State<SharedState>,
    Path(game_session_id): Path<Uuid>,
) -> Result<Json<Vec<PlayerDto>>, AppError> {
    Ok(Json(
        player_service::list_players(&state, game_session_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/players/{id}",
    tag = "players",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Player identifier")),
    responses((status = 200, description = "Player", body = PlayerDto))
)]
pub async fn get_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlayerDto>, AppError> {
    Ok(Json(player_service::get_player(&state, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/players/{id}",
    tag = "players",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Player identifier")),
    request_body = UpdatePlayerRequest,
    responses(
        (status = 200, description = "Player updated", body = PlayerDto),
        (status = 403, description = "Not allowed to update this player")
    )
)]
pub async fn update_player(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePlayerRequest>,
) -> Result<Json<PlayerDto>, AppError> {
    Ok(Json(
        player_service::update_player(&state, &caller, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/players/{id}",
    tag = "players",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Player identifier")),
    responses((status = 204, description = "Player removed"))
)]
pub async fn delete_player(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    player_service::delete_player(&state, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
