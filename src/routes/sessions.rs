use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    routing::{get, patch},
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::session::{
        CreateSessionRequest, SessionDetail, SessionQuestionUpdate, SessionSummary,
        UpdateSessionQuestionRequest, UpdateTurnRequest,
    },
    error::AppError,
    services::{session_service, sse_service},
    state::{SharedState, identity::Caller},
};

/// Session lifecycle routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/api/game-sessions",
            get(list_sessions).post(create_session),
        )
        .route(
            "/api/game-sessions/{id}",
            get(get_session).delete(delete_session),
        )
        .route("/api/game-sessions/{id}/turn", patch(update_turn))
        .route(
            "/api/game-sessions/{id}/questions/{question_id}",
            patch(update_question),
        )
        .route("/api/game-sessions/{id}/end", patch(end_session))
        .route("/api/game-sessions/{id}/events", get(session_events))
}

/// Start a session of a game; every question of the board is copied into it.
#[utoipa::path(
    post,
    path = "/api/game-sessions",
    tag = "sessions",
    security(("bearer" = [])),
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionDetail),
        (status = 400, description = "Missing field or setting out of range"),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    caller: Caller,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionDetail>), AppError> {
    let session = session_service::create_session(&state, &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Sessions the caller hosts or plays in (all sessions for admins).
#[utoipa::path(
    get,
    path = "/api/game-sessions",
    tag = "sessions",
    security(("bearer" = [])),
    responses((status = 200, description = "Visible sessions", body = [SessionSummary]))
)]
pub async fn list_sessions(
    State(state): State<SharedState>,
    caller: Caller,
) -> Result<Json<Vec<SessionSummary>>, AppError> {
    Ok(Json(session_service::list_sessions(&state, &caller).await?))
}

#[utoipa::path(
    get,
    path = "/api/game-sessions/{id}",
    tag = "sessions",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session with board, players and question states", body = SessionDetail),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDetail>, AppError> {
    Ok(Json(session_service::get_session(&state, &caller, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/game-sessions/{id}/turn",
    tag = "sessions",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = UpdateTurnRequest,
    responses(
        (status = 200, description = "Turn updated", body = SessionSummary),
        (status = 403, description = "Caller is not seated in the session"),
        (status = 404, description = "Unknown session"),
        (status = 409, description = "Session already ended")
    )
)]
pub async fn update_turn(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTurnRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(
        session_service::set_turn(&state, &caller, id, payload).await?,
    ))
}

/// Reveal or answer a question; answers with `playerId` and `isCorrect` are scored.
#[utoipa::path(
    patch,
    path = "/api/game-sessions/{id}/questions/{question_id}",
    tag = "sessions",
    security(("bearer" = [])),
    params(
        ("id" = Uuid, Path, description = "Session identifier"),
        ("question_id" = Uuid, Path, description = "Question identifier")
    ),
    request_body = UpdateSessionQuestionRequest,
    responses(
        (status = 200, description = "Updated question state", body = SessionQuestionUpdate),
        (status = 403, description = "Caller is not host, gamemaster or admin"),
        (status = 404, description = "Unknown session or question"),
        (status = 409, description = "Transition not allowed or question already answered")
    )
)]
pub async fn update_question(
    State(state): State<SharedState>,
    caller: Caller,
    Path((id, question_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateSessionQuestionRequest>,
) -> Result<Json<SessionQuestionUpdate>, AppError> {
    Ok(Json(
        session_service::update_question(&state, &caller, id, question_id, payload).await?,
    ))
}

/// Finalize the session and update the players' profiles.
#[utoipa::path(
    patch,
    path = "/api/game-sessions/{id}/end",
    tag = "sessions",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Finalized session", body = SessionDetail),
        (status = 403, description = "Caller is not host, gamemaster or admin"),
        (status = 409, description = "Session already ended")
    )
)]
pub async fn end_session(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDetail>, AppError> {
    Ok(Json(session_service::end_session(&state, &caller, id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/game-sessions/{id}",
    tag = "sessions",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 403, description = "Caller is not host or admin")
    )
)]
pub async fn delete_session(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    session_service::delete_session(&state, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/game-sessions/{id}/events",
    tag = "sessions",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Session SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream turn, question, player and end-of-session events of one session.
pub async fn session_events(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (handshake, receiver) = sse_service::subscribe_session(&state, &caller, id).await?;
    info!(session_id = %id, user_id = %caller.user_id, "new session SSE connection");
    Ok(sse_service::to_sse_stream(id, handshake, receiver))
}
