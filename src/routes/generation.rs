use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::generation::{GenerateGameRequest, GenerationAccepted, GenerationStatusResponse},
    error::AppError,
    services::generation_service,
    state::{SharedState, identity::Caller},
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/ai-games/generate", post(generate_game))
        .route("/api/ai-games/status/{id}", get(generation_status))
}

/// Start generating a board in the background.
#[utoipa::path(
    post,
    path = "/api/ai-games/generate",
    tag = "ai-games",
    security(("bearer" = [])),
    request_body = GenerateGameRequest,
    responses(
        (status = 202, description = "Generation started", body = GenerationAccepted),
        (status = 400, description = "Neither theme nor a valid category list"),
        (status = 503, description = "Generation not configured")
    )
)]
pub async fn generate_game(
    State(state): State<SharedState>,
    caller: Caller,
    Json(payload): Json<GenerateGameRequest>,
) -> Result<(StatusCode, Json<GenerationAccepted>), AppError> {
    let accepted = generation_service::request_generation(&state, &caller, payload).await?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

#[utoipa::path(
    get,
    path = "/api/ai-games/status/{id}",
    tag = "ai-games",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Generation identifier")),
    responses(
        (status = 200, description = "Generation status", body = GenerationStatusResponse),
        (status = 403, description = "Task belongs to another user"),
        (status = 404, description = "Unknown generation id")
    )
)]
pub async fn generation_status(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<GenerationStatusResponse>, AppError> {
    Ok(Json(generation_service::generation_status(
        &state, &caller, id,
    )?))
}
