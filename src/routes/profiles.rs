use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::profile::{ProfileDto, UpdateProfileRequest, UpdateProfileStatsRequest},
    error::AppError,
    services::profile_service,
    state::{SharedState, identity::Caller},
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/api/profiles/{user_id}",
            get(get_profile).put(update_profile),
        )
        .route("/api/profiles/{user_id}/stats", put(update_stats))
}

#[utoipa::path(
    get,
    path = "/api/profiles/{user_id}",
    tag = "profiles",
    security(("bearer" = [])),
    params(("user_id" = Uuid, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Game statistics of the user", body = ProfileDto),
        (status = 403, description = "Caller is neither the user nor an admin")
    )
)]
pub async fn get_profile(
    State(state): State<SharedState>,
    caller: Caller,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProfileDto>, AppError> {
    Ok(Json(
        profile_service::get_profile(&state, &caller, user_id).await?,
    ))
}

/// Set avatar and bio; the profile is created when missing.
#[utoipa::path(
    put,
    path = "/api/profiles/{user_id}",
    tag = "profiles",
    security(("bearer" = [])),
    params(("user_id" = Uuid, Path, description = "User identifier")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileDto),
        (status = 400, description = "Avatar or bio too long"),
        (status = 403, description = "Caller is neither the user nor an admin")
    )
)]
pub async fn update_profile(
    State(state): State<SharedState>,
    caller: Caller,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileDto>, AppError> {
    Ok(Json(
        profile_service::update_profile(&state, &caller, user_id, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/profiles/{user_id}/stats",
    tag = "profiles",
    security(("bearer" = [])),
    params(("user_id" = Uuid, Path, description = "User identifier")),
    request_body = UpdateProfileStatsRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileDto),
        (status = 400, description = "Negative count or more wins than games"),
        (status = 403, description = "Caller is neither the user nor an admin"),
        (status = 404, description = "User has no profile yet")
    )
)]
pub async fn update_stats(
    State(state): State<SharedState>,
    caller: Caller,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateProfileStatsRequest>,
) -> Result<Json<ProfileDto>, AppError> {
    Ok(Json(
        profile_service::update_stats(&state, &caller, user_id, payload).await?,
    ))
}
