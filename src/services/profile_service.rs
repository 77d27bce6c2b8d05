use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::ProfileEntity,
    dto::profile::{ProfileDto, UpdateProfileRequest, UpdateProfileStatsRequest},
    error::ServiceError,
    state::{SharedState, identity::Caller},
};

fn ensure_owner_or_admin(caller: &Caller, user_id: Uuid, action: &str) -> Result<(), ServiceError> {
    if caller.user_id != user_id && !caller.is_admin() {
        return Err(ServiceError::Forbidden(format!(
            "profiles can only be {action} by their owner or an admin"
        )));
    }
    Ok(())
}

/// Statistics of `user_id`, zeroed when the user never finished a session.
pub async fn get_profile(
    state: &SharedState,
    caller: &Caller,
    user_id: Uuid,
) -> Result<ProfileDto, ServiceError> {
    ensure_owner_or_admin(caller, user_id, "read")?;

    let store = state.require_game_store().await?;
    let profile = store
        .find_profile(user_id)
        .await?
        .unwrap_or_else(|| ProfileEntity::empty(user_id));
    Ok(ProfileDto::from(profile))
}

/// Set avatar and bio, creating a zeroed profile when none exists yet.
pub async fn update_profile(
    state: &SharedState,
    caller: &Caller,
    user_id: Uuid,
    request: UpdateProfileRequest,
) -> Result<ProfileDto, ServiceError> {
    ensure_owner_or_admin(caller, user_id, "edited")?;
    request.validate()?;

    let store = state.require_game_store().await?;
    let profile = store
        .upsert_profile_details(user_id, request.avatar, request.bio)
        .await?;
    info!(%user_id, editor_id = %caller.user_id, "profile details updated");
    Ok(ProfileDto::from(profile))
}

/// Overwrite the statistics of an existing profile.
pub async fn update_stats(
    state: &SharedState,
    caller: &Caller,
    user_id: Uuid,
    request: UpdateProfileStatsRequest,
) -> Result<ProfileDto, ServiceError> {
    ensure_owner_or_admin(caller, user_id, "edited")?;
    request.validate()?;

    let store = state.require_game_store().await?;
    let profile = store
        .update_profile_stats(user_id, request.stats())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("profile {user_id} not found")))?;
    info!(%user_id, editor_id = %caller.user_id, "profile stats updated");
    Ok(ProfileDto::from(profile))
}
