use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{PlayerEntity, PlayerRole},
    dto::{
        format_system_time,
        validation::{collect, field_error, finish, validate_not_blank},
    },
};

const MAX_NAME_LEN: usize = 50;

fn check_name(errors: &mut ValidationErrors, name: Option<&str>) {
    let Some(name) = name else {
        return;
    };
    collect(errors, "name", validate_not_blank(name));
    if name.chars().count() > MAX_NAME_LEN {
        errors.add(
            "name",
            field_error("length", format!("must be at most {MAX_NAME_LEN} characters")),
        );
    }
}

/// Join a session. With `isAi` the host seats a computer player that has no user.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlayerRequest {
    pub game_session_id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(default)]
    pub is_ai: bool,
}

impl Validate for CreatePlayerRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.game_session_id.is_none() {
            errors.add("gameSessionId", field_error("required", "is required"));
        }
        match self.name.as_deref() {
            Some(name) => check_name(&mut errors, Some(name)),
            None => errors.add("name", field_error("required", "is required")),
        }
        finish(errors)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlayerRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// Only the host or an admin may change roles.
    #[serde(default)]
    pub role: Option<PlayerRole>,
}

impl Validate for UpdatePlayerRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, self.name.as_deref());
        finish(errors)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    pub id: Uuid,
    pub game_session_id: Uuid,
    /// Absent for AI players.
    pub user_id: Option<Uuid>,
    pub name: String,
    pub points: i32,
    pub role: PlayerRole,
    pub joined_at: String,
}

impl From<&PlayerEntity> for PlayerDto {
    fn from(player: &PlayerEntity) -> Self {
        Self {
            id: player.id,
            game_session_id: player.game_session_id,
            user_id: player.user_id,
            name: player.name.clone(),
            points: player.points,
            role: player.role,
            joined_at: format_system_time(player.joined_at),
        }
    }
}

impl From<PlayerEntity> for PlayerDto {
    fn from(player: PlayerEntity) -> Self {
        Self::from(&player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_requires_session_and_name() {
        let request: CreatePlayerRequest = serde_json::from_str("{}").unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("gameSessionId"));
        assert!(errors.field_errors().contains_key("name"));

        let request: CreatePlayerRequest = serde_json::from_value(serde_json::json!({
            "gameSessionId": Uuid::new_v4(),
            "name": "Ada",
        }))
        .unwrap();
        assert!(request.validate().is_ok());
        assert!(!request.is_ai);
    }

    #[test]
    fn role_uses_screaming_snake_case() {
        let request: UpdatePlayerRequest =
            serde_json::from_str(r#"{"role":"GAME_MASTER"}"#).unwrap();
        assert_eq!(request.role, Some(PlayerRole::GameMaster));
    }
}
