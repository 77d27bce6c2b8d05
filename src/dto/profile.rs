use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::{game_store::ProfileStats, models::ProfileEntity},
    dto::validation::{field_error, finish},
};

const MAX_AVATAR_LEN: usize = 2_048;
const MAX_BIO_LEN: usize = 1_000;

/// Public details and aggregate statistics of a user.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    pub user_id: Uuid,
    pub games_played: u32,
    pub games_won: u32,
    pub rating: i32,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

impl From<ProfileEntity> for ProfileDto {
    fn from(profile: ProfileEntity) -> Self {
        Self {
            user_id: profile.user_id,
            games_played: profile.games_played,
            games_won: profile.games_won,
            rating: profile.rating,
            avatar: profile.avatar,
            bio: profile.bio,
        }
    }
}

/// Avatar and bio of a profile. Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    /// Image URL.
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field, value, max) in [
            ("avatar", self.avatar.as_deref(), MAX_AVATAR_LEN),
            ("bio", self.bio.as_deref(), MAX_BIO_LEN),
        ] {
            if value.is_some_and(|value| value.chars().count() > max) {
                errors.add(
                    field,
                    field_error("length", format!("must be at most {max} characters")),
                );
            }
        }
        finish(errors)
    }
}

/// Statistics override. Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileStatsRequest {
    #[serde(default)]
    pub games_played: Option<i64>,
    #[serde(default)]
    pub games_won: Option<i64>,
    #[serde(default)]
    pub rating: Option<i64>,
}

impl UpdateProfileStatsRequest {
    /// Statistics to write; meaningful once [`Validate::validate`] passed.
    pub fn stats(&self) -> ProfileStats {
        ProfileStats {
            games_played: self.games_played.and_then(|value| u32::try_from(value).ok()),
            games_won: self.games_won.and_then(|value| u32::try_from(value).ok()),
            rating: self.rating.and_then(|value| i32::try_from(value).ok()),
        }
    }
}

impl Validate for UpdateProfileStatsRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field, value) in [("gamesPlayed", self.games_played), ("gamesWon", self.games_won)] {
            if value.is_some_and(|value| u32::try_from(value).is_err()) {
                errors.add(
                    field,
                    field_error("range", format!("must be between 0 and {}", u32::MAX)),
                );
            }
        }
        if self
            .rating
            .is_some_and(|value| i32::try_from(value).is_err())
        {
            errors.add("rating", field_error("range", "is out of range"));
        }
        if let (Some(played), Some(won)) = (self.games_played, self.games_won) {
            if won > played {
                errors.add(
                    "gamesWon",
                    field_error("range", "cannot exceed gamesPlayed"),
                );
            }
        }
        finish(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_reject_negative_counts_and_more_wins_than_games() {
        let negative = UpdateProfileStatsRequest {
            games_played: Some(-1),
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let inverted = UpdateProfileStatsRequest {
            games_played: Some(2),
            games_won: Some(3),
            rating: None,
        };
        let err = inverted.validate().unwrap_err();
        assert!(err.field_errors().contains_key("gamesWon"));

        let valid = UpdateProfileStatsRequest {
            games_played: Some(4),
            games_won: Some(1),
            rating: Some(-20),
        };
        assert!(valid.validate().is_ok());
        assert_eq!(
            valid.stats(),
            ProfileStats {
                games_played: Some(4),
                games_won: Some(1),
                rating: Some(-20),
            }
        );
    }

    #[test]
    fn long_bio_is_rejected() {
        let request = UpdateProfileRequest {
            avatar: None,
            bio: Some("x".repeat(MAX_BIO_LEN + 1)),
        };
        assert!(request.validate().is_err());
    }
}
