//! Wire types of AI game generation, including the JSON shape expected from the model.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::{field_error, finish},
    state::generation::{GenerationStatus, GenerationTask},
};

pub const MIN_CATEGORIES: usize = 2;
pub const MAX_CATEGORIES: usize = 10;

/// Request a generated board, by theme or by explicit category names.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateGameRequest {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub example_questions: Option<String>,
    /// Overrides the configured output language.
    #[serde(default)]
    pub language: Option<String>,
}

impl GenerateGameRequest {
    pub fn theme(&self) -> Option<&str> {
        self.theme
            .as_deref()
            .map(str::trim)
            .filter(|theme| !theme.is_empty())
    }

    /// Category names with blanks removed.
    pub fn category_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .flatten()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

impl Validate for GenerateGameRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let categories = self.category_names();

        if self.theme().is_none() && categories.is_empty() {
            errors.add(
                "theme",
                field_error("required", "either a theme or categories are required"),
            );
        }
        if !categories.is_empty() && !(MIN_CATEGORIES..=MAX_CATEGORIES).contains(&categories.len())
        {
            errors.add(
                "categories",
                field_error(
                    "length",
                    format!("between {MIN_CATEGORIES} and {MAX_CATEGORIES} categories are required"),
                ),
            );
        }
        finish(errors)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationAccepted {
    pub success: bool,
    pub message: String,
    pub generation_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Poll result. `success` reports that the lookup worked; the task outcome is in `status`.
pub struct GenerationStatusResponse {
    pub success: bool,
    pub id: Uuid,
    pub status: GenerationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationStatusResponse {
    pub fn new(id: Uuid, task: GenerationTask) -> Self {
        Self {
            success: true,
            id,
            status: task.status,
            data: task.data,
            error: task.error,
        }
    }
}

/// Board as produced by the model.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeneratedGame {
    pub categories: Vec<GeneratedCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeneratedCategory {
    pub name: String,
    #[serde(default)]
    pub questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeneratedQuestion {
    /// Statement shown to the players.
    pub clue: String,
    pub answer: String,
}

/// Result stored on a completed task.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedGameResult {
    pub game_id: Uuid,
    pub title: String,
    pub categories: Vec<GeneratedCategory>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_or_categories_required() {
        assert!(GenerateGameRequest::default().validate().is_err());

        let themed = GenerateGameRequest {
            theme: Some("Space".into()),
            ..Default::default()
        };
        assert!(themed.validate().is_ok());

        let blank = GenerateGameRequest {
            theme: Some("  ".into()),
            categories: Some(vec![" ".into()]),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn category_count_bounds() {
        let one = GenerateGameRequest {
            categories: Some(vec!["History".into()]),
            ..Default::default()
        };
        assert!(one.validate().is_err());

        let two = GenerateGameRequest {
            categories: Some(vec!["History".into(), "Art".into()]),
            ..Default::default()
        };
        assert!(two.validate().is_ok());

        let eleven = GenerateGameRequest {
            categories: Some((0..11).map(|i| format!("C{i}")).collect()),
            ..Default::default()
        };
        assert!(eleven.validate().is_err());
    }
}
