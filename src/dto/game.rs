//! Wire types of the game catalog: boards, categories, rows and questions.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{CategoryEntity, GameEntity, QuestionEntity, QuestionRowEntity},
    dto::{
        format_system_time,
        validation::{collect, field_error, finish, validate_not_blank},
    },
};

const MAX_TITLE_LEN: usize = 200;
const MAX_TEXT_LEN: usize = 2_000;

fn check_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<&str>,
    max: usize,
) {
    let Some(value) = value else {
        return;
    };
    collect(errors, field, validate_not_blank(value));
    if value.chars().count() > max {
        errors.add(
            field,
            field_error("length", format!("must be at most {max} characters")),
        );
    }
}

/// Payload creating an empty board owned by the caller.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub title: String,
    /// Defaults to `true`.
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl Validate for CreateGameRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_text(&mut errors, "title", Some(&self.title), MAX_TITLE_LEN);
        finish(errors)
    }
}

/// Partial update of a board's metadata.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGameRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl Validate for UpdateGameRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_text(&mut errors, "title", self.title.as_deref(), MAX_TITLE_LEN);
        finish(errors)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    /// Display position, unique within the game.
    pub order: i32,
}

impl Validate for CreateCategoryRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_text(&mut errors, "name", Some(&self.name), MAX_TITLE_LEN);
        finish(errors)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
}

impl Validate for UpdateCategoryRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_text(&mut errors, "name", self.name.as_deref(), MAX_TITLE_LEN);
        finish(errors)
    }
}

fn check_value(errors: &mut ValidationErrors, value: Option<i32>) {
    if value.is_some_and(|value| value <= 0) {
        errors.add("value", field_error("range", "must be a positive number of points"));
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRowRequest {
    /// Points awarded for every question of the row.
    pub value: i32,
    pub order: i32,
}

impl Validate for CreateQuestionRowRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_value(&mut errors, Some(self.value));
        finish(errors)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRowRequest {
    #[serde(default)]
    pub value: Option<i32>,
    #[serde(default)]
    pub order: Option<i32>,
}

impl Validate for UpdateQuestionRowRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_value(&mut errors, self.value);
        finish(errors)
    }
}

/// Fill one cell of the board.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    pub category_id: Uuid,
    pub row_id: Uuid,
    pub question: String,
    pub answer: String,
}

impl Validate for CreateQuestionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_text(&mut errors, "question", Some(&self.question), MAX_TEXT_LEN);
        check_text(&mut errors, "answer", Some(&self.answer), MAX_TEXT_LEN);
        finish(errors)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

impl Validate for UpdateQuestionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_text(&mut errors, "question", self.question.as_deref(), MAX_TEXT_LEN);
        check_text(&mut errors, "answer", self.answer.as_deref(), MAX_TEXT_LEN);
        finish(errors)
    }
}

/// Board listing entry.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameListItem {
    pub id: Uuid,
    pub title: String,
    pub is_active: bool,
    pub creator_id: Uuid,
    pub created_at: String,
    pub category_count: usize,
    pub row_count: usize,
}

impl From<&GameEntity> for GameListItem {
    fn from(game: &GameEntity) -> Self {
        Self {
            id: game.id,
            title: game.title.clone(),
            is_active: game.is_active,
            creator_id: game.creator_id,
            created_at: format_system_time(game.created_at),
            category_count: game.categories.len(),
            row_count: game.rows.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    pub id: Uuid,
    pub game_id: Uuid,
    pub name: String,
    pub order: i32,
}

impl CategoryDto {
    pub fn new(game_id: Uuid, category: &CategoryEntity) -> Self {
        Self {
            id: category.id,
            game_id,
            name: category.name.clone(),
            order: category.order,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRowDto {
    pub id: Uuid,
    pub game_id: Uuid,
    pub value: i32,
    pub order: i32,
}

impl QuestionRowDto {
    pub fn new(game_id: Uuid, row: &QuestionRowEntity) -> Self {
        Self {
            id: row.id,
            game_id,
            value: row.value,
            order: row.order,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    pub id: Uuid,
    pub category_id: Uuid,
    pub row_id: Uuid,
    pub question: String,
    pub answer: String,
}

impl From<&QuestionEntity> for QuestionDto {
    fn from(question: &QuestionEntity) -> Self {
        Self {
            id: question.id,
            category_id: question.category_id,
            row_id: question.row_id,
            question: question.question.clone(),
            answer: question.answer.clone(),
        }
    }
}

/// Full board with categories and rows in display order.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameDetail {
    pub id: Uuid,
    pub title: String,
    pub is_active: bool,
    pub creator_id: Uuid,
    pub created_at: String,
    pub updated_at: String,
    pub categories: Vec<CategoryDto>,
    pub rows: Vec<QuestionRowDto>,
    pub questions: Vec<QuestionDto>,
}

impl From<&GameEntity> for GameDetail {
    fn from(game: &GameEntity) -> Self {
        let mut categories: Vec<_> = game
            .categories
            .iter()
            .map(|category| CategoryDto::new(game.id, category))
            .collect();
        categories.sort_by_key(|category| category.order);
        let mut rows: Vec<_> = game
            .rows
            .iter()
            .map(|row| QuestionRowDto::new(game.id, row))
            .collect();
        rows.sort_by_key(|row| row.order);

        Self {
            id: game.id,
            title: game.title.clone(),
            is_active: game.is_active,
            creator_id: game.creator_id,
            created_at: format_system_time(game.created_at),
            updated_at: format_system_time(game.updated_at),
            categories,
            rows,
            questions: game.questions.iter().map(QuestionDto::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_oversized_titles_are_rejected() {
        let ok = CreateGameRequest {
            title: "Science night".into(),
            is_active: None,
        };
        assert!(ok.validate().is_ok());

        let blank = CreateGameRequest {
            title: "  ".into(),
            is_active: None,
        };
        assert!(blank.validate().is_err());

        let long = UpdateGameRequest {
            title: Some("x".repeat(MAX_TITLE_LEN + 1)),
            is_active: None,
        };
        assert!(long.validate().is_err());
        assert!(UpdateGameRequest::default().validate().is_ok());
    }

    #[test]
    fn row_values_must_be_positive() {
        assert!(CreateQuestionRowRequest { value: 0, order: 1 }.validate().is_err());
        assert!(CreateQuestionRowRequest { value: 100, order: 1 }.validate().is_ok());
    }
}
