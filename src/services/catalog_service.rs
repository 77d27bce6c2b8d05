//! Game catalog: boards, their categories, rows and questions.
//!
//! A game is stored as one aggregate, so every mutation loads it, applies the change
//! on a copy, re-checks the board invariants and saves the result.

use std::{collections::HashSet, time::SystemTime};

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{CategoryEntity, GameEntity, QuestionEntity, QuestionRowEntity},
    dto::game::{
        CategoryDto, CreateCategoryRequest, CreateGameRequest, CreateQuestionRequest,
        CreateQuestionRowRequest, GameDetail, GameListItem, QuestionDto, QuestionRowDto,
        UpdateCategoryRequest, UpdateGameRequest, UpdateQuestionRequest, UpdateQuestionRowRequest,
    },
    error::ServiceError,
    state::{SharedState, identity::Caller},
};

const TEMPLATE_SIZE: i32 = 5;
const TEMPLATE_ROW_STEP: i32 = 100;

/// Check the structural rules every stored board must satisfy.
pub fn check_board(game: &GameEntity) -> Result<(), ServiceError> {
    let mut category_orders = HashSet::new();
    for category in &game.categories {
        if !category_orders.insert(category.order) {
            return Err(ServiceError::Conflict(format!(
                "category order {} is already used in this game",
                category.order
            )));
        }
    }

    let mut row_orders = HashSet::new();
    for row in &game.rows {
        if !row_orders.insert(row.order) {
            return Err(ServiceError::Conflict(format!(
                "row order {} is already used in this game",
                row.order
            )));
        }
    }

    let mut cells = HashSet::new();
    for question in &game.questions {
        if game.category(question.category_id).is_none() {
            return Err(ServiceError::InvalidInput(format!(
                "category `{}` does not belong to this game",
                question.category_id
            )));
        }
        if game.row(question.row_id).is_none() {
            return Err(ServiceError::InvalidInput(format!(
                "row `{}` does not belong to this game",
                question.row_id
            )));
        }
        if !cells.insert((question.category_id, question.row_id)) {
            return Err(ServiceError::Conflict(
                "this cell of the board already holds a question".into(),
            ));
        }
    }

    Ok(())
}

/// New empty board owned by `creator_id`.
pub fn new_game(creator_id: Uuid, title: String, is_active: bool) -> GameEntity {
    let now = SystemTime::now();
    GameEntity {
        id: Uuid::new_v4(),
        title,
        is_active,
        creator_id,
        created_at: now,
        updated_at: now,
        categories: Vec::new(),
        rows: Vec::new(),
        questions: Vec::new(),
    }
}

fn ensure_editor(game: &GameEntity, caller: &Caller) -> Result<(), ServiceError> {
    if caller.is_admin() || game.creator_id == caller.user_id {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "only the creator of the game or an admin can modify it".into(),
        ))
    }
}

async fn load_game(state: &SharedState, id: Uuid) -> Result<GameEntity, ServiceError> {
    let store = state.require_game_store().await?;
    store
        .find_game(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{id}` not found")))
}

/// Load the game, check the caller may edit it, apply `mutate` and persist the result.
async fn edit_game<T>(
    state: &SharedState,
    caller: &Caller,
    game_id: Uuid,
    mutate: impl FnOnce(&mut GameEntity) -> Result<T, ServiceError>,
) -> Result<(GameEntity, T), ServiceError> {
    let mut game = load_game(state, game_id).await?;
    ensure_editor(&game, caller)?;

    let output = mutate(&mut game)?;
    check_board(&game)?;
    game.updated_at = SystemTime::now();

    let store = state.require_game_store().await?;
    store.save_game(game.clone()).await?;
    Ok((game, output))
}

// ---------------------------------------------------------------------------
// Games
// ---------------------------------------------------------------------------

pub async fn list_games(state: &SharedState) -> Result<Vec<GameListItem>, ServiceError> {
    let store = state.require_game_store().await?;
    let games = store.list_games().await?;
    Ok(games.iter().map(GameListItem::from).collect())
}

pub async fn get_game(state: &SharedState, id: Uuid) -> Result<GameDetail, ServiceError> {
    let game = load_game(state, id).await?;
    Ok(GameDetail::from(&game))
}

pub async fn create_game(
    state: &SharedState,
    caller: &Caller,
    request: CreateGameRequest,
) -> Result<GameDetail, ServiceError> {
    request.validate()?;
    let game = new_game(
        caller.user_id,
        request.title.trim().to_owned(),
        request.is_active.unwrap_or(true),
    );

    let store = state.require_game_store().await?;
    store.save_game(game.clone()).await?;
    info!(game_id = %game.id, creator_id = %caller.user_id, "game created");
    Ok(GameDetail::from(&game))
}

/// Create a 5×5 board with placeholder categories, rows worth 100..500 and an empty
/// question in every cell.
pub async fn create_template_game(
    state: &SharedState,
    caller: &Caller,
) -> Result<GameDetail, ServiceError> {
    let mut game = new_game(caller.user_id, "New game".into(), true);
    game.categories = (0..TEMPLATE_SIZE)
        .map(|index| CategoryEntity {
            id: Uuid::new_v4(),
            name: format!("Category {}", index + 1),
            order: index,
        })
        .collect();
    game.rows = (0..TEMPLATE_SIZE)
        .map(|index| QuestionRowEntity {
            id: Uuid::new_v4(),
            value: (index + 1) * TEMPLATE_ROW_STEP,
            order: index,
        })
        .collect();
    game.questions = game
        .categories
        .iter()
        .flat_map(|category| {
            game.rows.iter().map(|row| QuestionEntity {
                id: Uuid::new_v4(),
                category_id: category.id,
                row_id: row.id,
                question: String::new(),
                answer: String::new(),
            })
        })
        .collect();

    let store = state.require_game_store().await?;
    store.save_game(game.clone()).await?;
    info!(game_id = %game.id, creator_id = %caller.user_id, "template game created");
    Ok(GameDetail::from(&game))
}

pub async fn update_game(
    state: &SharedState,
    caller: &Caller,
    id: Uuid,
    request: UpdateGameRequest,
) -> Result<GameDetail, ServiceError> {
    request.validate()?;
    let (game, ()) = edit_game(state, caller, id, |game| {
        if let Some(title) = request.title {
            game.title = title.trim().to_owned();
        }
        if let Some(is_active) = request.is_active {
            game.is_active = is_active;
        }
        Ok(())
    })
    .await?;
    Ok(GameDetail::from(&game))
}

/// Delete a game with its sessions and their players.
pub async fn delete_game(state: &SharedState, caller: &Caller, id: Uuid) -> Result<(), ServiceError> {
    let game = load_game(state, id).await?;
    ensure_editor(&game, caller)?;

    let store = state.require_game_store().await?;
    let session_ids: Vec<Uuid> = store
        .list_sessions()
        .await?
        .into_iter()
        .filter(|session| session.game_id == id)
        .map(|session| session.id)
        .collect();

    if !store.delete_game(id).await? {
        return Err(ServiceError::NotFound(format!("game `{id}` not found")));
    }
    for session_id in &session_ids {
        state.session_streams().close(*session_id);
    }
    info!(game_id = %id, sessions = session_ids.len(), "game deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub async fn list_categories(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Vec<CategoryDto>, ServiceError> {
    Ok(get_game(state, game_id).await?.categories)
}

pub async fn create_category(
    state: &SharedState,
    caller: &Caller,
    game_id: Uuid,
    request: CreateCategoryRequest,
) -> Result<CategoryDto, ServiceError> {
    request.validate()?;
    let (_, category) = edit_game(state, caller, game_id, |game| {
        let category = CategoryEntity {
            id: Uuid::new_v4(),
            name: request.name.trim().to_owned(),
            order: request.order,
        };
        game.categories.push(category.clone());
        Ok(category)
    })
    .await?;
    Ok(CategoryDto::new(game_id, &category))
}

pub async fn update_category(
    state: &SharedState,
    caller: &Caller,
    game_id: Uuid,
    id: Uuid,
    request: UpdateCategoryRequest,
) -> Result<CategoryDto, ServiceError> {
    request.validate()?;
    let (_, category) = edit_game(state, caller, game_id, |game| {
        let category = game
            .categories
            .iter_mut()
            .find(|category| category.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("category `{id}` not found")))?;
        if let Some(name) = request.name {
            category.name = name.trim().to_owned();
        }
        if let Some(order) = request.order {
            category.order = order;
        }
        Ok(category.clone())
    })
    .await?;
    Ok(CategoryDto::new(game_id, &category))
}

/// Remove a category together with the questions of its column.
pub async fn delete_category(
    state: &SharedState,
    caller: &Caller,
    game_id: Uuid,
    id: Uuid,
) -> Result<(), ServiceError> {
    edit_game(state, caller, game_id, |game| {
        if game.category(id).is_none() {
            return Err(ServiceError::NotFound(format!("category `{id}` not found")));
        }
        game.categories.retain(|category| category.id != id);
        game.questions.retain(|question| question.category_id != id);
        Ok(())
    })
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Question rows
// ---------------------------------------------------------------------------

pub async fn list_rows(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Vec<QuestionRowDto>, ServiceError> {
    Ok(get_game(state, game_id).await?.rows)
}

pub async fn create_row(
    state: &SharedState,
    caller: &Caller,
    game_id: Uuid,
    request: CreateQuestionRowRequest,
) -> Result<QuestionRowDto, ServiceError> {
    request.validate()?;
    let (_, row) = edit_game(state, caller, game_id, |game| {
        let row = QuestionRowEntity {
            id: Uuid::new_v4(),
            value: request.value,
            order: request.order,
        };
        game.rows.push(row.clone());
        Ok(row)
    })
    .await?;
    Ok(QuestionRowDto::new(game_id, &row))
}

pub async fn update_row(
    state: &SharedState,
    caller: &Caller,
    game_id: Uuid,
    id: Uuid,
    request: UpdateQuestionRowRequest,
) -> Result<QuestionRowDto, ServiceError> {
    request.validate()?;
    let (_, row) = edit_game(state, caller, game_id, |game| {
        let row = game
            .rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("row `{id}` not found")))?;
        if let Some(value) = request.value {
            row.value = value;
        }
        if let Some(order) = request.order {
            row.order = order;
        }
        Ok(row.clone())
    })
    .await?;
    Ok(QuestionRowDto::new(game_id, &row))
}

/// Remove a row together with the questions it holds.
pub async fn delete_row(
    state: &SharedState,
    caller: &Caller,
    game_id: Uuid,
    id: Uuid,
) -> Result<(), ServiceError> {
    edit_game(state, caller, game_id, |game| {
        if game.row(id).is_none() {
            return Err(ServiceError::NotFound(format!("row `{id}` not found")));
        }
        game.rows.retain(|row| row.id != id);
        game.questions.retain(|question| question.row_id != id);
        Ok(())
    })
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

pub async fn list_questions(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Vec<QuestionDto>, ServiceError> {
    Ok(get_game(state, game_id).await?.questions)
}

pub async fn get_question(
    state: &SharedState,
    game_id: Uuid,
    id: Uuid,
) -> Result<QuestionDto, ServiceError> {
    let game = load_game(state, game_id).await?;
    game.question(id)
        .map(QuestionDto::from)
        .ok_or_else(|| ServiceError::NotFound(format!("question `{id}` not found")))
}

pub async fn create_question(
    state: &SharedState,
    caller: &Caller,
    game_id: Uuid,
    request: CreateQuestionRequest,
) -> Result<QuestionDto, ServiceError> {
    request.validate()?;
    let (_, question) = edit_game(state, caller, game_id, |game| {
        let question = QuestionEntity {
            id: Uuid::new_v4(),
            category_id: request.category_id,
            row_id: request.row_id,
            question: request.question.trim().to_owned(),
            answer: request.answer.trim().to_owned(),
        };
        game.questions.push(question.clone());
        Ok(question)
    })
    .await?;
    Ok(QuestionDto::from(&question))
}

pub async fn update_question(
    state: &SharedState,
    caller: &Caller,
    game_id: Uuid,
    id: Uuid,
    request: UpdateQuestionRequest,
) -> Result<QuestionDto, ServiceError> {
    request.validate()?;
    let (_, question) = edit_game(state, caller, game_id, |game| {
        let question = game
            .questions
            .iter_mut()
            .find(|question| question.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("question `{id}` not found")))?;
        if let Some(text) = request.question {
            question.question = text.trim().to_owned();
        }
        if let Some(answer) = request.answer {
            question.answer = answer.trim().to_owned();
        }
        Ok(question.clone())
    })
    .await?;
    Ok(QuestionDto::from(&question))
}

pub async fn delete_question(
    state: &SharedState,
    caller: &Caller,
    game_id: Uuid,
    id: Uuid,
) -> Result<(), ServiceError> {
    edit_game(state, caller, game_id, |game| {
        if game.question(id).is_none() {
            return Err(ServiceError::NotFound(format!("question `{id}` not found")));
        }
        game.questions.retain(|question| question.id != id);
        Ok(())
    })
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::MemoryGameStore,
        state::{AppState, identity::SystemRole},
    };
    use std::sync::Arc;

    async fn state() -> SharedState {
        AppState::with_store(AppConfig::default(), None, Arc::new(MemoryGameStore::new())).await
    }

    #[tokio::test]
    async fn template_fills_every_cell() {
        let state = state().await;
        let caller = Caller::new(Uuid::new_v4(), SystemRole::User);

        let game = create_template_game(&state, &caller).await.unwrap();

        assert_eq!(game.categories.len(), 5);
        assert_eq!(
            game.rows.iter().map(|row| row.value).collect::<Vec<_>>(),
            vec![100, 200, 300, 400, 500]
        );
        assert_eq!(game.questions.len(), 25);
    }

    #[tokio::test]
    async fn duplicate_order_and_filled_cell_conflict() {
        let state = state().await;
        let caller = Caller::new(Uuid::new_v4(), SystemRole::User);
        let game = create_game(
            &state,
            &caller,
            CreateGameRequest {
                title: "Trivia".into(),
                is_active: None,
            },
        )
        .await
        .unwrap();

        let category = create_category(
            &state,
            &caller,
            game.id,
            CreateCategoryRequest {
                name: "History".into(),
                order: 0,
            },
        )
        .await
        .unwrap();
        let duplicate = create_category(
            &state,
            &caller,
            game.id,
            CreateCategoryRequest {
                name: "Art".into(),
                order: 0,
            },
        )
        .await;
        assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));

        let row = create_row(
            &state,
            &caller,
            game.id,
            CreateQuestionRowRequest {
                value: 100,
                order: 0,
            },
        )
        .await
        .unwrap();

        let request = || CreateQuestionRequest {
            category_id: category.id,
            row_id: row.id,
            question: "First emperor of Rome".into(),
            answer: "Augustus".into(),
        };
        create_question(&state, &caller, game.id, request())
            .await
            .unwrap();
        let second = create_question(&state, &caller, game.id, request()).await;
        assert!(matches!(second, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn only_creator_or_admin_can_edit() {
        let state = state().await;
        let creator = Caller::new(Uuid::new_v4(), SystemRole::User);
        let stranger = Caller::new(Uuid::new_v4(), SystemRole::User);
        let admin = Caller::new(Uuid::new_v4(), SystemRole::Admin);
        let game = create_template_game(&state, &creator).await.unwrap();

        let update = || UpdateGameRequest {
            title: Some("Renamed".into()),
            is_active: None,
        };
        let denied = update_game(&state, &stranger, game.id, update()).await;
        assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

        let renamed = update_game(&state, &admin, game.id, update()).await.unwrap();
        assert_eq!(renamed.title, "Renamed");
    }

    #[tokio::test]
    async fn deleting_a_row_removes_its_questions() {
        let state = state().await;
        let caller = Caller::new(Uuid::new_v4(), SystemRole::User);
        let game = create_template_game(&state, &caller).await.unwrap();

        delete_row(&state, &caller, game.id, game.rows[0].id)
            .await
            .unwrap();

        let game = get_game(&state, game.id).await.unwrap();
        assert_eq!(game.rows.len(), 4);
        assert_eq!(game.questions.len(), 20);
    }
}
