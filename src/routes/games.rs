use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::game::{
        CategoryDto, CreateCategoryRequest, CreateGameRequest, CreateQuestionRequest,
        CreateQuestionRowRequest, GameDetail, GameListItem, QuestionDto, QuestionRowDto,
        UpdateCategoryRequest, UpdateGameRequest, UpdateQuestionRequest, UpdateQuestionRowRequest,
    },
    error::AppError,
    services::catalog_service,
    state::{SharedState, identity::Caller},
};

/// Game catalog routes: boards and their categories, rows and questions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/games", get(list_games).post(create_game))
        .route("/api/games/template", post(create_template_game))
        .route(
            "/api/games/{game_id}",
            get(get_game).patch(update_game).delete(delete_game),
        )
        .route(
            "/api/games/{game_id}/categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/api/games/{game_id}/categories/{id}",
            patch(update_category).delete(delete_category),
        )
        .route(
            "/api/games/{game_id}/rows",
            get(list_rows).post(create_row),
        )
        .route(
            "/api/games/{game_id}/rows/{id}",
            patch(update_row).delete(delete_row),
        )
        .route(
            "/api/games/{game_id}/questions",
            get(list_questions).post(create_question),
        )
        .route(
            "/api/games/{game_id}/questions/{id}",
            get(get_question)
                .patch(update_question)
                .delete(delete_question),
        )
}

#[utoipa::path(
    get,
    path = "/api/games",
    tag = "games",
    security(("bearer" = [])),
    responses((status = 200, description = "All games", body = [GameListItem]))
)]
pub async fn list_games(State(state): State<SharedState>) -> Result<Json<Vec<GameListItem>>, AppError> {
    Ok(Json(catalog_service::list_games(&state).await?))
}

/// Create an empty board owned by the caller.
#[utoipa::path(
    post,
    path = "/api/games",
    tag = "games",
    security(("bearer" = [])),
    request_body = CreateGameRequest,
    responses(
        (status = 201, description = "Game created", body = GameDetail),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    caller: Caller,
    Json(payload): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<GameDetail>), AppError> {
    let game = catalog_service::create_game(&state, &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(game)))
}

/// Create a 5×5 board with placeholder categories and empty questions.
#[utoipa::path(
    post,
    path = "/api/games/template",
    tag = "games",
    security(("bearer" = [])),
    responses((status = 201, description = "Template game created", body = GameDetail))
)]
pub async fn create_template_game(
    State(state): State<SharedState>,
    caller: Caller,
) -> Result<(StatusCode, Json<GameDetail>), AppError> {
    let game = catalog_service::create_template_game(&state, &caller).await?;
    Ok((StatusCode::CREATED, Json(game)))
}

#[utoipa::path(
    get,
    path = "/api/games/{game_id}",
    tag = "games",
    security(("bearer" = [])),
    params(("game_id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Full board", body = GameDetail),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameDetail>, AppError> {
    Ok(Json(catalog_service::get_game(&state, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/games/{game_id}",
    tag = "games",
    security(("bearer" = [])),
    params(("game_id" = Uuid, Path, description = "Game identifier")),
    request_body = UpdateGameRequest,
    responses(
        (status = 200, description = "Game updated", body = GameDetail),
        (status = 403, description = "Caller is neither the creator nor an admin")
    )
)]
pub async fn update_game(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateGameRequest>,
) -> Result<Json<GameDetail>, AppError> {
    Ok(Json(
        catalog_service::update_game(&state, &caller, id, payload).await?,
    ))
}

/// Delete a game together with its sessions.
#[utoipa::path(
    delete,
    path = "/api/games/{game_id}",
    tag = "games",
    security(("bearer" = [])),
    params(("game_id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 204, description = "Game deleted"),
        (status = 403, description = "Caller is neither the creator nor an admin"),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    catalog_service::delete_game(&state, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/games/{game_id}/categories",
    tag = "games",
    security(("bearer" = [])),
    params(("game_id" = Uuid, Path, description = "Game identifier")),
    responses((status = 200, description = "Categories in display order", body = [CategoryDto]))
)]
pub async fn list_categories(
    State(state): State<SharedState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<Vec<CategoryDto>>, AppError> {
    Ok(Json(catalog_service::list_categories(&state, game_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/games/{game_id}/categories",
    tag = "games",
    security(("bearer" = [])),
    params(("game_id" = Uuid, Path, description = "Game identifier")),
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryDto),
        (status = 409, description = "Order already used")
    )
)]
pub async fn create_category(
    State(state): State<SharedState>,
    caller: Caller,
    Path(game_id): Path<Uuid>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryDto>), AppError> {
    let category = catalog_service::create_category(&state, &caller, game_id, payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    patch,
    path = "/api/games/{game_id}/categories/{id}",
    tag = "games",
    security(("bearer" = [])),
    params(
        ("game_id" = Uuid, Path, description = "Game identifier"),
        ("id" = Uuid, Path, description = "Category identifier")
    ),
    request_body = UpdateCategoryRequest,
    responses((status = 200, description = "Category updated", body = CategoryDto))
)]
pub async fn update_category(
    State(state): State<SharedState>,
    caller: Caller,
    Path((game_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<CategoryDto>, AppError> {
    Ok(Json(
        catalog_service::update_category(&state, &caller, game_id, id, payload).await?,
    ))
}

/// Delete a category and the questions of its column.
#[utoipa::path(
    delete,
    path = "/api/games/{game_id}/categories/{id}",
    tag = "games",
    security(("bearer" = [])),
    params(
        ("game_id" = Uuid, Path, description = "Game identifier"),
        ("id" = Uuid, Path, description = "Category identifier")
    ),
    responses((status = 204, description = "Category deleted"))
)]
pub async fn delete_category(
    State(state): State<SharedState>,
    caller: Caller,
    Path((game_id, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    catalog_service::delete_category(&state, &caller, game_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/games/{game_id}/rows",
    tag = "games",
    security(("bearer" = [])),
    params(("game_id" = Uuid, Path, description = "Game identifier")),
    responses((status = 200, description = "Rows in display order", body = [QuestionRowDto]))
)]
pub async fn list_rows(
    State(state): State<SharedState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<Vec<QuestionRowDto>>, AppError> {
    Ok(Json(catalog_service::list_rows(&state, game_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/games/{game_id}/rows",
    tag = "games",
    security(("bearer" = [])),
    params(("game_id" = Uuid, Path, description = "Game identifier")),
    request_body = CreateQuestionRowRequest,
    responses(
        (status = 201, description = "Row created", body = QuestionRowDto),
        (status = 409, description = "Order already used")
    )
)]
pub async fn create_row(
    State(state): State<SharedState>,
    caller: Caller,
    Path(game_id): Path<Uuid>,
    Json(payload): Json<CreateQuestionRowRequest>,
) -> Result<(StatusCode, Json<QuestionRowDto>), AppError> {
    let row = catalog_service::create_row(&state, &caller, game_id, payload).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[utoipa::path(
    patch,
    path = "/api/games/{game_id}/rows/{id}",
    tag = "games",
    security(("bearer" = [])),
    params(
        ("game_id" = Uuid, Path, description = "Game identifier"),
        ("id" = Uuid, Path, description = "Row identifier")
    ),
    request_body = UpdateQuestionRowRequest,
    responses((status = 200, description = "Row updated", body = QuestionRowDto))
)]
pub async fn update_row(
    State(state): State<SharedState>,
    caller: Caller,
    Path((game_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateQuestionRowRequest>,
) -> Result<Json<QuestionRowDto>, AppError> {
    Ok(Json(
        catalog_service::update_row(&state, &caller, game_id, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/games/{game_id}/rows/{id}",
    tag = "games",
    security(("bearer" = [])),
    params(
        ("game_id" = Uuid, Path, description = "Game identifier"),
        ("id" = Uuid, Path, description = "Row identifier")
    ),
    responses((status = 204, description = "Row deleted"))
)]
pub async fn delete_row(
    State(state): State<SharedState>,
    caller: Caller,
    Path((game_id, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    catalog_service::delete_row(&state, &caller, game_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/games/{game_id}/questions",
    tag = "games",
    security(("bearer" = [])),
    params(("game_id" = Uuid, Path, description = "Game identifier")),
    responses((status = 200, description = "Questions of the board", body = [QuestionDto]))
)]
pub async fn list_questions(
    State(state): State<SharedState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<Vec<QuestionDto>>, AppError> {
    Ok(Json(catalog_service::list_questions(&state, game_id).await?))
}

/// Fill one cell of the board.
#[utoipa::path(
    post,
    path = "/api/games/{game_id}/questions",
    tag = "games",
    security(("bearer" = [])),
    params(("game_id" = Uuid, Path, description = "Game identifier")),
    request_body = CreateQuestionRequest,
    responses(
        (status = 201, description = "Question created", body = QuestionDto),
        (status = 409, description = "Cell already filled")
    )
)]
pub async fn create_question(
    State(state): State<SharedState>,
    caller: Caller,
    Path(game_id): Path<Uuid>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<(StatusCode, Json<QuestionDto>), AppError> {
    let question = catalog_service::create_question(&state, &caller, game_id, payload).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

#[utoipa::path(
    get,
    path = "/api/games/{game_id}/questions/{id}",
    tag = "games",
    security(("bearer" = [])),
    params(
        ("game_id" = Uuid, Path, description = "Game identifier"),
        ("id" = Uuid, Path, description = "Question identifier")
    ),
    responses((status = 200, description = "Question", body = QuestionDto))
)]
pub async fn get_question(
    State(state): State<SharedState>,
    Path((game_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<QuestionDto>, AppError> {
    Ok(Json(catalog_service::get_question(&state, game_id, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/games/{game_id}/questions/{id}",
    tag = "games",
    security(("bearer" = [])),
    params(
        ("game_id" = Uuid, Path, description = "Game identifier"),
        ("id" = Uuid, Path, description = "Question identifier")
    ),
    request_body = UpdateQuestionRequest,
    responses((status = 200, description = "Question updated", body = QuestionDto))
)]
pub async fn update_question(
    State(state): State<SharedState>,
    caller: Caller,
    Path((game_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<Json<QuestionDto>, AppError> {
    Ok(Json(
        catalog_service::update_question(&state, &caller, game_id, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/games/{game_id}/questions/{id}",
    tag = "games",
    security(("bearer" = [])),
    params(
        ("game_id" = Uuid, Path, description = "Game identifier"),
        ("id" = Uuid, Path, description = "Question identifier")
    ),
    responses((status = 204, description = "Question deleted"))
)]
pub async fn delete_question(
    State(state): State<SharedState>,
    caller: Caller,
    Path((game_id, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    catalog_service::delete_question(&state, &caller, game_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
