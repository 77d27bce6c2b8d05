use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the quiz backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::games::list_games,
        crate::routes::games::create_game,
        crate::routes::games::create_template_game,
        crate::routes::games::get_game,
        crate::routes::games::update_game,
        crate::routes::games::delete_game,
        crate::routes::games::list_categories,
        crate::routes::games::create_category,
        crate::routes::games::update_category,
        crate::routes::games::delete_category,
        crate::routes::games::list_rows,
        crate::routes::games::create_row,
        crate::routes::games::update_row,
        crate::routes::games::delete_row,
        crate::routes::games::list_questions,
        crate::routes::games::create_question,
        crate::routes::games::get_question,
        crate::routes::games::update_question,
        crate::routes::games::delete_question,
        crate::routes::sessions::create_session,
        crate::routes::sessions::list_sessions,
        crate::routes::sessions::get_session,
        crate::routes::sessions::update_turn,
        crate::routes::sessions::update_question,
        crate::routes::sessions::end_session,
        crate::routes::sessions::delete_session,
        crate::routes::sessions::session_events,
        crate::routes::players::join_session,
        crate::routes::players::list_session_players,
        crate::routes::players::get_player,
        crate::routes::players::update_player,
        crate::routes::players::delete_player,
        crate::routes::profiles::get_profile,
        crate::routes::profiles::update_profile,
        crate::routes::profiles::update_stats,
        crate::routes::generation::generate_game,
        crate::routes::generation::generation_status,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::UpdateGameRequest,
            crate::dto::game::CreateCategoryRequest,
            crate::dto::game::UpdateCategoryRequest,
            crate::dto::game::CreateQuestionRowRequest,
            crate::dto::game::UpdateQuestionRowRequest,
            crate::dto::game::CreateQuestionRequest,
            crate::dto::game::UpdateQuestionRequest,
            crate::dto::game::GameListItem,
            crate::dto::game::GameDetail,
            crate::dto::game::CategoryDto,
            crate::dto::game::QuestionRowDto,
            crate::dto::game::QuestionDto,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::UpdateTurnRequest,
            crate::dto::session::UpdateSessionQuestionRequest,
            crate::dto::session::SessionSummary,
            crate::dto::session::SessionDetail,
            crate::dto::session::SessionQuestionDto,
            crate::dto::session::SessionQuestionUpdate,
            crate::dto::session::ScoreChange,
            crate::dto::player::CreatePlayerRequest,
            crate::dto::player::UpdatePlayerRequest,
            crate::dto::player::PlayerDto,
            crate::dto::profile::ProfileDto,
            crate::dto::profile::UpdateProfileRequest,
            crate::dto::profile::UpdateProfileStatsRequest,
            crate::dto::generation::GenerateGameRequest,
            crate::dto::generation::GenerationAccepted,
            crate::dto::generation::GenerationStatusResponse,
            crate::dto::generation::GeneratedGame,
            crate::dto::generation::GeneratedCategory,
            crate::dto::generation::GeneratedQuestion,
            crate::dto::sse::SessionHandshake,
            crate::dto::sse::TurnChangedEvent,
            crate::dto::sse::QuestionChangedEvent,
            crate::dto::sse::PlayerJoinedEvent,
            crate::dto::sse::PlayerLeftEvent,
            crate::dto::sse::SessionEndedEvent,
            crate::dao::models::PlayerRole,
            crate::state::session::SessionRole,
            crate::state::generation::GenerationStatus,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "games", description = "Game catalog: boards, categories, rows and questions"),
        (name = "sessions", description = "Session lifecycle, scoring and event streams"),
        (name = "players", description = "Seats in a session"),
        (name = "profiles", description = "Per-user details and game statistics"),
        (name = "ai-games", description = "AI-assisted board generation"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` JWT scheme referenced by the `/api` routes.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
