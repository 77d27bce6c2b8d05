use std::sync::Arc;

use jeopardy_back::{
    config::AppConfig,
    dao::game_store::MemoryGameStore,
    dto::{
        game::{
            CreateCategoryRequest, CreateGameRequest, CreateQuestionRequest,
            CreateQuestionRowRequest,
        },
        player::CreatePlayerRequest,
        session::{CreateSessionRequest, SessionQuestionDto, UpdateSessionQuestionRequest},
        sse::EVENT_SESSION_ENDED,
    },
    error::ServiceError,
    services::{catalog_service, player_service, profile_service, session_service, sse_service},
    state::{
        AppState, SharedState,
        identity::{Caller, SystemRole},
    },
};
use uuid::Uuid;

/// A 2x2 board worth 100 and 200 per row, owned by `host`.
async fn two_by_two_board(state: &SharedState, host: &Caller) -> Uuid {
    let game = catalog_service::create_game(
        state,
        host,
        CreateGameRequest {
            title: "Pub night".into(),
            is_active: Some(true),
        },
    )
    .await
    .unwrap();

    let mut categories = Vec::new();
    for (order, name) in ["History", "Science"].into_iter().enumerate() {
        let category = catalog_service::create_category(
            state,
            host,
            game.id,
            CreateCategoryRequest {
                name: name.into(),
                order: order as i32,
            },
        )
        .await
        .unwrap();
        categories.push(category.id);
    }

    let mut rows = Vec::new();
    for (order, value) in [100, 200].into_iter().enumerate() {
        let row = catalog_service::create_row(
            state,
            host,
            game.id,
            CreateQuestionRowRequest {
                value,
                order: order as i32,
            },
        )
        .await
        .unwrap();
        rows.push(row.id);
    }

    for category_id in &categories {
        for row_id in &rows {
            catalog_service::create_question(
                state,
                host,
                game.id,
                CreateQuestionRequest {
                    category_id: *category_id,
                    row_id: *row_id,
                    question: "What is the clue?".into(),
                    answer: "The answer".into(),
                },
            )
            .await
            .unwrap();
        }
    }
    game.id
}

async fn join(
    state: &SharedState,
    caller: &Caller,
    session_id: Uuid,
    name: &str,
) -> Result<Uuid, ServiceError> {
    player_service::join_session(
        state,
        caller,
        CreatePlayerRequest {
            game_session_id: Some(session_id),
            name: Some(name.into()),
            is_ai: false,
        },
    )
    .await
    .map(|player| player.id)
}

fn worth(questions: &[SessionQuestionDto], value: i32) -> Uuid {
    questions
        .iter()
        .find(|question| question.value == Some(value))
        .map(|question| question.question_id)
        .unwrap()
}

fn answered(player_id: Uuid, is_correct: bool) -> UpdateSessionQuestionRequest {
    UpdateSessionQuestionRequest {
        is_answered: Some(true),
        player_id: Some(player_id),
        is_correct: Some(is_correct),
        ..Default::default()
    }
}

#[tokio::test]
async fn full_session_scores_and_records_profiles() {
    let state =
        AppState::with_store(AppConfig::default(), None, Arc::new(MemoryGameStore::new())).await;
    let host = Caller::new(Uuid::new_v4(), SystemRole::User);
    let alice = Caller::new(Uuid::new_v4(), SystemRole::User);
    let bob = Caller::new(Uuid::new_v4(), SystemRole::User);

    let game_id = two_by_two_board(&state, &host).await;
    let session = session_service::create_session(
        &state,
        &host,
        CreateSessionRequest {
            game_id: Some(game_id),
            name: Some("Thursday".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let session_id = session.session.id;
    assert_eq!(session.questions.len(), 4);

    let alice_seat = join(&state, &alice, session_id, "Alice").await.unwrap();
    let bob_seat = join(&state, &bob, session_id, "Bob").await.unwrap();
    let again = join(&state, &alice, session_id, "Alice again").await;
    assert!(matches!(again, Err(ServiceError::Conflict(_))));

    let high = worth(&session.questions, 200);
    let low = worth(&session.questions, 100);

    let scored =
        session_service::update_question(&state, &host, session_id, high, answered(alice_seat, true))
            .await
            .unwrap();
    let score = scored.score.unwrap();
    assert_eq!((score.player_id, score.delta, score.points), (alice_seat, 200, 200));

    let missed =
        session_service::update_question(&state, &host, session_id, low, answered(bob_seat, false))
            .await
            .unwrap();
    let score = missed.score.unwrap();
    assert_eq!((score.player_id, score.delta, score.points), (bob_seat, -100, -100));

    let (_, mut events) = sse_service::subscribe_session(&state, &host, session_id)
        .await
        .unwrap();
    let ended = session_service::end_session(&state, &host, session_id)
        .await
        .unwrap();
    assert!(ended.session.ended_at.is_some());

    let event = events.try_recv().unwrap();
    assert_eq!(event.event.as_deref(), Some(EVENT_SESSION_ENDED));
    let payload: serde_json::Value = serde_json::from_str(&event.data).unwrap();
    assert_eq!(payload["winnerId"], serde_json::json!(alice_seat));

    let alice_profile = profile_service::get_profile(&state, &alice, alice.user_id)
        .await
        .unwrap();
    assert_eq!((alice_profile.games_played, alice_profile.games_won), (1, 1));
    let bob_profile = profile_service::get_profile(&state, &bob, bob.user_id)
        .await
        .unwrap();
    assert_eq!((bob_profile.games_played, bob_profile.games_won), (1, 0));

    let twice = session_service::end_session(&state, &host, session_id).await;
    assert!(matches!(twice, Err(ServiceError::InvalidState(_))));

    let alice_profile = profile_service::get_profile(&state, &alice, alice.user_id)
        .await
        .unwrap();
    assert_eq!(alice_profile.games_played, 1);
}

#[tokio::test]
async fn ended_sessions_reject_late_joins_and_scoring() {
    let state =
        AppState::with_store(AppConfig::default(), None, Arc::new(MemoryGameStore::new())).await;
    let host = Caller::new(Uuid::new_v4(), SystemRole::User);
    let player = Caller::new(Uuid::new_v4(), SystemRole::User);

    let game_id = two_by_two_board(&state, &host).await;
    let session = session_service::create_session(
        &state,
        &host,
        CreateSessionRequest {
            game_id: Some(game_id),
            name: Some("Short one".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let session_id = session.session.id;
    let seat = join(&state, &player, session_id, "Solo").await.unwrap();

    session_service::end_session(&state, &host, session_id)
        .await
        .unwrap();

    let latecomer = Caller::new(Uuid::new_v4(), SystemRole::User);
    let late = join(&state, &latecomer, session_id, "Late").await;
    assert!(matches!(late, Err(ServiceError::InvalidState(_))));

    let question = worth(&session.questions, 100);
    let after_end =
        session_service::update_question(&state, &host, session_id, question, answered(seat, true))
            .await;
    assert!(matches!(after_end, Err(ServiceError::InvalidState(_))));
}
