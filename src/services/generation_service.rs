//! AI-assisted board generation.
//!
//! The request registers a pending task and returns immediately; a detached task fills
//! the prompt template, calls the model, parses its JSON and stores the board through
//! the same invariants as hand-made games.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::GeneratorConfig,
    dao::models::{CategoryEntity, GameEntity, QuestionEntity, QuestionRowEntity},
    dto::generation::{
        GenerateGameRequest, GeneratedGame, GeneratedGameResult, GenerationAccepted,
        GenerationStatusResponse,
    },
    error::ServiceError,
    services::{
        catalog_service,
        llm::{ContentGenerator, GeneratorError},
    },
    state::{SharedState, identity::Caller},
};

const DEFAULT_NUM_CATEGORIES: usize = 5;
const DEFAULT_TOPIC: &str = "General Knowledge";
const DEFAULT_TITLE: &str = "AI generated game";

#[derive(Debug, Error)]
enum PipelineError {
    #[error(transparent)]
    Model(#[from] GeneratorError),
    #[error("model output is not a valid game: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("generated board is unusable: {0}")]
    Board(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Replace every `{{name}}` placeholder of `template`.
pub fn fill_template(template: &str, values: &[(&str, String)]) -> String {
    values
        .iter()
        .fold(template.to_owned(), |text, (name, value)| {
            text.replace(&format!("{{{{{name}}}}}"), value)
        })
}

/// Topic line sent to the model, built from the theme or categories plus free-text hints.
pub fn build_topic(request: &GenerateGameRequest) -> String {
    let categories = request.category_names();
    let mut topic = if categories.is_empty() {
        request.theme().unwrap_or(DEFAULT_TOPIC).to_owned()
    } else {
        format!("Categories: {}", categories.join(", "))
    };

    if let Some(details) = non_blank(request.details.as_deref()) {
        topic.push_str(&format!(". Additional details: {details}"));
    }
    if let Some(examples) = non_blank(request.example_questions.as_deref()) {
        topic.push_str(&format!(". Example questions: {examples}"));
    }
    topic
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn build_prompt(config: &GeneratorConfig, request: &GenerateGameRequest) -> String {
    let num_categories = match request.category_names().len() {
        0 => DEFAULT_NUM_CATEGORIES,
        count => count,
    };
    let language = non_blank(request.language.as_deref()).unwrap_or(&config.language);

    fill_template(
        &config.prompt_template,
        &[
            ("language", language.to_owned()),
            ("numCategories", num_categories.to_string()),
            ("numQuestions", config.questions_per_category.to_string()),
            ("topic", build_topic(request)),
        ],
    )
}

/// Strip a leading `const x =` declaration, Markdown code fences and a trailing `;`.
pub fn clean_output(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("const") {
        if let Some((name, value)) = rest.split_once('=') {
            let name = name.trim();
            if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                text = value.trim_start();
            }
        }
    }

    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("javascript"))
            .unwrap_or(rest);
        text = rest.trim_start();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text.trim_end_matches(';').trim()
}

/// Parse the cleaned model output.
pub fn parse_generated(raw: &str) -> Result<GeneratedGame, serde_json::Error> {
    serde_json::from_str(clean_output(raw))
}

/// Lay the generated categories out as a board: category `i` gets order `i`, row `j`
/// is worth `(j + 1) * row_step` and question `j` of a category fills row `j`.
pub fn build_game(
    creator_id: Uuid,
    title: String,
    generated: &GeneratedGame,
    row_step: i32,
) -> Result<GameEntity, ServiceError> {
    let row_count = generated
        .categories
        .iter()
        .map(|category| category.questions.len())
        .max()
        .unwrap_or(0);
    if generated.categories.is_empty() || row_count == 0 {
        return Err(ServiceError::InvalidInput(
            "the board has no categories or no questions".into(),
        ));
    }

    let mut game = catalog_service::new_game(creator_id, title, true);
    game.rows = (0..row_count)
        .map(|index| {
            let index = index as i32;
            QuestionRowEntity {
                id: Uuid::new_v4(),
                value: (index + 1) * row_step,
                order: index,
            }
        })
        .collect();

    for (index, generated_category) in generated.categories.iter().enumerate() {
        let category = CategoryEntity {
            id: Uuid::new_v4(),
            name: generated_category.name.trim().to_owned(),
            order: index as i32,
        };
        for (question, row) in generated_category.questions.iter().zip(&game.rows) {
            game.questions.push(QuestionEntity {
                id: Uuid::new_v4(),
                category_id: category.id,
                row_id: row.id,
                question: question.clue.trim().to_owned(),
                answer: question.answer.trim().to_owned(),
            });
        }
        game.categories.push(category);
    }

    catalog_service::check_board(&game)?;
    Ok(game)
}

/// Validate the request and start a background generation job.
pub async fn request_generation(
    state: &SharedState,
    caller: &Caller,
    request: GenerateGameRequest,
) -> Result<GenerationAccepted, ServiceError> {
    request.validate()?;
    let generator = state
        .generator()
        .ok_or_else(|| ServiceError::Disabled("AI game generation is not configured".into()))?;

    let prompt = build_prompt(&state.config().generator, &request);
    let title = request.theme().unwrap_or(DEFAULT_TITLE).to_owned();
    let generation_id = state.generations().start(caller.user_id);
    info!(%generation_id, requester = %caller.user_id, "game generation started");

    tokio::spawn(run_generation(
        state.clone(),
        generator,
        generation_id,
        caller.user_id,
        title,
        prompt,
    ));

    Ok(GenerationAccepted {
        success: true,
        message: "Game generation started".into(),
        generation_id,
    })
}

async fn run_generation(
    state: SharedState,
    generator: Arc<dyn ContentGenerator>,
    generation_id: Uuid,
    creator_id: Uuid,
    title: String,
    prompt: String,
) {
    match generate_game(&state, generator.as_ref(), creator_id, title, prompt).await {
        Ok(data) => {
            state.generations().complete(generation_id, data);
            info!(%generation_id, "game generation completed");
        }
        Err(err) => {
            warn!(%generation_id, error = %err, "game generation failed");
            state.generations().fail(generation_id, err.to_string());
        }
    }
}

async fn generate_game(
    state: &SharedState,
    generator: &dyn ContentGenerator,
    creator_id: Uuid,
    title: String,
    prompt: String,
) -> Result<Value, PipelineError> {
    let raw = generator.generate(prompt).await?;
    let generated = parse_generated(&raw)?;
    let row_step = state.config().generator.row_value_step;
    let game = build_game(creator_id, title, &generated, row_step)
        .map_err(|err| PipelineError::Board(err.to_string()))?;

    let store = state.require_game_store().await?;
    store
        .save_game(game.clone())
        .await
        .map_err(ServiceError::from)?;

    let result = GeneratedGameResult {
        game_id: game.id,
        title: game.title,
        categories: generated.categories,
    };
    Ok(serde_json::to_value(result)?)
}

/// Status of a generation job. Only the user that requested it may poll it.
pub fn generation_status(
    state: &SharedState,
    caller: &Caller,
    generation_id: Uuid,
) -> Result<GenerationStatusResponse, ServiceError> {
    let task = state.generations().get(generation_id).ok_or_else(|| {
        ServiceError::NotFound(format!("generation `{generation_id}` not found"))
    })?;
    if task.requester != caller.user_id {
        return Err(ServiceError::Forbidden(
            "generation tasks can only be polled by their requester".into(),
        ));
    }
    Ok(GenerationStatusResponse::new(generation_id, task))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::MemoryGameStore,
        state::{AppState, generation::GenerationStatus, identity::SystemRole},
    };
    use futures::future::BoxFuture;
    use std::time::Duration;

    const MODEL_OUTPUT: &str = r#"```json
{"categories":[
  {"name":"Planets","questions":[{"clue":"Red planet","answer":"Mars"},{"clue":"Largest planet","answer":"Jupiter"}]},
  {"name":"Stars","questions":[{"clue":"Our star","answer":"Sun"},{"clue":"North star","answer":"Polaris"}]}
]}
```"#;

    struct CannedGenerator(&'static str);

    impl ContentGenerator for CannedGenerator {
        fn generate(&self, _prompt: String) -> BoxFuture<'static, Result<String, GeneratorError>> {
            let text = self.0.to_owned();
            Box::pin(async move { Ok(text) })
        }
    }

    #[test]
    fn template_placeholders_are_filled() {
        let filled = fill_template(
            "{{language}}: {{numCategories}} x {{numQuestions}} about {{topic}} ({{language}})",
            &[
                ("language", "English".into()),
                ("numCategories", "2".into()),
                ("numQuestions", "5".into()),
                ("topic", "Space".into()),
            ],
        );
        assert_eq!(filled, "English: 2 x 5 about Space (English)");
    }

    #[test]
    fn topic_prefers_categories_and_appends_hints() {
        let request = GenerateGameRequest {
            theme: Some("Science".into()),
            categories: Some(vec!["Physics".into(), "Biology".into()]),
            details: Some("for kids".into()),
            ..Default::default()
        };
        assert_eq!(
            build_topic(&request),
            "Categories: Physics, Biology. Additional details: for kids"
        );

        assert_eq!(build_topic(&GenerateGameRequest::default()), DEFAULT_TOPIC);
    }

    #[test]
    fn model_noise_is_stripped() {
        assert_eq!(clean_output("const game = {\"a\":1};"), "{\"a\":1}");
        assert_eq!(clean_output("```javascript\n{}\n```"), "{}");
        assert_eq!(clean_output("  {\"categories\":[]}  "), "{\"categories\":[]}");
    }

    #[test]
    fn parsed_board_gets_stepped_row_values() {
        let generated = parse_generated(MODEL_OUTPUT).unwrap();
        let game = build_game(Uuid::new_v4(), "Space".into(), &generated, 100).unwrap();

        assert_eq!(game.categories.len(), 2);
        assert_eq!(
            game.rows.iter().map(|row| row.value).collect::<Vec<_>>(),
            vec![100, 200]
        );
        assert_eq!(game.questions.len(), 4);
        let polaris = game
            .questions
            .iter()
            .find(|question| question.answer == "Polaris")
            .unwrap();
        assert_eq!(game.question_value(polaris.id), Some(200));
    }

    #[test]
    fn empty_board_is_rejected() {
        let generated: GeneratedGame = serde_json::from_str(r#"{"categories":[]}"#).unwrap();
        assert!(build_game(Uuid::new_v4(), "x".into(), &generated, 100).is_err());
    }

    #[tokio::test]
    async fn disabled_without_generator() {
        let state =
            AppState::with_store(AppConfig::default(), None, Arc::new(MemoryGameStore::new()))
                .await;
        let caller = Caller::new(Uuid::new_v4(), SystemRole::User);
        let request = GenerateGameRequest {
            theme: Some("Space".into()),
            ..Default::default()
        };
        let result = request_generation(&state, &caller, request).await;
        assert!(matches!(result, Err(ServiceError::Disabled(_))));
    }

    #[tokio::test]
    async fn background_job_stores_the_game() {
        let state = AppState::with_store(
            AppConfig::default(),
            Some(Arc::new(CannedGenerator(MODEL_OUTPUT))),
            Arc::new(MemoryGameStore::new()),
        )
        .await;
        let caller = Caller::new(Uuid::new_v4(), SystemRole::User);
        let accepted = request_generation(
            &state,
            &caller,
            GenerateGameRequest {
                theme: Some("Space".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut status = generation_status(&state, &caller, accepted.generation_id).unwrap();
        for _ in 0..50 {
            if status.status != GenerationStatus::Pending {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            status = generation_status(&state, &caller, accepted.generation_id).unwrap();
        }
        assert_eq!(status.status, GenerationStatus::Completed);

        let data = status.data.unwrap();
        let game_id: Uuid = serde_json::from_value(data["gameId"].clone()).unwrap();
        let store = state.game_store().await.unwrap();
        let game = store.find_game(game_id).await.unwrap().unwrap();
        assert_eq!(game.title, "Space");
        assert_eq!(game.creator_id, caller.user_id);

        let stranger = Caller::new(Uuid::new_v4(), SystemRole::User);
        assert!(matches!(
            generation_status(&state, &stranger, accepted.generation_id),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn unparsable_output_marks_the_task_failed() {
        let state = AppState::with_store(
            AppConfig::default(),
            Some(Arc::new(CannedGenerator("not json at all"))),
            Arc::new(MemoryGameStore::new()),
        )
        .await;
        let caller = Caller::new(Uuid::new_v4(), SystemRole::User);
        let accepted = request_generation(
            &state,
            &caller,
            GenerateGameRequest {
                categories: Some(vec!["A".into(), "B".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut status = generation_status(&state, &caller, accepted.generation_id).unwrap();
        for _ in 0..50 {
            if status.status != GenerationStatus::Pending {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            status = generation_status(&state, &caller, accepted.generation_id).unwrap();
        }
        assert_eq!(status.status, GenerationStatus::Failed);
        assert!(status.error.is_some());
    }
}
