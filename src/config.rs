//! Application-level configuration loading: JWT verification secret, storage backend
//! selection, MongoDB location and the AI content generator settings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "JEOPARDY_BACK_CONFIG_PATH";
const DEFAULT_JWT_SECRET: &str = "secret";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-8b";
const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";
const DEFAULT_MONGO_DB: &str = "jeopardy";
const DEFAULT_MONGO_CONNECT_ATTEMPTS: u32 = 10;

/// Prompt sent to the LLM. `{{placeholders}}` are filled per request.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Generate a Jeopardy-style game data structure with the following specifications:

Language: {{language}}
Number of categories: {{numCategories}}
Questions per category: {{numQuestions}}
Topic: {{topic}}

Technical requirements:
1. Output ONLY a valid JSON object with no Markdown formatting
2. The object has a `categories` array
3. Each category object has:
   - name: the category name
   - questions: an array of exactly {{numQuestions}} question objects, easiest first
4. Each question object has:
   - clue: the statement shown to players
   - answer: the direct answer as a simple noun or phrase (NO \"What is\" format)
5. Do not include any explanation, comments or backticks in the output";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Persistence backend installed at startup.
pub enum StorageBackend {
    Mongo,
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Some(StorageBackend::Mongo),
            "memory" => Some(StorageBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
/// Bearer token verification settings.
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
/// Settings of the LLM-backed game generator.
pub struct GeneratorConfig {
    pub base_url: String,
    pub model: String,
    /// Generation is disabled when no key is configured.
    pub api_key: Option<String>,
    pub language: String,
    pub questions_per_category: usize,
    /// Row `i` (zero based) is worth `(i + 1) * row_value_step` points.
    pub row_value_step: i32,
    pub request_timeout: Duration,
    pub prompt_template: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Where the Mongo backend connects; unused with the memory store.
pub struct MongoSettings {
    pub uri: String,
    pub database: String,
    /// Pings tried before a connection attempt gives up.
    pub connect_attempts: u32,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    pub auth: AuthConfig,
    pub generator: GeneratorConfig,
    pub storage: StorageBackend,
    pub mongo: MongoSettings,
}

impl AppConfig {
    /// Load the configuration from disk and the environment, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration file");
                    raw
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    RawConfig::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                RawConfig::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                RawConfig::default()
            }
        };

        let config = Self::from_raw(raw, |name| env::var(name).ok());
        if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("JWT_SECRET not configured; using the insecure default secret");
        }
        if config.generator.api_key.is_none() {
            info!("GEMINI_API_KEY not configured; AI game generation disabled");
        }
        config
    }

    /// Merge file values with environment overrides.
    fn from_raw(raw: RawConfig, env_var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| env_var(name).filter(|value| !value.trim().is_empty());
        let auth = raw.auth.unwrap_or_default();
        let generator = raw.generator.unwrap_or_default();
        let mongo = raw.mongo.unwrap_or_default();

        let storage = non_empty("STORAGE_BACKEND")
            .and_then(|value| {
                let parsed = StorageBackend::parse(&value);
                if parsed.is_none() {
                    warn!(value = %value, "unknown STORAGE_BACKEND; ignoring");
                }
                parsed
            })
            .or(raw.storage)
            .unwrap_or(StorageBackend::Mongo);

        Self {
            auth: AuthConfig {
                jwt_secret: non_empty("JWT_SECRET")
                    .or(auth.jwt_secret)
                    .unwrap_or_else(|| DEFAULT_JWT_SECRET.to_owned()),
            },
            generator: GeneratorConfig {
                base_url: non_empty("GEMINI_BASE_URL")
                    .or(generator.base_url)
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_owned()),
                model: non_empty("GEMINI_MODEL")
                    .or(generator.model)
                    .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_owned()),
                api_key: non_empty("GEMINI_API_KEY").or(generator.api_key),
                language: generator.language.unwrap_or_else(|| "English".to_owned()),
                questions_per_category: generator.questions_per_category.unwrap_or(5).max(1),
                row_value_step: generator.row_value_step.unwrap_or(100),
                request_timeout: Duration::from_secs(generator.request_timeout_secs.unwrap_or(60)),
                prompt_template: generator
                    .prompt_template
                    .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_owned()),
            },
            storage,
            mongo: MongoSettings {
                uri: non_empty("MONGO_URI")
                    .or(mongo.uri)
                    .unwrap_or_else(|| DEFAULT_MONGO_URI.to_owned()),
                database: non_empty("MONGO_DB")
                    .or(mongo.database)
                    .unwrap_or_else(|| DEFAULT_MONGO_DB.to_owned()),
                connect_attempts: mongo
                    .connect_attempts
                    .unwrap_or(DEFAULT_MONGO_CONNECT_ATTEMPTS)
                    .max(1),
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_raw(RawConfig::default(), |_| None)
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    auth: Option<RawAuth>,
    generator: Option<RawGenerator>,
    storage: Option<StorageBackend>,
    mongo: Option<RawMongo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMongo {
    uri: Option<String>,
    database: Option<String>,
    connect_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAuth {
    jwt_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGenerator {
    base_url: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    language: Option<String>,
    questions_per_category: Option<usize>,
    row_value_step: Option<i32>,
    request_timeout_secs: Option<u64>,
    prompt_template: Option<String>,
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_without_file_or_env() {
        let config = AppConfig::default();
        assert_eq!(config.auth.jwt_secret, DEFAULT_JWT_SECRET);
        assert_eq!(config.storage, StorageBackend::Mongo);
        assert!(config.generator.api_key.is_none());
        assert_eq!(config.generator.questions_per_category, 5);
        assert_eq!(config.generator.row_value_step, 100);
        assert_eq!(config.mongo.uri, DEFAULT_MONGO_URI);
        assert_eq!(config.mongo.database, DEFAULT_MONGO_DB);
    }

    #[test]
    fn environment_overrides_file_values() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "auth": {"jwtSecret": "from-file"},
                "generator": {"model": "file-model", "rowValueStep": 200},
                "storage": "mongo",
                "mongo": {"database": "file-db", "connectAttempts": 0}
            }"#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("JWT_SECRET", "from-env"),
            ("STORAGE_BACKEND", "memory"),
            ("GEMINI_API_KEY", "key"),
            ("GEMINI_MODEL", " "),
            ("MONGO_URI", "mongodb://db:27017"),
        ]);

        let config = AppConfig::from_raw(raw, |name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.auth.jwt_secret, "from-env");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.generator.api_key.as_deref(), Some("key"));
        assert_eq!(config.generator.model, "file-model");
        assert_eq!(config.generator.row_value_step, 200);
        assert_eq!(
            config.mongo,
            MongoSettings {
                uri: "mongodb://db:27017".into(),
                database: "file-db".into(),
                connect_attempts: 1,
            }
        );
    }
}
