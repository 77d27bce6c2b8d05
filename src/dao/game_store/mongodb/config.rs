use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};
use crate::config::MongoSettings;

const APP_NAME: &str = "jeopardy-back";

/// Parsed driver options plus the database the store works in.
#[derive(Clone)]
pub struct MongoConfig {
    pub options: ClientOptions,
    pub database_name: String,
    pub connect_attempts: u32,
}

impl MongoConfig {
    pub async fn from_settings(settings: &MongoSettings) -> MongoResult<Self> {
        let mut options = ClientOptions::parse(&settings.uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri {
                uri: settings.uri.clone(),
                source,
            })?;
        if options.app_name.is_none() {
            options.app_name = Some(APP_NAME.to_owned());
        }

        Ok(Self {
            options,
            database_name: settings.database.clone(),
            connect_attempts: settings.connect_attempts.max(1),
        })
    }
}
