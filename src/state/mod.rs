pub mod generation;
pub mod identity;
pub mod question_state;
pub mod session;
mod sse;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::game_store::GameStore,
    error::ServiceError,
    services::{auth::Authenticator, llm::ContentGenerator},
};

pub use self::generation::GenerationRegistry;
pub use self::sse::{SessionStreams, SseHub};

pub type SharedState = Arc<AppState>;

const SESSION_STREAM_CAPACITY: usize = 32;

/// Central application state storing the storage handle and process-local registries.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    authenticator: Authenticator,
    generator: Option<Arc<dyn ContentGenerator>>,
    generations: GenerationRegistry,
    session_streams: SessionStreams,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, generator: Option<Arc<dyn ContentGenerator>>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            game_store: RwLock::new(None),
            degraded: degraded_tx,
            authenticator: Authenticator::new(&config.auth.jwt_secret),
            config,
            generator,
            generations: GenerationRegistry::new(),
            session_streams: SessionStreams::new(SESSION_STREAM_CAPACITY),
        })
    }

    /// Build a state with `store` already installed.
    pub async fn with_store(
        config: AppConfig,
        generator: Option<Arc<dyn ContentGenerator>>,
        store: Arc<dyn GameStore>,
    ) -> SharedState {
        let state = Self::new(config, generator);
        state.set_game_store(store).await;
        state
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current game store, or [`ServiceError::Degraded`] while storage is unavailable.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn set_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// LLM client; `None` when generation is not configured.
    pub fn generator(&self) -> Option<Arc<dyn ContentGenerator>> {
        self.generator.clone()
    }

    pub fn generations(&self) -> &GenerationRegistry {
        &self.generations
    }

    /// Per-session SSE hubs.
    pub fn session_streams(&self) -> &SessionStreams {
        &self.session_streams
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::game_store::MemoryGameStore;

    #[tokio::test]
    async fn starts_degraded_until_store_installed() {
        let state = AppState::new(AppConfig::default(), None);
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_game_store().await,
            Err(ServiceError::Degraded)
        ));

        let mut watcher = state.degraded_watcher();
        state.set_game_store(Arc::new(MemoryGameStore::new())).await;
        assert!(!state.is_degraded());
        assert!(watcher.has_changed().unwrap());
        assert!(state.require_game_store().await.is_ok());

        state.clear_game_store().await;
        assert!(state.is_degraded());
    }
}
