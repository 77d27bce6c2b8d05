use axum::{Router, middleware};

use crate::{services::auth::require_auth, state::SharedState};

pub mod docs;
pub mod games;
pub mod generation;
pub mod health;
pub mod players;
pub mod profiles;
pub mod sessions;

/// Compose all route trees. Everything under `/api` requires a bearer token; the
/// health check and the documentation stay public.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = games::router()
        .merge(sessions::router())
        .merge(players::router())
        .merge(profiles::router())
        .merge(generation::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let docs_router = docs::router(state.clone());

    health::router()
        .merge(api_router)
        .merge(docs_router)
        .with_state(state)
}
