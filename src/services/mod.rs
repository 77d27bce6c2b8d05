/// Bearer token verification and the authentication middleware.
pub mod auth;
/// Game catalog management.
pub mod catalog_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// AI-assisted game generation jobs.
pub mod generation_service;
/// Health check service.
pub mod health_service;
/// Text generation client backing the game generator.
pub mod llm;
/// Session seats.
pub mod player_service;
/// Per-user statistics.
pub mod profile_service;
/// Session lifecycle, question transitions and scoring.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events streaming.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
