use serde::Serialize;
use utoipa::ToSchema;

/// Payload of `/healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" or "degraded".
    pub status: &'static str,
    /// Whether AI game generation is configured.
    pub generator: bool,
}

impl HealthResponse {
    pub fn new(degraded: bool, generator: bool) -> Self {
        Self {
            status: if degraded { "degraded" } else { "ok" },
            generator,
        }
    }
}
