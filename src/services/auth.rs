//! Bearer token verification. Tokens are HS256 JWTs issued elsewhere; this service
//! only resolves them into a [`Caller`].

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::{AppError, ServiceError},
    state::{
        SharedState,
        identity::{Caller, SystemRole},
    },
};

/// Claims read from the token. The user id may be carried as `id`, `userId` or `sub`.
#[derive(Debug, Deserialize)]
struct Claims {
    id: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<String>,
    sub: Option<String>,
    #[serde(default)]
    role: SystemRole,
}

impl Claims {
    fn subject(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.user_id.as_deref())
            .or(self.sub.as_deref())
    }
}

/// Verifies bearer tokens against the shared secret.
pub struct Authenticator {
    key: DecodingKey,
    validation: Validation,
}

impl Authenticator {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Resolve a raw token into the calling identity.
    pub fn verify(&self, token: &str) -> Result<Caller, ServiceError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|err| ServiceError::Unauthorized(format!("invalid token: {err}")))?;
        let subject = data
            .claims
            .subject()
            .ok_or_else(|| ServiceError::Unauthorized("token carries no user id".into()))?;
        let user_id = Uuid::parse_str(subject)
            .map_err(|_| ServiceError::Unauthorized("token user id is not a UUID".into()))?;
        Ok(Caller::new(user_id, data.claims.role))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Reject requests without a valid bearer token and expose the [`Caller`] to handlers.
pub async fn require_auth(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;
    let caller = state.authenticator().verify(token)?;
    debug!(user_id = %caller.user_id, role = ?caller.role, "authenticated request");
    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("request is not authenticated".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    fn token(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn far_future() -> u64 {
        4_000_000_000
    }

    #[test]
    fn accepts_id_and_role_claims() {
        let user = Uuid::new_v4();
        let auth = Authenticator::new("s3cret");
        let caller = auth
            .verify(&token(
                json!({"id": user.to_string(), "role": "ADMIN", "exp": far_future()}),
                "s3cret",
            ))
            .unwrap();
        assert_eq!(caller.user_id, user);
        assert!(caller.is_admin());
    }

    #[test]
    fn falls_back_to_sub_and_user_role() {
        let user = Uuid::new_v4();
        let auth = Authenticator::new("s3cret");
        let caller = auth
            .verify(&token(
                json!({"sub": user.to_string(), "exp": far_future()}),
                "s3cret",
            ))
            .unwrap();
        assert_eq!(caller.user_id, user);
        assert_eq!(caller.role, SystemRole::User);
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let auth = Authenticator::new("s3cret");
        let user = Uuid::new_v4().to_string();

        let forged = token(json!({"id": user, "exp": far_future()}), "other");
        assert!(matches!(
            auth.verify(&forged),
            Err(ServiceError::Unauthorized(_))
        ));

        let expired = token(json!({"id": user, "exp": 1_000}), "s3cret");
        assert!(auth.verify(&expired).is_err());
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Token abc".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
        headers.insert(AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));
    }
}
