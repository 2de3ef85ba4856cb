// Request extractors that resolve the bearer token into a caller.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use uuid::Uuid;

use super::api_response::ApiError;
use super::app_state::AppState;
use crate::core::marketplace::Actor;

/// A caller with a registered profile.
pub struct CurrentActor(pub Actor);

/// A caller with a valid session, profile or not. Only sign-up needs this.
pub struct SessionSubject(pub Uuid);

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthenticated)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        match state.identity.current_actor(token).await? {
            Some(actor) => Ok(CurrentActor(actor)),
            None => Err(ApiError::ProfileRequired),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for SessionSubject {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        Ok(SessionSubject(state.identity.session_subject(token).await?))
    }
}
